//! The fixed four-message prompt sent to the chat model.
//!
//! Only the documentation context, the conversation context and the query
//! vary between requests; everything else is constant text.

use docent_core::Message;

/// What the model is told to say when the context does not cover a question.
pub const FALLBACK_ANSWER: &str = "Sorry, I don't know how to help with that.";

const PERSONA: &str = "You are a very enthusiastic personal AI who loves to help people! \
Given the following information from the personal documentation and conversation history, \
answer the user's question using only that information, outputted in markdown format.";

const SPEAKERS: &str = "In the conversation history, lines that start with \"assistant:\" \
refers to you, the personal AI, and lines that start with \"user:\" refers to me, the person \
sending messages and asking questions to the personal AI.";

const SNIPPETS: &str = "Always include related code snippets if available.";

const RULES_INTRO: &str = "Answer my next question using only the above documentation and \
conversation history. You must also follow the below rules when answering:";

fn system_prompt() -> String {
    format!(
        "{PERSONA}\n\n{SPEAKERS}\n\nIf you are unsure and the answer is not explicitly written \
         in the documentation or conversation history, say \"{FALLBACK_ANSWER}\"\n\n{SNIPPETS}"
    )
}

fn rules() -> String {
    [
        "- Do not make up answers that are not provided in the documentation.".to_string(),
        "- You can use messages in conversation history as context to answer my next question."
            .to_string(),
        format!(
            "- If you are unsure and the answer is not explicitly written in the documentation \
             context, say \"{FALLBACK_ANSWER}\""
        ),
        "- Prefer splitting your response into multiple paragraphs.".to_string(),
        "- Output as markdown with code snippets if available.".to_string(),
    ]
    .join("\n")
}

/// Build the messages for one completion, in order:
/// system, documentation, conversation history plus rules, question.
pub fn build_messages(
    query: &str,
    document_context: &str,
    conversation_context: &str,
) -> [Message; 4] {
    [
        Message::system(system_prompt()),
        Message::user(format!("Here is my personal documentation:\n{document_context}")),
        Message::user(format!(
            "Here is the conversation history:\n{conversation_context}\n\n{RULES_INTRO}\n{}",
            rules()
        )),
        Message::user(format!("Here is my question:\n{}", query.trim())),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_core::Role;

    #[test]
    fn always_four_messages_in_fixed_roles() {
        let messages = build_messages("q", "", "");
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::User, Role::User]);
    }

    #[test]
    fn contexts_are_interpolated_verbatim() {
        let docs = "Slabs are fixed-size.\n---\n";
        let history = "user: hi\n---\nassistant: hello\n---\n";
        let [_, doc_msg, history_msg, _] = build_messages("q", docs, history);
        assert!(doc_msg.content.starts_with("Here is my personal documentation:\n"));
        assert!(doc_msg.content.ends_with(docs));
        assert!(history_msg.content.contains(history));
        assert!(history_msg.content.contains("Prefer splitting your response"));
    }

    #[test]
    fn question_is_trimmed() {
        let [.., question] = build_messages("  what is a slab?\n", "", "");
        assert_eq!(question.content, "Here is my question:\nwhat is a slab?");
    }

    #[test]
    fn fallback_phrase_appears_in_system_and_rules() {
        let [system, _, history, _] = build_messages("q", "", "");
        assert!(system.content.contains(FALLBACK_ANSWER));
        assert!(system.content.contains("\"assistant:\""));
        assert!(history.content.contains(FALLBACK_ANSWER));
    }

    #[test]
    fn only_interpolated_fields_vary() {
        let a = build_messages("one", "doc a", "hist a");
        let b = build_messages("two", "doc b", "hist b");
        assert_eq!(a[0], b[0]);
        assert_ne!(a[1], b[1]);
    }
}
