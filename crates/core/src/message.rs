//! Message and conversation-turn value objects.
//!
//! [`Message`] is what the chat model sees; [`ConversationTurn`] is what the
//! conversation store keeps (text prefixed with its role, plus an embedding).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The AI assistant
    Assistant,
    /// System instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single chat message sent to or returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }
}

/// One side of a completed exchange, as kept by the conversation store.
///
/// `content` always carries the role prefix (`"user: ..."`,
/// `"assistant: ..."`) so assembled history reads as a transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    #[serde(skip)]
    pub embedding: Embedding,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Build a turn from raw text, applying the role prefix.
    pub fn new(role: Role, text: &str, embedding: Embedding) -> Self {
        Self {
            role,
            content: format!("{role}: {text}"),
            embedding,
            created_at: Utc::now(),
        }
    }

    pub fn user(text: &str, embedding: Embedding) -> Self {
        Self::new(Role::User, text, embedding)
    }

    pub fn assistant(text: &str, embedding: Embedding) -> Self {
        Self::new(Role::Assistant, text, embedding)
    }
}
