//! The chat pipeline: one user query in, one model answer out.
//!
//! Stages run strictly in sequence:
//!
//! 1. **Moderate** the trimmed query; flagged input stops here.
//! 2. **Embed** the query.
//! 3. **Retrieve** document sections and assemble them under the token budget.
//! 4. **Recall** conversation turns: the newest window verbatim, the rest
//!    ranked by similarity, all under the same budget.
//! 5. **Prompt** the chat model with the fixed four-message template.
//! 6. **Record** the exchange in the conversation store.
//!
//! The conversation store is only written after the model answered, so a
//! failure at any earlier stage leaves it exactly as it was.

use std::sync::Arc;

use docent_config::AppConfig;
use docent_core::{
    ConversationTurn, Embedder, Error, MatchParams, ModerationVerdict, Moderator, Provider,
    ProviderRequest, Result, Role, SectionStore, Tokenizer, Usage,
};
use docent_memory::{ConversationStore, rank};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::context::{AssembledContext, ContextAssembler, HeuristicTokenizer, TokenBudget};
use crate::prompt::build_messages;

/// Where a request is in the pipeline. Logged at every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Received,
    Moderated,
    Embedded,
    ContextRetrieved,
    PromptBuilt,
    ModelCalled,
    StoreUpdated,
    Responded,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::Moderated => "moderated",
            Self::Embedded => "embedded",
            Self::ContextRetrieved => "context_retrieved",
            Self::PromptBuilt => "prompt_built",
            Self::ModelCalled => "model_called",
            Self::StoreUpdated => "store_updated",
            Self::Responded => "responded",
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tunables for one pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Token ceiling shared by document and conversation context.
    pub token_budget: usize,
    /// Newest turns included verbatim before similarity ranking.
    pub recent_turns: usize,
    pub documents: MatchParams,
    pub conversation: MatchParams,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: "gpt-3.5-turbo".into(),
            max_tokens: 1024,
            temperature: 0.0,
            token_budget: 1500,
            recent_turns: 10,
            documents: MatchParams::documents(),
            conversation: MatchParams::conversation(),
        }
    }
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            model: config.chat.model.clone(),
            max_tokens: config.chat.max_tokens,
            temperature: config.chat.temperature,
            token_budget: config.retrieval.token_budget,
            recent_turns: config.retrieval.recent_turns,
            documents: config.retrieval.documents.params(),
            conversation: config.retrieval.conversation.params(),
        }
    }
}

/// The model's answer plus the context it was given.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
    pub model: String,
    pub document_context: String,
    pub conversation_context: String,
}

/// Result of a pipeline run that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    Answered(ChatReply),
    /// Moderation rejected the query; the model was never called.
    Flagged(ModerationVerdict),
}

/// Orchestrates moderation, retrieval, prompting and the store update.
pub struct ChatPipeline {
    provider: Arc<dyn Provider>,
    embedder: Arc<dyn Embedder>,
    moderator: Arc<dyn Moderator>,
    sections: Arc<dyn SectionStore>,
    conversation: Arc<ConversationStore>,
    assembler: ContextAssembler,
    config: PipelineConfig,
}

impl ChatPipeline {
    pub fn new(
        provider: Arc<dyn Provider>,
        embedder: Arc<dyn Embedder>,
        moderator: Arc<dyn Moderator>,
        sections: Arc<dyn SectionStore>,
        conversation: Arc<ConversationStore>,
    ) -> Self {
        Self {
            provider,
            embedder,
            moderator,
            sections,
            conversation,
            assembler: ContextAssembler::new(Arc::new(HeuristicTokenizer)),
            config: PipelineConfig::default(),
        }
    }

    /// Count tokens with `tokenizer` instead of the length heuristic.
    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.assembler = ContextAssembler::new(tokenizer);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn conversation(&self) -> &Arc<ConversationStore> {
        &self.conversation
    }

    pub fn sections(&self) -> &Arc<dyn SectionStore> {
        &self.sections
    }

    /// Answer one query.
    pub async fn run(&self, query: &str) -> Result<ChatOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be empty".into()));
        }
        stage(PipelineStage::Received);

        // ── Moderation ──
        let verdict = self.moderator.moderate(query).await?;
        if verdict.flagged {
            warn!(categories = ?verdict.flagged_categories(), "Query flagged by moderation");
            return Ok(ChatOutcome::Flagged(verdict));
        }
        stage(PipelineStage::Moderated);

        // ── Query embedding ──
        let embedding = self.embedder.embed(&query.replace('\n', " ")).await?;
        stage(PipelineStage::Embedded);

        // ── Context ──
        let mut budget = TokenBudget::new(self.config.token_budget);
        let documents = self.document_context(&embedding, &mut budget).await?;
        let conversation = self.conversation_context(&embedding, &mut budget)?;
        debug!(
            documents = documents.stats.included,
            turns = conversation.stats.included,
            tokens = budget.used(),
            limit = budget.limit(),
            "Context assembled"
        );
        stage(PipelineStage::ContextRetrieved);

        let messages = build_messages(query, &documents.text, &conversation.text);
        stage(PipelineStage::PromptBuilt);

        // ── Model ──
        let request = ProviderRequest {
            model: self.config.model.clone(),
            messages: messages.into(),
            temperature: self.config.temperature,
            max_tokens: Some(self.config.max_tokens),
        };
        let response = self.provider.complete(request).await.map_err(|e| {
            warn!(provider = self.provider.name(), error = %e, "Completion failed");
            Error::Completion(e)
        })?;
        stage(PipelineStage::ModelCalled);

        // ── Store update ──
        let answer = response.message.content;
        // Embedding APIs reject empty input; a blank answer sits next to its query.
        let answer_embedding = if answer.trim().is_empty() {
            warn!(finish_reason = ?response.finish_reason, "Model returned an empty answer");
            embedding.clone()
        } else {
            self.embedder.embed(&answer).await?
        };
        self.conversation.record_exchange(
            ConversationTurn::user(query, embedding),
            ConversationTurn::assistant(&answer, answer_embedding),
        );
        stage(PipelineStage::StoreUpdated);

        info!(
            model = %response.model,
            finish_reason = ?response.finish_reason,
            answer_len = answer.len(),
            "Query answered"
        );
        stage(PipelineStage::Responded);

        Ok(ChatOutcome::Answered(ChatReply {
            role: response.message.role,
            content: answer,
            finish_reason: response.finish_reason,
            usage: response.usage,
            model: response.model,
            document_context: documents.text,
            conversation_context: conversation.text,
        }))
    }

    async fn document_context(
        &self,
        embedding: &[f32],
        budget: &mut TokenBudget,
    ) -> Result<AssembledContext> {
        let options = self.config.documents.with_target(embedding);
        let matches = self.sections.match_sections(&options).await.map_err(|e| {
            error!(store = self.sections.name(), error = %e, "Section match failed");
            Error::VectorStore(e)
        })?;

        let ctx = self
            .assembler
            .assemble(matches.iter().map(|m| m.item.content.as_str()), budget);
        debug!(matched = matches.len(), stats = ?ctx.stats, "Document context");
        Ok(ctx)
    }

    fn conversation_context(
        &self,
        embedding: &[f32],
        budget: &mut TokenBudget,
    ) -> Result<AssembledContext> {
        let turns = self.conversation.snapshot();
        let split = self.config.recent_turns.min(turns.len());
        let (recent, older) = turns.split_at(split);

        let mut ctx = self
            .assembler
            .assemble(recent.iter().map(|t| t.content.as_str()), budget);

        let ranked = rank(older, &self.config.conversation.with_target(embedding))?;
        let related = self
            .assembler
            .assemble(ranked.iter().map(|s| s.item.content.as_str()), budget);

        debug!(
            recent = recent.len(),
            ranked = ranked.len(),
            recent_stats = ?ctx.stats,
            ranked_stats = ?related.stats,
            "Conversation context"
        );

        ctx.text.push_str(&related.text);
        ctx.stats.included += related.stats.included;
        ctx.stats.dropped += related.stats.dropped;
        ctx.stats.tokens_used = related.stats.tokens_used;
        Ok(ctx)
    }
}

fn stage(stage: PipelineStage) {
    debug!(stage = %stage, "Pipeline stage");
}
