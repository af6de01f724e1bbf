//! The Docent chat pipeline.
//!
//! A query goes through:
//!
//! 1. **Moderation** of the trimmed text
//! 2. **Embedding** of the query
//! 3. **Retrieval** of document sections and earlier conversation turns
//! 4. **Assembly** of both under one token budget
//! 5. **Prompting** the chat model with a fixed four-message template
//! 6. **Recording** the exchange in the in-process conversation store
//!
//! Every collaborator is a trait object from `docent-core`, so the pipeline
//! runs the same against hosted APIs and against scripted mocks.

pub mod context;
pub mod pipeline;
pub mod prompt;

#[cfg(test)]
mod test_helpers;

pub use context::{
    AssembledContext, AssemblyStats, ContextAssembler, HeuristicTokenizer, TokenBudget,
    estimate_tokens,
};
pub use pipeline::{ChatOutcome, ChatPipeline, ChatReply, PipelineConfig, PipelineStage};
pub use prompt::{FALLBACK_ANSWER, build_messages};
