//! Hosted collaborator implementations for Docent.
//!
//! The OpenAI-compatible client implements `Provider`, `Embedder` and
//! `Moderator` from `docent_core`. The router builds them from configuration
//! and wraps them in the timeout/retry policies from [`resilience`].

pub mod openai_compat;
pub mod resilience;
pub mod router;
#[cfg(feature = "local")]
pub mod tokenizer;

pub use openai_compat::OpenAiCompatProvider;
pub use resilience::{
    PassthroughModerator, RetryPolicy, RetryingEmbedder, RetryingModerator, TimeoutProvider,
};
pub use router::{Collaborators, ProviderRouter, build_from_config, collaborators};
#[cfg(feature = "local")]
pub use tokenizer::HfTokenizer;
