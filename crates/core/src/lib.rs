//! # Docent Core
//!
//! Domain types, collaborator traits, and error definitions for the Docent
//! retrieval-augmented chat backend. This crate has **no framework
//! dependencies**: it defines the model every other crate builds on.
//!
//! ## Design Philosophy
//!
//! Every external collaborator (chat model, embedder, moderator, tokenizer,
//! section store) is a trait here. Implementations live in their own crates,
//! so the retrieval pipeline can be driven against mocks in tests and against
//! hosted APIs in production.

pub mod embedding;
pub mod error;
pub mod message;
pub mod moderation;
pub mod provider;
pub mod retrieval;
pub mod section;
pub mod tokenizer;

// Re-export key types at crate root for ergonomics
pub use embedding::{Embedder, Embedding, normalize, similarity};
pub use error::{Error, FailedRecord, ProviderError, Result, StoreError};
pub use message::{ConversationTurn, Message, Role};
pub use moderation::{ModerationVerdict, Moderator};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use retrieval::{MatchParams, RetrievalOptions, Scorable, Scored};
pub use section::{DocumentSection, InsertReport, SectionStore};
pub use tokenizer::Tokenizer;
