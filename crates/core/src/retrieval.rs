//! Retrieval parameters and scored candidates.

use serde::{Deserialize, Serialize};

use crate::message::ConversationTurn;

/// Anything the ranking engine can score: it has text and an embedding.
pub trait Scorable {
    fn embedding(&self) -> &[f32];
    fn content(&self) -> &str;
}

impl Scorable for ConversationTurn {
    fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    fn content(&self) -> &str {
        &self.content
    }
}

/// Filtering knobs for one retrieval pass, without the target vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchParams {
    /// Minimum similarity a candidate needs to be kept.
    pub similarity_threshold: f32,

    /// Maximum number of candidates returned.
    pub max_count: usize,

    /// Minimum content length in characters. `0` disables the filter.
    pub min_content_length: usize,
}

impl MatchParams {
    /// Document-section retrieval: short fragments are noise.
    pub const fn documents() -> Self {
        Self { similarity_threshold: 0.3, max_count: 10, min_content_length: 50 }
    }

    /// Older conversation turns: any length is fine.
    pub const fn conversation() -> Self {
        Self { similarity_threshold: 0.3, max_count: 10, min_content_length: 0 }
    }

    pub fn with_target<'a>(&self, target: &'a [f32]) -> RetrievalOptions<'a> {
        RetrievalOptions {
            target,
            similarity_threshold: self.similarity_threshold,
            max_count: self.max_count,
            min_content_length: self.min_content_length,
        }
    }
}

/// A complete retrieval request: target embedding plus filters.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions<'a> {
    pub target: &'a [f32],
    pub similarity_threshold: f32,
    pub max_count: usize,
    pub min_content_length: usize,
}

impl RetrievalOptions<'_> {
    /// Whether a scored candidate passes the threshold and length filters.
    pub fn accepts(&self, similarity: f32, content: &str) -> bool {
        similarity >= self.similarity_threshold
            && content.chars().count() >= self.min_content_length
    }
}

/// A candidate paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored<T> {
    pub item: T,
    pub similarity: f32,
}
