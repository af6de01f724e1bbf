//! Document sections and the store that serves them.
//!
//! Sections are produced offline by ingestion and are read-only on the query
//! path. A [`SectionStore`] pushes the threshold, count and length filters down
//! to wherever the vectors live.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::embedding::Embedding;
use crate::error::StoreError;
use crate::retrieval::{RetrievalOptions, Scorable, Scored};

/// One heading-delimited chunk of a source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSection {
    pub id: String,

    /// Path of the source document, relative to the docs directory.
    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,

    /// URL fragment for the heading (`#getting-started`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,

    pub content: String,

    pub token_count: usize,

    /// SHA-256 of `content`, hex encoded. Stores use it to skip unchanged sections.
    pub checksum: String,

    pub embedding: Embedding,
}

impl Scorable for DocumentSection {
    fn embedding(&self) -> &[f32] {
        &self.embedding
    }

    fn content(&self) -> &str {
        &self.content
    }
}

/// Result of a successful batch insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertReport {
    pub inserted: usize,

    /// Sections whose checksum was already stored.
    pub unchanged: usize,
}

#[async_trait]
pub trait SectionStore: Send + Sync {
    fn name(&self) -> &str;

    /// Sections most similar to `options.target`, best first, already
    /// filtered by threshold, minimum length and count.
    async fn match_sections(
        &self,
        options: &RetrievalOptions<'_>,
    ) -> Result<Vec<Scored<DocumentSection>>, StoreError>;

    /// Insert a batch atomically.
    ///
    /// Either every section is committed or none is, in which case the error
    /// names the offending records by batch index.
    async fn insert_batch(&self, sections: Vec<DocumentSection>)
    -> Result<InsertReport, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}
