//! In-memory section store: useful for testing and ephemeral deployments.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use docent_core::{
    DocumentSection, Error, FailedRecord, InsertReport, RetrievalOptions, Scored, SectionStore,
    StoreError,
};
use tokio::sync::RwLock;

use crate::vector::rank;

/// Keeps every section in a `Vec` and ranks them on each query.
pub struct InMemorySectionStore {
    sections: Arc<RwLock<Vec<DocumentSection>>>,
}

impl InMemorySectionStore {
    pub fn new() -> Self {
        Self {
            sections: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemorySectionStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a ranking failure onto the store's error type.
pub(crate) fn ranking_error(err: Error) -> StoreError {
    match err {
        Error::DimensionMismatch { left, right } => {
            StoreError::DimensionMismatch { expected: left, actual: right }
        }
        other => StoreError::QueryFailed(other.to_string()),
    }
}

/// Reject records that could never be matched: empty embeddings and
/// embeddings whose length disagrees with `dimension`.
pub(crate) fn validate_batch(
    sections: &[DocumentSection],
    mut dimension: Option<usize>,
) -> Vec<FailedRecord> {
    let mut failed = Vec::new();
    for (index, section) in sections.iter().enumerate() {
        let len = section.embedding.len();
        if len == 0 {
            failed.push(FailedRecord { index, reason: "empty embedding".into() });
            continue;
        }
        match dimension {
            Some(dim) if dim != len => failed.push(FailedRecord {
                index,
                reason: format!("embedding dimension {len}, expected {dim}"),
            }),
            Some(_) => {}
            None => dimension = Some(len),
        }
    }
    failed
}

#[async_trait]
impl SectionStore for InMemorySectionStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn match_sections(
        &self,
        options: &RetrievalOptions<'_>,
    ) -> Result<Vec<Scored<DocumentSection>>, StoreError> {
        let sections = self.sections.read().await;
        rank(&sections, options).map_err(ranking_error)
    }

    async fn insert_batch(
        &self,
        batch: Vec<DocumentSection>,
    ) -> Result<InsertReport, StoreError> {
        let mut sections = self.sections.write().await;

        let dimension = sections.first().map(|s| s.embedding.len());
        let failed = validate_batch(&batch, dimension);
        if !failed.is_empty() {
            return Err(StoreError::InsertFailed { failed });
        }

        let mut known: HashSet<String> = sections.iter().map(|s| s.checksum.clone()).collect();
        let mut report = InsertReport::default();
        for section in batch {
            if known.insert(section.checksum.clone()) {
                sections.push(section);
                report.inserted += 1;
            } else {
                report.unchanged += 1;
            }
        }
        Ok(report)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.sections.read().await.len())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.sections.write().await.clear();
        Ok(())
    }
}
