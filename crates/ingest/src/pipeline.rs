//! Turning a docs directory into stored, embedded sections.

use std::path::Path;
use std::sync::Arc;

use docent_core::{DocumentSection, Embedder, Result, SectionStore, Tokenizer};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::documents::{SourceDocument, read_all};
use crate::markdown::split_sections;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub documents: usize,
    pub inserted: usize,
    pub unchanged: usize,
    /// Every generated record, in document order.
    pub sections: Vec<DocumentSection>,
}

/// Hex-encoded SHA-256 of a section's content.
pub fn checksum(content: &str) -> String {
    format!("{:x}", Sha256::digest(content.as_bytes()))
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    tokenizer: Arc<dyn Tokenizer>,
    store: Arc<dyn SectionStore>,
    extensions: Vec<String>,
}

impl Ingestor {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        tokenizer: Arc<dyn Tokenizer>,
        store: Arc<dyn SectionStore>,
    ) -> Self {
        Self {
            embedder,
            tokenizer,
            store,
            extensions: vec!["md".into(), "mdx".into()],
        }
    }

    /// Only ingest files with these extensions.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    /// Read, split, embed and store everything below `dir`.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<IngestReport> {
        info!(dir = %dir.display(), "Ingesting documents");
        let documents = read_all(dir, &self.extensions).await?;
        self.ingest(&documents).await
    }

    /// Replace the store's contents with the sections below `dir`.
    ///
    /// Sections of edited or deleted files are dropped. The documents are read
    /// before the store is cleared, so an unreadable directory leaves it intact.
    pub async fn rebuild_dir(&self, dir: &Path) -> Result<IngestReport> {
        let documents = read_all(dir, &self.extensions).await?;
        let previous = self.store.count().await?;
        self.store.clear().await?;
        info!(dir = %dir.display(), removed = previous, "Cleared section store");
        self.ingest(&documents).await
    }

    /// Split, embed and store already-loaded documents as one batch.
    pub async fn ingest(&self, documents: &[SourceDocument]) -> Result<IngestReport> {
        let mut sections = Vec::new();
        for doc in documents {
            let parts = split_sections(&doc.content);
            debug!(path = %doc.path, sections = parts.len(), "Split document");

            sections.extend(parts.into_iter().map(|part| DocumentSection {
                id: uuid::Uuid::new_v4().to_string(),
                source: doc.path.clone(),
                token_count: self.tokenizer.count_tokens(&part.content),
                checksum: checksum(&part.content),
                heading: part.heading,
                slug: part.slug,
                content: part.content,
                embedding: Vec::new(),
            }));
        }

        if sections.is_empty() {
            info!(documents = documents.len(), "No sections to ingest");
            return Ok(IngestReport { documents: documents.len(), inserted: 0, unchanged: 0, sections });
        }

        let texts: Vec<String> = sections.iter().map(|s| s.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        for (section, embedding) in sections.iter_mut().zip(embeddings) {
            section.embedding = embedding;
        }

        let report = self.store.insert_batch(sections.clone()).await?;
        info!(
            documents = documents.len(),
            sections = sections.len(),
            inserted = report.inserted,
            unchanged = report.unchanged,
            store = self.store.name(),
            "Ingestion complete"
        );

        Ok(IngestReport {
            documents: documents.len(),
            inserted: report.inserted,
            unchanged: report.unchanged,
            sections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docent_core::{Embedding, Error, ProviderError, StoreError};
    use docent_memory::InMemorySectionStore;

    /// Embeds text as `[len, 1.0]` so distinct sections get distinct vectors.
    struct LengthEmbedder;

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn name(&self) -> &str {
            "length"
        }

        async fn embed(&self, text: &str) -> std::result::Result<Embedding, ProviderError> {
            Ok(vec![text.len() as f32, 1.0])
        }
    }

    /// Returns one vector short, as a misbehaving API might.
    struct ShortEmbedder;

    #[async_trait]
    impl Embedder for ShortEmbedder {
        fn name(&self) -> &str {
            "short"
        }

        async fn embed(&self, _text: &str) -> std::result::Result<Embedding, ProviderError> {
            Ok(vec![])
        }
    }

    struct CharTokenizer;

    impl Tokenizer for CharTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            text.chars().count()
        }
    }

    fn ingestor(store: Arc<InMemorySectionStore>) -> Ingestor {
        Ingestor::new(Arc::new(LengthEmbedder), Arc::new(CharTokenizer), store)
    }

    fn doc(path: &str, content: &str) -> SourceDocument {
        SourceDocument { path: path.into(), content: content.into() }
    }

    #[tokio::test]
    async fn sections_are_embedded_and_stored() {
        let store = Arc::new(InMemorySectionStore::new());
        let report = ingestor(store.clone())
            .ingest(&[doc("a.md", "# One\n\nfirst\n\n# Two\n\nsecond\n")])
            .await
            .unwrap();

        assert_eq!(report.documents, 1);
        assert_eq!(report.inserted, 2);
        assert_eq!(store.count().await.unwrap(), 2);

        let first = &report.sections[0];
        assert_eq!(first.source, "a.md");
        assert_eq!(first.slug.as_deref(), Some("one"));
        assert_eq!(first.token_count, first.content.chars().count());
        assert_eq!(first.embedding, vec![first.content.len() as f32, 1.0]);
        assert_eq!(first.checksum, checksum("# One\n\nfirst"));
    }

    #[tokio::test]
    async fn reingesting_is_idempotent() {
        let store = Arc::new(InMemorySectionStore::new());
        let ingestor = ingestor(store.clone());
        let docs = [doc("a.md", "# One\n\nfirst\n")];

        ingestor.ingest(&docs).await.unwrap();
        let again = ingestor.ingest(&docs).await.unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.unchanged, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn empty_documents_produce_empty_report() {
        let store = Arc::new(InMemorySectionStore::new());
        let report = ingestor(store.clone()).ingest(&[doc("empty.md", "")]).await.unwrap();
        assert!(report.sections.is_empty());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn rejected_batch_commits_nothing() {
        let store = Arc::new(InMemorySectionStore::new());
        let ingestor = Ingestor::new(Arc::new(ShortEmbedder), Arc::new(CharTokenizer), store.clone());

        let err = ingestor.ingest(&[doc("a.md", "# One\n\nx\n")]).await.unwrap_err();
        assert!(matches!(err, Error::VectorStore(StoreError::InsertFailed { .. })));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ingests_a_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("guide.md"), "# Guide\n\nRead me.\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "# Ignored\n").unwrap();

        let store = Arc::new(InMemorySectionStore::new());
        let report = ingestor(store).ingest_dir(dir.path()).await.unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.sections[0].heading.as_deref(), Some("Guide"));
    }

    #[tokio::test]
    async fn rebuild_drops_sections_of_edited_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.md");
        std::fs::write(&path, "# Old\n\nstale advice\n").unwrap();

        let store = Arc::new(InMemorySectionStore::new());
        let ingestor = ingestor(store.clone());
        ingestor.ingest_dir(dir.path()).await.unwrap();

        std::fs::write(&path, "# New\n\ncurrent advice\n").unwrap();
        ingestor.ingest_dir(dir.path()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 2);

        let report = ingestor.rebuild_dir(dir.path()).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rebuild_of_missing_dir_keeps_the_store() {
        let store = Arc::new(InMemorySectionStore::new());
        let ingestor = ingestor(store.clone());
        ingestor.ingest(&[doc("a.md", "# One\n\nfirst\n")]).await.unwrap();

        let err = ingestor.rebuild_dir(Path::new("/nonexistent/docs")).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[test]
    fn checksum_is_hex_sha256() {
        assert_eq!(
            checksum(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
