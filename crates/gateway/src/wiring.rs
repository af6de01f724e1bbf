//! Building the runtime collaborators from configuration.
//!
//! Shared by the HTTP gateway and the one-shot CLI commands, so both talk to
//! the same store through the same pipeline.

use std::path::Path;
use std::sync::Arc;

use docent_chat::{ChatPipeline, HeuristicTokenizer, PipelineConfig};
use docent_config::{AppConfig, StoreBackend, StoreConfig, TokenizerConfig, TokenizerKind};
use docent_core::{Error, Result, SectionStore, Tokenizer};
use docent_ingest::Ingestor;
use docent_memory::{ConversationStore, InMemorySectionStore, SqliteSectionStore};
use docent_providers::{build_from_config, collaborators};
use tracing::{info, warn};

use crate::AppState;

/// Open the configured section store, creating its schema if needed.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn SectionStore>> {
    match config.backend {
        StoreBackend::Memory => Ok(Arc::new(InMemorySectionStore::new())),
        StoreBackend::Sqlite => {
            let url = config.resolved_url().ok_or_else(|| Error::Config {
                message: "store.url could not be resolved".into(),
            })?;
            ensure_parent_dir(&url).await?;
            Ok(Arc::new(SqliteSectionStore::new(&url).await?))
        }
        StoreBackend::Postgres => open_postgres(config).await,
    }
}

async fn ensure_parent_dir(url: &str) -> Result<()> {
    if url.contains(":memory:") {
        return Ok(());
    }
    let path = url.trim_start_matches("sqlite://").trim_start_matches("sqlite:");
    match Path::new(path).parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            tokio::fs::create_dir_all(parent).await?;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[cfg(feature = "postgres")]
async fn open_postgres(config: &StoreConfig) -> Result<Arc<dyn SectionStore>> {
    let url = config.url.as_deref().ok_or_else(|| Error::Config {
        message: "store.url is required for the postgres backend".into(),
    })?;
    let store = docent_memory::PostgresSectionStore::connect(url).await?;
    store.migrate().await?;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "postgres"))]
async fn open_postgres(_config: &StoreConfig) -> Result<Arc<dyn SectionStore>> {
    Err(Error::Config {
        message: "PostgreSQL support is not compiled in (enable the `postgres` feature)".into(),
    })
}

/// Build the configured tokenizer.
pub async fn build_tokenizer(config: &TokenizerConfig) -> Result<Arc<dyn Tokenizer>> {
    match config.kind {
        TokenizerKind::Heuristic => Ok(Arc::new(HeuristicTokenizer)),
        TokenizerKind::Huggingface => load_hf_tokenizer(&config.repo).await,
    }
}

#[cfg(feature = "local")]
async fn load_hf_tokenizer(repo: &str) -> Result<Arc<dyn Tokenizer>> {
    let repo = repo.to_string();
    let tokenizer =
        tokio::task::spawn_blocking(move || docent_providers::HfTokenizer::from_repo(&repo))
            .await
            .map_err(|e| Error::Internal(format!("Tokenizer loader failed: {e}")))??;
    Ok(Arc::new(tokenizer))
}

#[cfg(not(feature = "local"))]
async fn load_hf_tokenizer(_repo: &str) -> Result<Arc<dyn Tokenizer>> {
    Err(Error::Config {
        message: "Hugging Face tokenizer support is not compiled in (enable the `local` feature)"
            .into(),
    })
}

impl AppState {
    /// Wire providers, store, tokenizer, pipeline and ingestor from `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        if !config.has_api_key() {
            warn!("No API key configured; hosted calls will be rejected");
        }

        let router = build_from_config(config);
        let hosted = collaborators(config, &router);
        let sections = open_store(&config.store).await?;
        let tokenizer = build_tokenizer(&config.tokenizer).await?;

        let pipeline = ChatPipeline::new(
            hosted.chat,
            hosted.embedder.clone(),
            hosted.moderator,
            sections.clone(),
            Arc::new(ConversationStore::new()),
        )
        .with_tokenizer(tokenizer.clone())
        .with_config(PipelineConfig::from(config));

        let ingestor = Ingestor::new(hosted.embedder, tokenizer, sections.clone())
            .with_extensions(config.ingest.extensions.clone());

        info!(
            store = sections.name(),
            model = %config.chat.model,
            docs_dir = %config.ingest.docs_dir.display(),
            "Runtime ready"
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
            ingestor: Arc::new(ingestor),
            sections,
            docs_dir: config.ingest.docs_dir.clone(),
            extensions: config.ingest.extensions.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_opens() {
        let config = StoreConfig { backend: StoreBackend::Memory, url: None };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn sqlite_file_gets_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sections.db");
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            url: Some(path.to_string_lossy().into_owned()),
        };
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.name(), "sqlite");
        assert!(path.exists());
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn postgres_without_feature_is_a_config_error() {
        let config = StoreConfig {
            backend: StoreBackend::Postgres,
            url: Some("postgresql://localhost/docent".into()),
        };
        assert!(matches!(open_store(&config).await, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn heuristic_tokenizer_by_default() {
        let tok = build_tokenizer(&TokenizerConfig::default()).await.unwrap();
        assert_eq!(tok.count_tokens("test"), 1);
    }

    #[tokio::test]
    async fn state_from_default_memory_config() {
        let mut config = AppConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.retrieval.recent_turns = 3;
        let state = AppState::from_config(&config).await.unwrap();
        assert_eq!(state.pipeline.config().recent_turns, 3);
        assert_eq!(state.extensions, vec!["md", "mdx"]);
    }
}
