//! Configuration loading, validation, and management for Docent.
//!
//! Loads configuration from `~/.docent/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use docent_core::MatchParams;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.docent/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub embeddings: EmbeddingConfig,

    #[serde(default)]
    pub moderation: ModerationConfig,

    #[serde(default)]
    pub tokenizer: TokenizerConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("chat", &self.chat)
            .field("embeddings", &self.embeddings)
            .field("moderation", &self.moderation)
            .field("tokenizer", &self.tokenizer)
            .field("retrieval", &self.retrieval)
            .field("store", &self.store)
            .field("ingest", &self.ingest)
            .field("gateway", &self.gateway)
            .field("providers", &self.providers)
            .finish()
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible API (`.../v1`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .finish()
    }
}

// ── Chat model ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_chat_model() -> String {
    "gpt-3.5-turbo".into()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_chat_timeout() -> u64 {
    60
}

impl ChatConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_chat_model(),
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_secs: default_chat_timeout(),
        }
    }
}

// ── Embeddings ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_call_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Scale returned vectors to unit length so dot product equals cosine.
    #[serde(default = "default_true")]
    pub normalize: bool,
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_call_timeout() -> u64 {
    30
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_true() -> bool {
    true
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_embedding_model(),
            timeout_secs: default_call_timeout(),
            retry_attempts: default_retry_attempts(),
            normalize: true,
        }
    }
}

// ── Moderation ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_provider")]
    pub provider: String,

    #[serde(default = "default_moderation_model")]
    pub model: String,

    #[serde(default = "default_moderation_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

fn default_moderation_model() -> String {
    "omni-moderation-latest".into()
}
fn default_moderation_timeout() -> u64 {
    15
}

impl ModerationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: default_provider(),
            model: default_moderation_model(),
            timeout_secs: default_moderation_timeout(),
            retry_attempts: default_retry_attempts(),
        }
    }
}

// ── Tokenizer ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenizerKind {
    /// Roughly four characters per token.
    Heuristic,
    /// A Hugging Face `tokenizer.json` (requires the `local` feature).
    Huggingface,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizerConfig {
    #[serde(default = "default_tokenizer_kind")]
    pub kind: TokenizerKind,

    /// Hub repository holding `tokenizer.json`
    #[serde(default = "default_tokenizer_repo")]
    pub repo: String,
}

fn default_tokenizer_kind() -> TokenizerKind {
    TokenizerKind::Heuristic
}
fn default_tokenizer_repo() -> String {
    "Xenova/gpt-3".into()
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { kind: default_tokenizer_kind(), repo: default_tokenizer_repo() }
    }
}

// ── Retrieval ───────────────────────────────────────────────────────────

/// Filters for one retrieval pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MatchConfig {
    pub similarity_threshold: f32,
    pub max_count: usize,
    #[serde(default)]
    pub min_content_length: usize,
}

impl From<MatchParams> for MatchConfig {
    fn from(p: MatchParams) -> Self {
        Self {
            similarity_threshold: p.similarity_threshold,
            max_count: p.max_count,
            min_content_length: p.min_content_length,
        }
    }
}

impl MatchConfig {
    pub fn params(&self) -> MatchParams {
        MatchParams {
            similarity_threshold: self.similarity_threshold,
            max_count: self.max_count,
            min_content_length: self.min_content_length,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Token ceiling shared by document and conversation context.
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Newest turns always included before similarity ranking kicks in.
    #[serde(default = "default_recent_turns")]
    pub recent_turns: usize,

    #[serde(default = "default_document_match")]
    pub documents: MatchConfig,

    #[serde(default = "default_conversation_match")]
    pub conversation: MatchConfig,
}

fn default_token_budget() -> usize {
    1500
}
fn default_recent_turns() -> usize {
    10
}
fn default_document_match() -> MatchConfig {
    MatchParams::documents().into()
}
fn default_conversation_match() -> MatchConfig {
    MatchParams::conversation().into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            recent_turns: default_recent_turns(),
            documents: default_document_match(),
            conversation: default_conversation_match(),
        }
    }
}

// ── Section store ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: StoreBackend,

    /// Database path or URL. SQLite defaults to `~/.docent/sections.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

fn default_store_backend() -> StoreBackend {
    StoreBackend::Sqlite
}

impl StoreConfig {
    /// The connection string to use, filling in the default SQLite path.
    pub fn resolved_url(&self) -> Option<String> {
        match (&self.url, self.backend) {
            (Some(url), _) => Some(url.clone()),
            (None, StoreBackend::Sqlite) => Some(
                AppConfig::config_dir()
                    .join("sections.db")
                    .to_string_lossy()
                    .into_owned(),
            ),
            (None, _) => None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: default_store_backend(), url: None }
    }
}

// ── Ingestion ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,

    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}
fn default_extensions() -> Vec<String> {
    vec!["md".into(), "mdx".into()]
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self { docs_dir: default_docs_dir(), extensions: default_extensions() }
    }
}

// ── Gateway ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,
}

fn default_port() -> u16 {
    5173
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self { port: default_port(), host: default_host() }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.docent/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `DOCENT_API_KEY`, then `OPENAI_API_KEY`, when no key is configured
    /// - `DOCENT_MODEL` for the chat model
    /// - `DOCENT_DOCS_DIR` for the ingestion directory
    /// - `DOCENT_STORE_URL` for the section store
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (normally the process environment).
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() {
            self.api_key = lookup("DOCENT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(model) = lookup("DOCENT_MODEL") {
            self.chat.model = model;
        }
        if let Some(dir) = lookup("DOCENT_DOCS_DIR") {
            self.ingest.docs_dir = PathBuf::from(dir);
        }
        if let Some(url) = lookup("DOCENT_STORE_URL") {
            self.store.url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docent")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::ValidationError(
                "chat.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.token_budget == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.token_budget must be > 0".into(),
            ));
        }

        for (name, m) in [
            ("documents", &self.retrieval.documents),
            ("conversation", &self.retrieval.conversation),
        ] {
            if !m.similarity_threshold.is_finite() {
                return Err(ConfigError::ValidationError(format!(
                    "retrieval.{name}.similarity_threshold must be a finite number"
                )));
            }
        }

        if self.store.backend == StoreBackend::Postgres && self.store.url.is_none() {
            return Err(ConfigError::ValidationError(
                "store.url is required for the postgres backend".into(),
            ));
        }

        if self.ingest.extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "ingest.extensions must list at least one extension".into(),
            ));
        }

        Ok(())
    }

    /// API key for a named provider: the provider's own key, else the global one.
    pub fn api_key_for(&self, provider: &str) -> Option<String> {
        self.providers
            .get(provider)
            .and_then(|p| p.api_key.clone())
            .or_else(|| self.api_key.clone())
    }

    /// Distinct providers the runtime will call, sorted by name.
    pub fn active_providers(&self) -> Vec<&str> {
        let mut names = vec![self.chat.provider.as_str(), self.embeddings.provider.as_str()];
        if self.moderation.enabled {
            names.push(self.moderation.provider.as_str());
        }
        names.sort_unstable();
        names.dedup();
        names
    }

    /// Whether every active provider resolves to a key, global or its own.
    pub fn has_api_key(&self) -> bool {
        self.active_providers()
            .into_iter()
            .all(|name| self.api_key_for(name).is_some())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            chat: ChatConfig::default(),
            embeddings: EmbeddingConfig::default(),
            moderation: ModerationConfig::default(),
            tokenizer: TokenizerConfig::default(),
            retrieval: RetrievalConfig::default(),
            store: StoreConfig::default(),
            ingest: IngestConfig::default(),
            gateway: GatewayConfig::default(),
            providers: HashMap::new(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigError> for docent_core::Error {
    fn from(e: ConfigError) -> Self {
        docent_core::Error::Config { message: e.to_string() }
    }
}
