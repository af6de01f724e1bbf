//! Provider router: builds the hosted collaborators from configuration.
//!
//! Every named endpoint is an [`OpenAiCompatProvider`]; the router hands out
//! the same client as a chat provider, an embedder or a moderator, each
//! wrapped with the timeout and retry policy its config section asks for.

use std::collections::HashMap;
use std::sync::Arc;

use docent_config::AppConfig;
use docent_core::moderation::Moderator;
use docent_core::provider::Provider;
use docent_core::Embedder;
use tracing::debug;

use crate::openai_compat::OpenAiCompatProvider;
use crate::resilience::{
    PassthroughModerator, RetryPolicy, RetryingEmbedder, RetryingModerator, TimeoutProvider,
};

/// Named OpenAI-compatible endpoints.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<OpenAiCompatProvider>>,
}

impl ProviderRouter {
    pub fn new() -> Self {
        Self { providers: HashMap::new() }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<OpenAiCompatProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<OpenAiCompatProvider>> {
        self.providers.get(name).cloned()
    }
}

impl Default for ProviderRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// The three hosted collaborators the chat pipeline needs.
pub struct Collaborators {
    pub chat: Arc<dyn Provider>,
    pub embedder: Arc<dyn Embedder>,
    pub moderator: Arc<dyn Moderator>,
}

/// Build one provider per name referenced by the config.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new();

    let mut names: Vec<&str> = config.providers.keys().map(String::as_str).collect();
    names.extend([
        config.chat.provider.as_str(),
        config.embeddings.provider.as_str(),
        config.moderation.provider.as_str(),
    ]);

    for name in names {
        if router.get(name).is_some() {
            continue;
        }

        let base_url = config
            .providers
            .get(name)
            .and_then(|p| p.api_url.clone())
            .unwrap_or_else(|| default_base_url(name));
        let api_key = config.api_key_for(name).unwrap_or_default();

        let mut provider = OpenAiCompatProvider::new(name, &base_url, &api_key);
        if name == config.embeddings.provider {
            provider = provider
                .with_embedding_model(&config.embeddings.model)
                .with_normalized_embeddings(config.embeddings.normalize);
        }
        if name == config.moderation.provider {
            provider = provider.with_moderation_model(&config.moderation.model);
        }

        debug!(provider = name, base_url = %base_url, "Registered provider");
        router.register(name, Arc::new(provider));
    }

    router
}

/// Wire chat, embedding and moderation collaborators with their policies.
pub fn collaborators(config: &AppConfig, router: &ProviderRouter) -> Collaborators {
    let resolve = |name: &str| {
        router
            .get(name)
            .unwrap_or_else(|| Arc::new(OpenAiCompatProvider::new(name, default_base_url(name), "")))
    };

    let chat: Arc<dyn Provider> = Arc::new(TimeoutProvider::new(
        resolve(&config.chat.provider),
        config.chat.timeout(),
    ));

    let embedder: Arc<dyn Embedder> = Arc::new(RetryingEmbedder::new(
        resolve(&config.embeddings.provider),
        RetryPolicy::new(config.embeddings.timeout(), config.embeddings.retry_attempts),
    ));

    let moderator: Arc<dyn Moderator> = if config.moderation.enabled {
        Arc::new(RetryingModerator::new(
            resolve(&config.moderation.provider),
            RetryPolicy::new(config.moderation.timeout(), config.moderation.retry_attempts),
        ))
    } else {
        Arc::new(PassthroughModerator)
    };

    Collaborators { chat, embedder, moderator }
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "groq" => "https://api.groq.com/openai/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        "llamacpp" | "llama.cpp" => "http://localhost:8080/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docent_config::ProviderConfig;

    #[test]
    fn default_config_registers_openai_once() {
        let router = build_from_config(&AppConfig::default());
        assert_eq!(router.get("openai").unwrap().base_url(), "https://api.openai.com/v1");
        assert!(router.get("openrouter").is_none());
    }

    #[test]
    fn custom_endpoint_is_used() {
        let mut config = AppConfig::default();
        config.embeddings.provider = "local".into();
        config.providers.insert(
            "local".into(),
            ProviderConfig { api_key: None, api_url: Some("http://127.0.0.1:9999/v1".into()) },
        );
        let router = build_from_config(&config);
        assert_eq!(router.get("local").unwrap().base_url(), "http://127.0.0.1:9999/v1");
        assert!(router.get("openai").is_some());
    }

    #[test]
    fn known_base_urls() {
        assert!(default_base_url("ollama").contains("11434"));
        assert!(default_base_url("openrouter").contains("openrouter.ai"));
    }

    #[tokio::test]
    async fn disabled_moderation_is_passthrough() {
        let mut config = AppConfig::default();
        config.moderation.enabled = false;
        let router = build_from_config(&config);
        let c = collaborators(&config, &router);
        assert_eq!(c.moderator.name(), "passthrough");
        assert!(!c.moderator.moderate("anything").await.unwrap().flagged);
        assert_eq!(c.chat.name(), "openai");
    }
}
