//! OpenAI-compatible client.
//!
//! One HTTP client covers all three hosted collaborators the chat pipeline
//! needs: chat completions, embeddings and moderation. Works with OpenAI,
//! OpenRouter, Ollama, vLLM and any endpoint exposing the same routes.

use async_trait::async_trait;
use docent_core::error::ProviderError;
use docent_core::message::{Message, Role};
use docent_core::moderation::{ModerationVerdict, Moderator};
use docent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use docent_core::{Embedder, Embedding, normalize};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_MODERATION_MODEL: &str = "omni-moderation-latest";
/// Used when a 429 carries no parseable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 5;

/// An OpenAI-compatible provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    embedding_model: String,
    moderation_model: String,
    normalize_embeddings: bool,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.into(),
            moderation_model: DEFAULT_MODERATION_MODEL.into(),
            normalize_embeddings: true,
            client,
        }
    }

    /// The hosted OpenAI endpoint.
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_moderation_model(mut self, model: impl Into<String>) -> Self {
        self.moderation_model = model.into();
        self
    }

    /// Whether returned embeddings are scaled to unit length (default: on).
    pub fn with_normalized_embeddings(mut self, on: bool) -> Self {
        self.normalize_embeddings = on;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect()
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/{route}", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(e.to_string())
                } else {
                    ProviderError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(provider = %self.name, route, status, body = %error_body, "Provider returned error");
            return Err(ProviderError::ApiError { status_code: status, message: error_body });
        }

        Ok(response)
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(provider = %self.name, model = %request.model, "Sending completion request");

        let response = self.post_json("chat/completions", &body).await?;

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No choices in response".into()))?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message: Message {
                role: Role::Assistant,
                content: choice.message.content.unwrap_or_default(),
            },
            finish_reason: choice.finish_reason,
            usage,
            model: api_response.model,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        let mut batch = self.embed_batch(&[text.to_string()]).await?;
        batch
            .pop()
            .ok_or_else(|| ProviderError::InvalidResponse("Empty embedding response".into()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, ProviderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = serde_json::json!({
            "model": self.embedding_model,
            "input": texts,
            "encoding_format": "float",
        });

        debug!(
            provider = %self.name,
            model = %self.embedding_model,
            count = texts.len(),
            "Sending embedding request"
        );

        let response = self.post_json("embeddings", &body).await?;
        let mut api_resp: EmbeddingApiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse embedding response: {e}"))
        })?;

        if api_resp.data.len() != texts.len() {
            return Err(ProviderError::InvalidResponse(format!(
                "Asked for {} embeddings, got {}",
                texts.len(),
                api_resp.data.len()
            )));
        }

        api_resp.data.sort_by_key(|d| d.index);
        Ok(api_resp
            .data
            .into_iter()
            .map(|d| {
                let mut v = d.embedding;
                if self.normalize_embeddings {
                    normalize(&mut v);
                }
                v
            })
            .collect())
    }
}

#[async_trait]
impl Moderator for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn moderate(&self, text: &str) -> Result<ModerationVerdict, ProviderError> {
        let body = serde_json::json!({
            "model": self.moderation_model,
            "input": text,
        });

        debug!(provider = %self.name, model = %self.moderation_model, "Sending moderation request");

        let response = self.post_json("moderations", &body).await?;
        let api_resp: ModerationApiResponse = response.json().await.map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse moderation response: {e}"))
        })?;

        let result = api_resp
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::InvalidResponse("No moderation results".into()))?;

        Ok(ModerationVerdict { flagged: result.flagged, categories: result.categories })
    }
}

// --- OpenAI API wire types ---

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    model: String,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct EmbeddingApiResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ModerationApiResponse {
    results: Vec<ModerationResult>,
}

#[derive(Debug, Deserialize)]
struct ModerationResult {
    flagged: bool,
    #[serde(default)]
    categories: BTreeMap<String, bool>,
}
