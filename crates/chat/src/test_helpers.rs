//! Scripted collaborators for pipeline tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use docent_core::{
    Embedder, Embedding, Message, ModerationVerdict, Moderator, Provider, ProviderError,
    ProviderRequest, ProviderResponse,
};

/// Returns scripted completions in order and records every request.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn answering<const N: usize>(answers: [&str; N]) -> Self {
        Self::new(answers.iter().map(|a| Ok(text_response(a))).collect())
    }

    pub fn failing(error: ProviderError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider: no more responses"))
    }
}

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        finish_reason: Some("stop".into()),
        usage: None,
        model: "gpt-3.5-turbo".into(),
    }
}

/// Embeds every input to the same vector and records the inputs.
pub struct ScriptedEmbedder {
    vector: Embedding,
    reject_empty: bool,
    inputs: Mutex<Vec<String>>,
}

impl ScriptedEmbedder {
    pub fn constant(vector: Embedding) -> Self {
        Self { vector, reject_empty: false, inputs: Mutex::new(Vec::new()) }
    }

    /// Like the hosted embeddings API: blank input is a 400.
    pub fn rejecting_empty(vector: Embedding) -> Self {
        Self { reject_empty: true, ..Self::constant(vector) }
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }
}

#[async_trait]
impl Embedder for ScriptedEmbedder {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn embed(&self, text: &str) -> Result<Embedding, ProviderError> {
        self.inputs.lock().unwrap().push(text.to_string());
        if self.reject_empty && text.trim().is_empty() {
            return Err(ProviderError::ApiError {
                status_code: 400,
                message: "input must not be empty".into(),
            });
        }
        Ok(self.vector.clone())
    }
}

pub struct ScriptedModerator {
    result: Result<ModerationVerdict, ProviderError>,
}

impl ScriptedModerator {
    pub fn allow() -> Self {
        Self { result: Ok(ModerationVerdict::allowed()) }
    }

    pub fn flag(category: &str) -> Self {
        Self {
            result: Ok(ModerationVerdict {
                flagged: true,
                categories: BTreeMap::from([(category.to_string(), true)]),
            }),
        }
    }

    pub fn failing(error: ProviderError) -> Self {
        Self { result: Err(error) }
    }
}

#[async_trait]
impl Moderator for ScriptedModerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn moderate(&self, _text: &str) -> Result<ModerationVerdict, ProviderError> {
        self.result.clone()
    }
}
