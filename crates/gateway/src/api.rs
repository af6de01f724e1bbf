//! Request handlers.

use std::collections::BTreeMap;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use docent_chat::ChatOutcome;
use docent_core::{DocumentSection, Error, Role};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::SharedState;

// ── DTOs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub role: Role,
    pub content: String,
    /// Document sections the answer was grounded on, as sent to the model.
    #[serde(default)]
    pub context: String,
    /// Conversation history sent alongside them.
    #[serde(default)]
    pub conversation: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flagged: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Stored sections, or `None` when the store could not be queried.
    pub sections: Option<usize>,
}

/// A generated section as returned by the ingestion endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct SectionRecord {
    pub content: String,
    pub token_count: usize,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    pub source: String,
}

impl From<DocumentSection> for SectionRecord {
    fn from(s: DocumentSection) -> Self {
        Self {
            content: s.content,
            token_count: s.token_count,
            embedding: s.embedding,
            heading: s.heading,
            slug: s.slug,
            source: s.source,
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: message.into(), flagged: None, categories: None }))
}

/// HTTP status for a pipeline or ingestion failure.
fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::Completion(_) | Error::Provider(_) => StatusCode::BAD_GATEWAY,
        Error::Io(e) if e.kind() == std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn into_api_error(what: &str, err: Error) -> ApiError {
    let status = status_for(&err);
    if status.is_server_error() {
        error!(error = %err, status = status.as_u16(), "{what} failed");
    } else {
        warn!(error = %err, status = status.as_u16(), "{what} rejected");
    }
    api_error(status, err.to_string())
}

// ── Handlers ──────────────────────────────────────────────────────────────

pub async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let sections = match state.sections.count().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(error = %e, "Section count failed");
            None
        }
    };

    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        sections,
    })
}

pub async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    info!(query_len = request.query.len(), "Chat request");

    match state.pipeline.run(&request.query).await {
        Ok(ChatOutcome::Answered(reply)) => Ok(Json(ChatResponse {
            role: reply.role,
            content: reply.content,
            context: reply.document_context,
            conversation: reply.conversation_context,
        })),
        Ok(ChatOutcome::Flagged(verdict)) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: "flagged content".into(),
                flagged: Some(true),
                categories: Some(verdict.categories),
            }),
        )),
        Err(e) => Err(into_api_error("Chat", e)),
    }
}

pub async fn generate_embeddings_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SectionRecord>>, ApiError> {
    let report = state
        .ingestor
        .ingest_dir(&state.docs_dir)
        .await
        .map_err(|e| into_api_error("Ingestion", e))?;

    Ok(Json(report.sections.into_iter().map(SectionRecord::from).collect()))
}

pub async fn documents_handler(
    State(state): State<SharedState>,
) -> Result<Json<Vec<String>>, ApiError> {
    let documents = docent_ingest::read_all(&state.docs_dir, &state.extensions)
        .await
        .map_err(|e| into_api_error("Document listing", Error::Io(e)))?;

    Ok(Json(documents.into_iter().map(|d| d.content).collect()))
}
