//! HTTP gateway for Docent.
//!
//! Routes:
//! - `POST /chat`: answer a query through the chat pipeline
//! - `GET|POST /generate-markdown-embeddings`: ingest the docs directory
//! - `GET /documents`: raw contents of every source document
//! - `GET /health`: liveness plus the stored section count
//!
//! Built on Axum.

pub mod api;
pub mod wiring;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::http::{Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use docent_chat::ChatPipeline;
use docent_config::AppConfig;
use docent_core::SectionStore;
use docent_ingest::Ingestor;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared application state for the gateway.
pub struct AppState {
    pub pipeline: Arc<ChatPipeline>,
    pub ingestor: Arc<Ingestor>,
    pub sections: Arc<dyn SectionStore>,
    pub docs_dir: PathBuf,
    pub extensions: Vec<String>,
}

pub type SharedState = Arc<AppState>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Request body size limit (1 MB)
/// - CORS for `GET`/`POST` with JSON bodies
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/health", get(api::health_handler))
        .route("/chat", post(api::chat_handler))
        .route(
            "/generate-markdown-embeddings",
            get(api::generate_embeddings_handler).post(api::generate_embeddings_handler),
        )
        .route("/documents", get(api::documents_handler))
        .layer(DefaultBodyLimit::max(1024 * 1024))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let state = Arc::new(AppState::from_config(&config).await?);
    let app = build_router(state);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
