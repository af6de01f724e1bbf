//! Error types for the Docent domain.
//!
//! Each bounded context (providers, section storage) has its own error enum;
//! the top-level [`Error`] wraps them so the pipeline can propagate with `?`.

use thiserror::Error;

/// The top-level error type for all Docent operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Similarity ---
    #[error("Embedding dimension mismatch: {left} vs {right}")]
    DimensionMismatch { left: usize, right: usize },

    // --- Collaborators ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The chat model call failed. Nothing has been committed to the
    /// conversation store when this is returned.
    #[error("Completion failed: {0}")]
    Completion(ProviderError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] StoreError),

    // --- Files ---
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // --- Configuration ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Whether a retry has a chance of succeeding.
    ///
    /// Server-side failures, throttling and transport faults are transient;
    /// client errors (bad request, bad credentials) are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::RateLimited { .. } | Self::Timeout(_) | Self::Network(_) => true,
            Self::AuthenticationFailed(_) | Self::NotConfigured(_) | Self::InvalidResponse(_) => {
                false
            }
        }
    }
}

/// A single record rejected by a batch insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    /// Position of the record in the submitted batch.
    pub index: usize,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Batch insert failed for {} record(s); nothing was committed", .failed.len())]
    InsertFailed { failed: Vec<FailedRecord> },

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Stored embedding has dimension {actual}, query has {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}
