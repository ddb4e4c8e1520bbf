//! Error types for the RAG system

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration (chunking, top_k, retry budget, config file)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Embedding length differs from the configured index dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Query issued before any successful index build or load
    #[error("Vector index is not initialized. Run the indexing pass first")]
    NotInitialized,

    /// Embedding provider failed or timed out
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Language-model service failed or timed out
    #[error("Generation service unavailable: {0}")]
    GenerationUnavailable(String),

    /// A single document could not be loaded
    #[error("Failed to load document '{}': {message}", path.display())]
    DocumentLoad { path: PathBuf, message: String },

    /// Indexing pass produced no chunks
    #[error("No documents found to index")]
    EmptyCorpus,

    /// Another indexing pass holds the build slot
    #[error("An indexing pass is already running")]
    IndexingInProgress,

    /// Rejected request input
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a document load error
    pub fn document_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::DocumentLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an embedding-unavailable error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(message.into())
    }

    /// Create a generation-unavailable error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationUnavailable(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Stable snake_case code for logs and API bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "configuration_error",
            Error::DimensionMismatch { .. } => "dimension_mismatch",
            Error::NotInitialized => "not_initialized",
            Error::EmbeddingUnavailable(_) => "embedding_unavailable",
            Error::GenerationUnavailable(_) => "generation_unavailable",
            Error::DocumentLoad { .. } => "document_load_error",
            Error::EmptyCorpus => "empty_corpus",
            Error::IndexingInProgress => "indexing_in_progress",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Http(_) => "http_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Errors that must abort startup rather than fail a single request
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config(_) | Error::DimensionMismatch { .. })
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Config(_) | Error::DimensionMismatch { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::NotInitialized
            | Error::EmbeddingUnavailable(_)
            | Error::GenerationUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::DocumentLoad { .. } | Error::EmptyCorpus => StatusCode::UNPROCESSABLE_ENTITY,
            Error::IndexingInProgress => StatusCode::CONFLICT,
            Error::InvalidRequest(_) | Error::Json(_) => StatusCode::BAD_REQUEST,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Error::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "Request failed: {}", self);
        } else {
            tracing::debug!(kind = self.kind(), "Request rejected: {}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
