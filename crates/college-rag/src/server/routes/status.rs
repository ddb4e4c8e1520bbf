//! Service information, health and statistics endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Response of `GET /health`
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` when the index is loaded and the model server answers, else `degraded`
    pub status: &'static str,
    pub vector_db_initialized: bool,
    pub ollama_available: bool,
}

/// Response of `GET /stats`
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub vector_db_initialized: bool,
    pub total_chunks: usize,
    pub generation: Option<u64>,
    /// `ready` or `not initialized`
    pub status: &'static str,
}

/// GET / - Service info
pub async fn info() -> Json<Value> {
    Json(json!({
        "name": "college-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over college documents with cited sources",
        "status": "running",
        "endpoints": {
            "GET /health": "Index readiness and model server availability",
            "GET /stats": "Vector index statistics",
            "POST /chat": "Ask a question",
            "POST /index": "Rebuild the vector index from the data directory",
        }
    }))
}

/// GET /health - Combined readiness signal
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let vector_db_initialized = state.is_ready();
    let ollama_available = state.pipeline().llm_available().await;

    Json(HealthResponse {
        status: if vector_db_initialized && ollama_available {
            "healthy"
        } else {
            "degraded"
        },
        vector_db_initialized,
        ollama_available,
    })
}

/// GET /stats - Vector index statistics
pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.pipeline().index().stats();

    Json(StatsResponse {
        vector_db_initialized: stats.initialized,
        total_chunks: stats.total_chunks,
        generation: stats.generation,
        status: if stats.initialized {
            "ready"
        } else {
            "not initialized"
        },
    })
}
