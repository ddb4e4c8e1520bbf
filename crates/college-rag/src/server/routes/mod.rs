//! HTTP routes for the RAG server

pub mod chat;
pub mod index;
pub mod status;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(status::info))
        .route("/health", get(status::health))
        .route("/stats", get(status::stats))
        .route("/chat", post(chat::chat))
        .route("/index", post(index::reindex))
}
