//! Question answering endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::{ChatAnswer, ChatRequest};

/// POST /chat - Answer a question from the indexed documents
///
/// Malformed bodies are reported as `invalid_request` like any other bad question.
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatAnswer>> {
    let Json(request) = payload?;
    let answer = state
        .pipeline()
        .ask(&request.question, request.conversation_id)
        .await?;
    Ok(Json(answer))
}
