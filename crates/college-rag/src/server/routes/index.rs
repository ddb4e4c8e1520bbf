//! Re-indexing endpoint

use axum::{extract::State, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::IndexReport;

/// POST /index - Rebuild the vector index from the data directory
///
/// Returns 409 while another pass is running.
pub async fn reindex(State(state): State<AppState>) -> Result<Json<IndexReport>> {
    tracing::info!("Re-indexing {}", state.config().documents.data_dir.display());
    let report = state.indexer().run().await?;
    Ok(Json(report))
}
