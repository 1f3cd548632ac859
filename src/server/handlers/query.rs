use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;

use crate::core::errors::RagError;
use crate::pipeline::RagRequest;
use crate::state::AppState;

/// Query boundary: schema validation (including unknown-field rejection)
/// happens in the Json extractor, semantic validation in the pipeline.
pub async fn query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RagRequest>,
) -> Result<impl IntoResponse, RagError> {
    let response = state.pipeline.answer(request).await?;
    Ok(Json(response))
}
