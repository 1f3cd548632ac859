use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::core::errors::RagError;
use crate::ingestion::UploadRecord;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadNotification {
    #[serde(default)]
    pub records: Vec<UploadRecord>,
}

/// Upload-notification boundary. Errors propagate as failure responses so
/// the notifying side redelivers the batch.
pub async fn notify_uploads(
    State(state): State<Arc<AppState>>,
    Json(notification): Json<UploadNotification>,
) -> Result<impl IntoResponse, RagError> {
    let response = state.ingestion.handle_upload_batch(notification.records).await?;
    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
pub struct JobStatusParams {
    pub data_source_id: Option<String>,
}

pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Query(params): Query<JobStatusParams>,
) -> Result<impl IntoResponse, RagError> {
    let status = state
        .ingestion
        .job_status(&job_id, params.data_source_id.as_deref())
        .await?;
    Ok(Json(status))
}
