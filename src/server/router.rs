use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::server::handlers::{health, ingestion, query};
use crate::state::AppState;

/// Application router: query boundary, ingestion boundary, health.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/query", post(query::query))
        .route("/api/ingestion/notifications", post(ingestion::notify_uploads))
        .route("/api/ingestion/jobs/:job_id", get(ingestion::job_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
