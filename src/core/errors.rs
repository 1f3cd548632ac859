use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};
use thiserror::Error;

/// Typed failure taxonomy for the RAG core.
///
/// Every variant carries a human-readable message plus a structured detail
/// map (ids, operation names) so callers can diagnose without log archaeology.
#[derive(Debug, Error)]
pub enum RagError {
    #[error("knowledge base error: {message}")]
    KnowledgeBase { message: String, details: Value },
    #[error("generation error: {message}")]
    Generation { message: String, details: Value },
    #[error("conversation store error: {message}")]
    Conversation { message: String, details: Value },
    #[error("invalid request: {message}")]
    Validation { message: String, details: Value },
}

impl RagError {
    pub fn knowledge_base(message: impl Into<String>, details: Value) -> Self {
        RagError::KnowledgeBase {
            message: message.into(),
            details,
        }
    }

    pub fn generation(message: impl Into<String>, details: Value) -> Self {
        RagError::Generation {
            message: message.into(),
            details,
        }
    }

    pub fn conversation(message: impl Into<String>, details: Value) -> Self {
        RagError::Conversation {
            message: message.into(),
            details,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        RagError::Validation {
            message: message.into(),
            details: Value::Null,
        }
    }

    pub fn details(&self) -> &Value {
        match self {
            RagError::KnowledgeBase { details, .. }
            | RagError::Generation { details, .. }
            | RagError::Conversation { details, .. }
            | RagError::Validation { details, .. } => details,
        }
    }
}

impl IntoResponse for RagError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            RagError::Validation { .. } => StatusCode::BAD_REQUEST,
            RagError::Generation { details, .. } => {
                // Caller picked a model family we cannot dispatch to.
                if details.get("unsupported_model").is_some() {
                    StatusCode::BAD_REQUEST
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
            RagError::KnowledgeBase { .. } | RagError::Conversation { .. } => {
                StatusCode::BAD_GATEWAY
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
            "details": self.details(),
        }));
        (status, body).into_response()
    }
}
