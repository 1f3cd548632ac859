//! Remote capability plumbing shared by every service client.
//!
//! All four remote capabilities (vector search, model invocation, ingestion
//! jobs, the message store) speak JSON over HTTP. Failures are normalized
//! into [`RemoteError`] so the retry wrapper can classify them by fault code
//! instead of by exception type.

pub mod retry;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

pub use retry::{retry_call, RetryPolicy};

/// Outcome of a remote call that did not succeed.
///
/// `Service` carries the remote fault code and is eligible for retry when the
/// code is in the call site's transient set. `Transport` covers network-level
/// failures (connect, timeout, body read) and is never retried.
#[derive(Debug, Clone, Error)]
pub enum RemoteError {
    #[error("{code}: {message}")]
    Service { code: String, message: String },
    #[error("transport error: {0}")]
    Transport(String),
}

impl RemoteError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        RemoteError::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            RemoteError::Service { code, .. } => Some(code),
            RemoteError::Transport(_) => None,
        }
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(err: reqwest::Error) -> Self {
        RemoteError::Transport(err.to_string())
    }
}

/// Extract the fault code from an error response.
///
/// Order of precedence follows the wire conventions of the managed services:
/// the `x-amzn-errortype` header (`Code:junk` suffixes stripped), then the
/// body `__type` field (`namespace#Code`), then a synthesized `Http<status>`.
pub fn classify_failure(
    status: StatusCode,
    error_type_header: Option<&str>,
    body: &str,
) -> RemoteError {
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    let code = error_type_header
        .map(|raw| raw.split(':').next().unwrap_or(raw))
        .map(|raw| raw.rsplit('#').next().unwrap_or(raw))
        .map(str::to_string)
        .or_else(|| {
            parsed
                .as_ref()
                .and_then(|v| v.get("__type"))
                .and_then(Value::as_str)
                .map(|raw| raw.rsplit('#').next().unwrap_or(raw).to_string())
        })
        .unwrap_or_else(|| format!("Http{}", status.as_u16()));

    let message = parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("Message")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            }
        });

    RemoteError::Service { code, message }
}

/// Resolve a response into its JSON payload, classifying failures.
pub async fn into_json(res: reqwest::Response) -> Result<Value, RemoteError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.json().await?);
    }

    let error_type = res
        .headers()
        .get("x-amzn-errortype")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = res.text().await.unwrap_or_default();
    Err(classify_failure(status, error_type.as_deref(), &body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_from_header_strips_suffix() {
        let err = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            Some("ThrottlingException:http://internal/"),
            r#"{"message":"slow down"}"#,
        );
        assert_eq!(err.code(), Some("ThrottlingException"));
        assert!(err.to_string().contains("slow down"));
    }

    #[test]
    fn code_from_body_type_strips_namespace() {
        let err = classify_failure(
            StatusCode::BAD_REQUEST,
            None,
            r#"{"__type":"com.amazonaws.dynamodb.v20120810#ProvisionedThroughputExceededException","message":"throughput"}"#,
        );
        assert_eq!(err.code(), Some("ProvisionedThroughputExceededException"));
    }

    #[test]
    fn falls_back_to_http_status_code() {
        let err = classify_failure(StatusCode::BAD_GATEWAY, None, "upstream blew up");
        assert_eq!(err.code(), Some("Http502"));
        assert!(err.to_string().contains("upstream blew up"));
    }

    #[test]
    fn transport_errors_have_no_code() {
        let err = RemoteError::Transport("connection reset".into());
        assert_eq!(err.code(), None);
    }
}
