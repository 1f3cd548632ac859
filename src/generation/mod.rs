//! Model invocation client.
//!
//! Each model family has its own request envelope and response shape; the
//! family is resolved once from the model identifier and the rest of the
//! dispatch is enum-driven. Generation is never retried: an invocation is
//! not safely idempotent, unlike read-only retrieval.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::RagError;
use crate::remote::RemoteError;

/// One chat turn as the model APIs expect it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// Supported provider families, resolved once from the model identifier.
///
/// This is the only place the free-text model id is sniffed; everything
/// downstream branches on the enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Claude,
    Llama,
}

impl ModelFamily {
    pub fn detect(model_id: &str) -> Option<Self> {
        let id = model_id.to_ascii_lowercase();
        if id.contains("claude") {
            Some(ModelFamily::Claude)
        } else if id.contains("llama") {
            Some(ModelFamily::Llama)
        } else {
            None
        }
    }
}

/// Sampling knobs with the service defaults.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2048,
        }
    }
}

/// Remote model-invocation capability: opaque JSON body in, JSON payload out.
#[async_trait]
pub trait ModelInvoker: Send + Sync {
    async fn invoke(&self, model_id: &str, body: Value) -> Result<Value, RemoteError>;
}

#[derive(Clone)]
pub struct GenerationClient {
    invoker: Arc<dyn ModelInvoker>,
}

impl GenerationClient {
    pub fn new(invoker: Arc<dyn ModelInvoker>) -> Self {
        Self { invoker }
    }

    /// Generate a completion for `messages` on `model_id`.
    ///
    /// Claude-family calls expect `messages` to hold only the latest user
    /// turn, with instructions, retrieved context and serialized history in
    /// `system_prompt`. Llama-family calls embed everything as role-tagged
    /// turns and ignore `system_prompt`.
    pub async fn generate(
        &self,
        model_id: &str,
        messages: &[ChatMessage],
        system_prompt: Option<&str>,
        params: &GenerationParams,
    ) -> Result<String, RagError> {
        let family = ModelFamily::detect(model_id).ok_or_else(|| {
            RagError::generation(
                format!("unsupported model: {model_id}"),
                json!({ "model_id": model_id, "unsupported_model": true }),
            )
        })?;

        let body = match family {
            ModelFamily::Claude => claude_body(messages, system_prompt, params),
            ModelFamily::Llama => llama_body(messages, params),
        };

        tracing::debug!(model_id, ?family, "invoking model");

        let payload = self.invoker.invoke(model_id, body).await.map_err(|err| {
            RagError::generation(
                format!("failed to invoke model {model_id}: {err}"),
                json!({ "model_id": model_id }),
            )
        })?;

        extract_text(family, &payload).ok_or_else(|| {
            RagError::generation(
                format!("malformed response from model {model_id}"),
                json!({ "model_id": model_id }),
            )
        })
    }
}

fn claude_body(
    messages: &[ChatMessage],
    system_prompt: Option<&str>,
    params: &GenerationParams,
) -> Value {
    let mut body = json!({
        "anthropic_version": "bedrock-2023-05-31",
        "max_tokens": params.max_tokens,
        "temperature": params.temperature,
        "messages": messages,
    });
    if let Some(system) = system_prompt {
        body["system_prompt"] = json!(system);
    }
    body
}

fn llama_body(messages: &[ChatMessage], params: &GenerationParams) -> Value {
    json!({
        "messages": messages,
        "temperature": params.temperature,
        "max_gen_len": params.max_tokens,
    })
}

fn extract_text(family: ModelFamily, payload: &Value) -> Option<String> {
    match family {
        ModelFamily::Claude => payload["content"][0]["text"].as_str().map(str::to_string),
        ModelFamily::Llama => payload["generation"].as_str().map(str::to_string),
    }
}
