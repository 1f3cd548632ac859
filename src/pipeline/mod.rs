//! Request orchestration: one pass per query, no intermediate state.
//!
//! Resolve conversation, fetch history, retrieve, compose, generate, persist
//! both turns, respond. Every remote call is strictly sequential; each stage
//! failure aborts the rest and surfaces typed.

pub mod prompt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::RagError;
use crate::generation::{ChatMessage, GenerationClient, GenerationParams, ModelFamily};
use crate::history::{generate_conversation_id, HistoryStore};
use crate::retrieval::{RetrievalClient, MAX_RESULTS_CEILING};

pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Query boundary input. Unknown fields are rejected at deserialization.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RagRequest {
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    /// Explicit history override; when present the store is never read.
    #[serde(default)]
    pub history: Option<Vec<ChatMessage>>,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceCitation {
    pub location: Value,
    pub score: f64,
}

#[derive(Debug, Serialize)]
pub struct RagResponse {
    pub response: String,
    pub sources: Vec<SourceCitation>,
    pub conversation_id: String,
    pub model_used: String,
}

#[derive(Clone)]
pub struct RagPipeline {
    retrieval: RetrievalClient,
    generation: GenerationClient,
    history: HistoryStore,
    default_model_id: String,
}

impl RagPipeline {
    pub fn new(
        retrieval: RetrievalClient,
        generation: GenerationClient,
        history: HistoryStore,
        default_model_id: String,
    ) -> Self {
        Self {
            retrieval,
            generation,
            history,
            default_model_id,
        }
    }

    pub async fn answer(&self, request: RagRequest) -> Result<RagResponse, RagError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(RagError::validation("query must not be empty"));
        }
        let max_results = request.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        if !(1..=MAX_RESULTS_CEILING).contains(&max_results) {
            return Err(RagError::validation(format!(
                "max_results must be between 1 and {MAX_RESULTS_CEILING}"
            )));
        }

        let model_id = request
            .model_id
            .clone()
            .unwrap_or_else(|| self.default_model_id.clone());
        let family = ModelFamily::detect(&model_id).ok_or_else(|| {
            RagError::generation(
                format!("unsupported model: {model_id}"),
                json!({ "model_id": model_id, "unsupported_model": true }),
            )
        })?;

        // Explicit history override bypasses the store for reads; otherwise
        // resolve the conversation and load its surviving turns.
        let (conversation_id, history) = match request.history {
            Some(turns) => {
                let id = match request.conversation_id {
                    Some(id) => id,
                    None => generate_conversation_id(),
                };
                (id, turns)
            }
            None => {
                self.history
                    .get_or_create_history(request.conversation_id.as_deref())
                    .await?
            }
        };

        let chunks = self.retrieval.retrieve(query, max_results, None).await?;

        let params = GenerationParams::default();
        let answer = match family {
            ModelFamily::Claude => {
                let (system, messages) = prompt::claude_prompt(&chunks, &history, query);
                self.generation
                    .generate(&model_id, &messages, Some(&system), &params)
                    .await?
            }
            ModelFamily::Llama => {
                let messages = prompt::llama_messages(&chunks, &history, query);
                self.generation
                    .generate(&model_id, &messages, None, &params)
                    .await?
            }
        };

        let sources: Vec<SourceCitation> = chunks
            .into_iter()
            .map(|chunk| SourceCitation {
                location: chunk.location,
                score: chunk.score,
            })
            .collect();

        // User turn first, then assistant. A write failure still surfaces as
        // a typed error, but the generated answer rides along in its details
        // so the boundary never has to discard it.
        self.history
            .append(&conversation_id, "user", query, None)
            .await
            .map_err(|err| attach_answer(err, &answer))?;

        let metadata = json!({
            "model_used": &model_id,
            "sources": &sources,
        });
        self.history
            .append(&conversation_id, "assistant", &answer, Some(metadata))
            .await
            .map_err(|err| attach_answer(err, &answer))?;

        Ok(RagResponse {
            response: answer,
            sources,
            conversation_id,
            model_used: model_id,
        })
    }
}

fn attach_answer(err: RagError, answer: &str) -> RagError {
    match err {
        RagError::Conversation {
            message,
            mut details,
        } => {
            details["generated_response"] = json!(answer);
            RagError::Conversation { message, details }
        }
        other => other,
    }
}
