//! Knowledge base retrieval client.
//!
//! Wraps the remote vector-search capability with the shared retry policy.
//! Result counts are clamped to the service ceiling before the request goes
//! out, whatever the caller asked for.

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::RagError;
use crate::remote::{retry_call, RemoteError, RetryPolicy};

/// Hard ceiling the retrieval service enforces per query.
pub const MAX_RESULTS_CEILING: usize = 10;

/// Fault codes the retrieval service emits for conditions worth retrying.
const TRANSIENT_FAULTS: &[&str] = &[
    "ThrottlingException",
    "InternalServerException",
    "ServiceUnavailableException",
    "LimitExceededException",
];

/// One ranked chunk from the knowledge base. Produced fresh per query,
/// never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub content: String,
    /// Source location payload, passed through to citations verbatim.
    pub location: Value,
    pub score: f64,
}

/// Remote semantic-search capability.
#[async_trait]
pub trait VectorSearch: Send + Sync {
    async fn retrieve(
        &self,
        knowledge_base_id: &str,
        query: &str,
        max_results: usize,
        next_token: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, RemoteError>;
}

#[derive(Clone)]
pub struct RetrievalClient {
    search: Arc<dyn VectorSearch>,
    knowledge_base_id: String,
    policy: RetryPolicy,
}

impl RetrievalClient {
    pub fn new(search: Arc<dyn VectorSearch>, knowledge_base_id: String) -> Self {
        Self {
            search,
            knowledge_base_id,
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }

    /// Retrieve ranked chunks for `query`, silently clamping `max_results`
    /// to `[1, MAX_RESULTS_CEILING]`.
    pub async fn retrieve(
        &self,
        query: &str,
        max_results: usize,
        next_token: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, RagError> {
        let capped = max_results.clamp(1, MAX_RESULTS_CEILING);

        tracing::info!(
            knowledge_base_id = %self.knowledge_base_id,
            max_results = capped,
            "retrieving from knowledge base"
        );

        let result = retry_call(&self.policy, "retrieve", TRANSIENT_FAULTS, || {
            self.search
                .retrieve(&self.knowledge_base_id, query, capped, next_token)
        })
        .await;

        match result {
            Ok(chunks) => {
                tracing::info!(count = chunks.len(), "retrieved chunks");
                Ok(chunks)
            }
            Err(err) => {
                let mut details = json!({
                    "query": query,
                    "knowledge_base_id": self.knowledge_base_id,
                });
                if let Some(code) = err.code() {
                    details["error_code"] = json!(code);
                }
                Err(RagError::knowledge_base(
                    format!("failed to retrieve from knowledge base: {err}"),
                    details,
                ))
            }
        }
    }
}
