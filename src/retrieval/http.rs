use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{RetrievedChunk, VectorSearch};
use crate::remote::{into_json, RemoteError};

/// HTTP client for the managed vector-search runtime.
#[derive(Clone)]
pub struct KnowledgeBaseHttp {
    base_url: String,
    client: Client,
}

impl KnowledgeBaseHttp {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl VectorSearch for KnowledgeBaseHttp {
    async fn retrieve(
        &self,
        knowledge_base_id: &str,
        query: &str,
        max_results: usize,
        next_token: Option<&str>,
    ) -> Result<Vec<RetrievedChunk>, RemoteError> {
        let url = format!("{}/knowledgebases/{}/retrieve", self.base_url, knowledge_base_id);

        let mut body = json!({
            "retrievalQuery": { "text": query },
            "retrievalConfiguration": {
                "vectorSearchConfiguration": { "numberOfResults": max_results }
            },
        });
        if let Some(token) = next_token {
            body["nextToken"] = json!(token);
        }

        let res = self.client.post(&url).json(&body).send().await?;
        let payload = into_json(res).await?;

        let chunks = payload["retrievalResults"]
            .as_array()
            .map(|results| {
                results
                    .iter()
                    .map(|item| RetrievedChunk {
                        content: item["content"]["text"].as_str().unwrap_or_default().to_string(),
                        location: item["location"].clone(),
                        score: item["score"].as_f64().unwrap_or(0.0),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(chunks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let http = KnowledgeBaseHttp::new("http://kb.internal/".into());
        assert_eq!(http.base_url, "http://kb.internal");
    }
}
