use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::IndexingJobs;
use crate::remote::{into_json, RemoteError};

/// HTTP client for the knowledge base control plane.
#[derive(Clone)]
pub struct IngestionJobsHttp {
    base_url: String,
    client: Client,
}

impl IngestionJobsHttp {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    fn jobs_url(&self, knowledge_base_id: &str, data_source_id: &str) -> String {
        format!(
            "{}/knowledgebases/{}/datasources/{}/ingestionjobs",
            self.base_url, knowledge_base_id, data_source_id
        )
    }
}

#[async_trait]
impl IndexingJobs for IngestionJobsHttp {
    async fn start_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<Value, RemoteError> {
        let url = self.jobs_url(knowledge_base_id, data_source_id);
        let res = self.client.put(&url).json(&json!({})).send().await?;
        into_json(res).await
    }

    async fn job_status(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        job_id: &str,
    ) -> Result<Value, RemoteError> {
        let url = format!("{}/{}", self.jobs_url(knowledge_base_id, data_source_id), job_id);
        let res = self.client.get(&url).send().await?;
        into_json(res).await
    }
}
