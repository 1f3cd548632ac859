//! Knowledge base re-indexing trigger.
//!
//! Upload notifications arrive in batches; no matter how many files a batch
//! names, one re-indexing job covers them all because the indexer walks its
//! entire data source incrementally. Failures here are deliberately
//! re-raised so the upstream event source redelivers the batch
//! (at-least-once, never swallowed).

pub mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::RagError;
use crate::remote::RemoteError;

/// Remote asynchronous re-indexing capability.
#[async_trait]
pub trait IndexingJobs: Send + Sync {
    async fn start_job(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
    ) -> Result<Value, RemoteError>;

    async fn job_status(
        &self,
        knowledge_base_id: &str,
        data_source_id: &str,
        job_id: &str,
    ) -> Result<Value, RemoteError>;
}

/// One notified upload: storage bucket plus object key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub bucket: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct IngestionTriggerResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingestion_job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub files_triggered: Vec<UploadRecord>,
    pub files_count: usize,
}

#[derive(Clone)]
pub struct IngestionClient {
    jobs: Arc<dyn IndexingJobs>,
    knowledge_base_id: String,
    data_source_id: String,
}

impl IngestionClient {
    pub fn new(jobs: Arc<dyn IndexingJobs>, knowledge_base_id: String, data_source_id: String) -> Self {
        Self {
            jobs,
            knowledge_base_id,
            data_source_id,
        }
    }

    /// React to one batch of upload notifications. Empty batch is a no-op
    /// success; anything else starts exactly one re-indexing job.
    pub async fn handle_upload_batch(
        &self,
        records: Vec<UploadRecord>,
    ) -> Result<IngestionTriggerResponse, RagError> {
        if records.is_empty() {
            tracing::warn!("no upload records in notification batch");
            return Ok(IngestionTriggerResponse {
                message: "no records to process".into(),
                ingestion_job_id: None,
                status: None,
                files_triggered: Vec::new(),
                files_count: 0,
            });
        }

        for record in &records {
            tracing::info!(bucket = %record.bucket, key = %record.key, "detected upload");
        }
        tracing::info!(
            files = records.len(),
            knowledge_base_id = %self.knowledge_base_id,
            "starting ingestion job"
        );

        let payload = self
            .jobs
            .start_job(&self.knowledge_base_id, &self.data_source_id)
            .await
            .map_err(|err| self.job_error(format!("failed to start ingestion job: {err}"), &err))?;

        let job = &payload["ingestionJob"];
        let job_id = job["ingestionJobId"].as_str().map(str::to_string);
        let status = job["status"].as_str().map(str::to_string);
        tracing::info!(job_id = job_id.as_deref(), status = status.as_deref(), "ingestion job started");

        let files_count = records.len();
        Ok(IngestionTriggerResponse {
            message: "ingestion job started".into(),
            ingestion_job_id: job_id,
            status,
            files_triggered: records,
            files_count,
        })
    }

    /// Fetch a job's status payload verbatim.
    pub async fn job_status(
        &self,
        job_id: &str,
        data_source_id: Option<&str>,
    ) -> Result<Value, RagError> {
        let data_source = data_source_id.unwrap_or(&self.data_source_id);
        let payload = self
            .jobs
            .job_status(&self.knowledge_base_id, data_source, job_id)
            .await
            .map_err(|err| {
                self.job_error(format!("failed to get ingestion job status: {err}"), &err)
            })?;
        Ok(payload["ingestionJob"].clone())
    }

    fn job_error(&self, message: String, err: &RemoteError) -> RagError {
        let mut details = json!({
            "knowledge_base_id": self.knowledge_base_id,
            "data_source_id": self.data_source_id,
        });
        if let Some(code) = err.code() {
            details["error_code"] = json!(code);
        }
        RagError::knowledge_base(message, details)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct FakeJobs {
        start_calls: AtomicUsize,
        fail: bool,
    }

    impl FakeJobs {
        fn new(fail: bool) -> Self {
            Self {
                start_calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl IndexingJobs for FakeJobs {
        async fn start_job(
            &self,
            _knowledge_base_id: &str,
            _data_source_id: &str,
        ) -> Result<Value, RemoteError> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RemoteError::service("ServiceUnavailableException", "down"));
            }
            Ok(json!({"ingestionJob": {"ingestionJobId": "job-1", "status": "STARTING"}}))
        }

        async fn job_status(
            &self,
            _knowledge_base_id: &str,
            data_source_id: &str,
            job_id: &str,
        ) -> Result<Value, RemoteError> {
            Ok(json!({"ingestionJob": {
                "ingestionJobId": job_id,
                "dataSourceId": data_source_id,
                "status": "COMPLETE",
            }}))
        }
    }

    fn records(n: usize) -> Vec<UploadRecord> {
        (0..n)
            .map(|i| UploadRecord {
                bucket: "docs".into(),
                key: format!("file-{i}.pdf"),
            })
            .collect()
    }

    fn client(jobs: Arc<FakeJobs>) -> IngestionClient {
        IngestionClient::new(jobs, "kb-test".into(), "ds-test".into())
    }

    #[tokio::test]
    async fn batch_of_three_triggers_exactly_one_job() {
        let jobs = Arc::new(FakeJobs::new(false));
        let response = client(jobs.clone()).handle_upload_batch(records(3)).await.unwrap();

        assert_eq!(jobs.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(response.files_count, 3);
        assert_eq!(response.files_triggered.len(), 3);
        assert_eq!(response.ingestion_job_id.as_deref(), Some("job-1"));
        assert_eq!(response.status.as_deref(), Some("STARTING"));
    }

    #[tokio::test]
    async fn empty_batch_is_noop_success() {
        let jobs = Arc::new(FakeJobs::new(false));
        let response = client(jobs.clone()).handle_upload_batch(Vec::new()).await.unwrap();

        assert_eq!(jobs.start_calls.load(Ordering::SeqCst), 0);
        assert_eq!(response.files_count, 0);
        assert!(response.ingestion_job_id.is_none());
    }

    #[tokio::test]
    async fn start_failure_is_surfaced_not_swallowed() {
        let jobs = Arc::new(FakeJobs::new(true));
        let err = client(jobs).handle_upload_batch(records(1)).await.unwrap_err();

        assert!(matches!(err, RagError::KnowledgeBase { .. }));
        assert_eq!(err.details()["error_code"], "ServiceUnavailableException");
    }

    #[tokio::test]
    async fn job_status_defaults_data_source() {
        let jobs = Arc::new(FakeJobs::new(false));
        let status = client(jobs).job_status("job-9", None).await.unwrap();
        assert_eq!(status["dataSourceId"], "ds-test");
        assert_eq!(status["ingestionJobId"], "job-9");
    }
}
