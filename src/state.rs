use std::sync::Arc;

use crate::config::AppConfig;
use crate::generation::http::ModelRuntimeHttp;
use crate::generation::GenerationClient;
use crate::history::dynamo::DynamoMessageStore;
use crate::history::HistoryStore;
use crate::ingestion::http::IngestionJobsHttp;
use crate::ingestion::IngestionClient;
use crate::pipeline::RagPipeline;
use crate::retrieval::http::KnowledgeBaseHttp;
use crate::retrieval::RetrievalClient;

/// Shared application state: configuration plus the wired-up clients.
/// Constructed once at startup; no per-request state lives here.
pub struct AppState {
    pub config: AppConfig,
    pub pipeline: RagPipeline,
    pub ingestion: IngestionClient,
}

impl AppState {
    pub fn initialize(config: AppConfig) -> Arc<Self> {
        let search = Arc::new(KnowledgeBaseHttp::new(config.retrieval_endpoint.clone()));
        let invoker = Arc::new(ModelRuntimeHttp::new(config.model_endpoint.clone()));
        let store = Arc::new(DynamoMessageStore::new(config.history_endpoint.clone()));
        let jobs = Arc::new(IngestionJobsHttp::new(config.ingestion_endpoint.clone()));

        let pipeline = RagPipeline::new(
            RetrievalClient::new(search, config.knowledge_base_id.clone()),
            GenerationClient::new(invoker),
            HistoryStore::new(store, config.conversations_table.clone()),
            config.default_model_id.clone(),
        );
        let ingestion = IngestionClient::new(
            jobs,
            config.knowledge_base_id.clone(),
            config.data_source_id.clone(),
        );

        Arc::new(Self {
            config,
            pipeline,
            ingestion,
        })
    }
}
