//! Process configuration, read once at startup and injected everywhere.
//!
//! Required values fail fast with a clear message; nothing in the core does
//! ambient environment lookups.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Result};

const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";
const DEFAULT_FALLBACK_MODEL_ID: &str = "meta.llama3-1-8b-instruct-v1:0";
const DEFAULT_CONVERSATIONS_TABLE: &str = "conversations";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub knowledge_base_id: String,
    pub document_bucket: String,
    pub region: String,
    pub default_model_id: String,
    pub fallback_model_id: String,
    pub data_source_id: String,
    pub conversations_table: String,
    /// Vector-search runtime base URL.
    pub retrieval_endpoint: String,
    /// Model-invocation runtime base URL.
    pub model_endpoint: String,
    /// Durable message store endpoint.
    pub history_endpoint: String,
    /// Knowledge base control-plane base URL (ingestion jobs).
    pub ingestion_endpoint: String,
    pub log_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let knowledge_base_id = required(&lookup, "KNOWLEDGE_BASE_ID")?;
        let document_bucket = required(&lookup, "DOCUMENT_BUCKET")?;

        // Region resolution: explicit, then the ambient platform default,
        // then the hard default.
        let region = optional(&lookup, "AWS_REGION")
            .or_else(|| optional(&lookup, "AWS_DEFAULT_REGION"))
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let retrieval_endpoint = optional(&lookup, "RETRIEVAL_ENDPOINT")
            .unwrap_or_else(|| format!("https://bedrock-agent-runtime.{region}.amazonaws.com"));
        let model_endpoint = optional(&lookup, "MODEL_ENDPOINT")
            .unwrap_or_else(|| format!("https://bedrock-runtime.{region}.amazonaws.com"));
        let history_endpoint = optional(&lookup, "HISTORY_ENDPOINT")
            .unwrap_or_else(|| format!("https://dynamodb.{region}.amazonaws.com"));
        let ingestion_endpoint = optional(&lookup, "INGESTION_ENDPOINT")
            .unwrap_or_else(|| format!("https://bedrock-agent.{region}.amazonaws.com"));

        Ok(Self {
            knowledge_base_id,
            document_bucket,
            default_model_id: optional(&lookup, "DEFAULT_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            fallback_model_id: optional(&lookup, "FALLBACK_MODEL_ID")
                .unwrap_or_else(|| DEFAULT_FALLBACK_MODEL_ID.to_string()),
            data_source_id: optional(&lookup, "DATA_SOURCE_ID").unwrap_or_default(),
            conversations_table: optional(&lookup, "CONVERSATIONS_TABLE")
                .unwrap_or_else(|| DEFAULT_CONVERSATIONS_TABLE.to_string()),
            retrieval_endpoint,
            model_endpoint,
            history_endpoint,
            ingestion_endpoint,
            log_dir: optional(&lookup, "LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("logs")),
            region,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    match optional(lookup, name) {
        Some(value) => Ok(value),
        None => bail!("required environment variable {name} is not set"),
    }
}

/// Empty strings count as unset.
fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.trim().is_empty())
}
