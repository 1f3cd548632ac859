use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::ModelInvoker;
use crate::remote::{into_json, RemoteError};

/// HTTP client for the managed model runtime.
#[derive(Clone)]
pub struct ModelRuntimeHttp {
    base_url: String,
    client: Client,
}

impl ModelRuntimeHttp {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl ModelInvoker for ModelRuntimeHttp {
    async fn invoke(&self, model_id: &str, body: Value) -> Result<Value, RemoteError> {
        let url = format!("{}/model/{}/invoke", self.base_url, model_id);
        let res = self.client.post(&url).json(&body).send().await?;
        into_json(res).await
    }
}
