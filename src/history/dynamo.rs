//! HTTP client for the durable message store.
//!
//! Speaks the DynamoDB JSON protocol: one endpoint, operation selected via
//! the `X-Amz-Target` header, values wrapped in typed attribute envelopes.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Map, Value};

use super::{MessageRecord, MessageStore};
use crate::remote::{into_json, RemoteError};

#[derive(Clone)]
pub struct DynamoMessageStore {
    endpoint: String,
    client: Client,
}

impl DynamoMessageStore {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    async fn post(&self, target: &str, body: &Value) -> Result<Value, RemoteError> {
        let res = self
            .client
            .post(&self.endpoint)
            .header("content-type", "application/x-amz-json-1.0")
            .header("x-amz-target", format!("DynamoDB_20120810.{target}"))
            .body(body.to_string())
            .send()
            .await?;
        into_json(res).await
    }
}

#[async_trait]
impl MessageStore for DynamoMessageStore {
    async fn put_message(&self, table: &str, record: MessageRecord) -> Result<(), RemoteError> {
        let mut item = Map::new();
        item.insert("conversation_id".into(), attr_s(&record.conversation_id));
        item.insert("message_id".into(), attr_n(record.message_id));
        item.insert("role".into(), attr_s(&record.role));
        item.insert("content".into(), attr_s(&record.content));
        item.insert("timestamp".into(), attr_s(&record.timestamp));
        item.insert("expires_at".into(), attr_n(record.expires_at));
        if let Some(metadata) = &record.metadata {
            item.insert("metadata".into(), attr_from_value(metadata));
        }

        let body = json!({ "TableName": table, "Item": item });
        self.post("PutItem", &body).await?;
        Ok(())
    }

    async fn query_messages(
        &self,
        table: &str,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<MessageRecord>, RemoteError> {
        let mut body = json!({
            "TableName": table,
            "KeyConditionExpression": "conversation_id = :cid",
            "ExpressionAttributeValues": { ":cid": attr_s(conversation_id) },
            "ScanIndexForward": true,
        });
        if let Some(n) = limit {
            body["Limit"] = json!(n);
        }

        let payload = self.post("Query", &body).await?;

        let records = payload["Items"]
            .as_array()
            .map(|items| items.iter().filter_map(record_from_item).collect())
            .unwrap_or_default();
        Ok(records)
    }
}

fn record_from_item(item: &Value) -> Option<MessageRecord> {
    Some(MessageRecord {
        conversation_id: item["conversation_id"]["S"].as_str()?.to_string(),
        message_id: item["message_id"]["N"].as_str()?.parse().ok()?,
        role: item["role"]["S"].as_str()?.to_string(),
        content: item["content"]["S"].as_str()?.to_string(),
        timestamp: item["timestamp"]["S"].as_str().unwrap_or_default().to_string(),
        expires_at: item["expires_at"]["N"]
            .as_str()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0),
        metadata: item.get("metadata").map(value_from_attr),
    })
}

fn attr_s(value: &str) -> Value {
    json!({ "S": value })
}

fn attr_n(value: i64) -> Value {
    json!({ "N": value.to_string() })
}

/// Wrap an arbitrary JSON value in typed attribute envelopes.
fn attr_from_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "NULL": true }),
        Value::Bool(b) => json!({ "BOOL": b }),
        Value::Number(n) => json!({ "N": n.to_string() }),
        Value::String(s) => json!({ "S": s }),
        Value::Array(items) => {
            json!({ "L": items.iter().map(attr_from_value).collect::<Vec<_>>() })
        }
        Value::Object(map) => {
            let wrapped: Map<String, Value> = map
                .iter()
                .map(|(k, v)| (k.clone(), attr_from_value(v)))
                .collect();
            json!({ "M": wrapped })
        }
    }
}

/// Unwrap typed attribute envelopes back into plain JSON.
fn value_from_attr(attr: &Value) -> Value {
    let Some(map) = attr.as_object() else {
        return Value::Null;
    };
    if let Some(s) = map.get("S").and_then(Value::as_str) {
        return Value::String(s.to_string());
    }
    if let Some(n) = map.get("N").and_then(Value::as_str) {
        return serde_json::from_str(n).unwrap_or(Value::Null);
    }
    if let Some(b) = map.get("BOOL").and_then(Value::as_bool) {
        return Value::Bool(b);
    }
    if map.contains_key("NULL") {
        return Value::Null;
    }
    if let Some(items) = map.get("L").and_then(Value::as_array) {
        return Value::Array(items.iter().map(value_from_attr).collect());
    }
    if let Some(inner) = map.get("M").and_then(Value::as_object) {
        return Value::Object(
            inner
                .iter()
                .map(|(k, v)| (k.clone(), value_from_attr(v)))
                .collect(),
        );
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_wrapping_round_trips_metadata() {
        let metadata = json!({
            "model_used": "anthropic.claude-v2",
            "sources": [{"score": 0.95, "pinned": true}],
            "note": null,
        });
        let wrapped = attr_from_value(&metadata);
        assert_eq!(wrapped["M"]["model_used"]["S"], "anthropic.claude-v2");
        assert_eq!(wrapped["M"]["sources"]["L"][0]["M"]["score"]["N"], "0.95");
        assert_eq!(value_from_attr(&wrapped), metadata);
    }

    #[test]
    fn record_parsed_from_typed_item() {
        let item = json!({
            "conversation_id": {"S": "conv-abc123def456"},
            "message_id": {"N": "1700000000000001"},
            "role": {"S": "assistant"},
            "content": {"S": "X is Y."},
            "timestamp": {"S": "2026-08-30T12:00:00+00:00"},
            "expires_at": {"N": "1700086400"},
        });
        let record = record_from_item(&item).unwrap();
        assert_eq!(record.conversation_id, "conv-abc123def456");
        assert_eq!(record.message_id, 1_700_000_000_000_001);
        assert_eq!(record.expires_at, 1_700_086_400);
        assert!(record.metadata.is_none());
    }

    #[test]
    fn malformed_item_is_skipped() {
        assert!(record_from_item(&json!({"conversation_id": {"S": "x"}})).is_none());
    }
}
