//! Conversation history on top of the durable key-value store.
//!
//! A conversation has no record of its own: it exists exactly as long as at
//! least one of its messages does. Every message carries its own expiry,
//! fixed at write time, so the oldest turns of a long conversation fall out
//! of the store first while newer turns survive (memory fade).

pub mod dynamo;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::core::errors::RagError;
use crate::generation::ChatMessage;
use crate::remote::{retry_call, RemoteError, RetryPolicy};

/// Fault codes the durable store emits for conditions worth retrying.
const TRANSIENT_FAULTS: &[&str] = &[
    "ThrottlingException",
    "InternalServerException",
    "ServiceUnavailableException",
    "ProvisionedThroughputExceededException",
];

/// Messages live one day by default.
pub const DEFAULT_RETENTION_SECS: i64 = 24 * 60 * 60;

/// One immutable message row. `message_id` is the microsecond epoch at
/// creation and doubles as the sort key; two logically concurrent writers
/// hitting the same conversation in the same microsecond would collide,
/// which is an accepted limitation at this scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    pub conversation_id: String,
    pub message_id: i64,
    pub role: String,
    pub content: String,
    pub timestamp: String,
    /// Epoch seconds after which the store drops the record.
    pub expires_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

/// Remote partition-keyed store with write-with-expiry semantics. Expiry is
/// the store's job; clients never filter expired rows themselves.
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn put_message(&self, table: &str, record: MessageRecord) -> Result<(), RemoteError>;

    async fn query_messages(
        &self,
        table: &str,
        conversation_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<MessageRecord>, RemoteError>;
}

#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn MessageStore>,
    table: String,
    retention: Duration,
    policy: RetryPolicy,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn MessageStore>, table: String) -> Self {
        Self {
            store,
            table,
            retention: Duration::seconds(DEFAULT_RETENTION_SECS),
            policy: RetryPolicy::default(),
        }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Write one immutable message. Expiry is fixed here and never refreshed
    /// by later writes to the same conversation.
    pub async fn append(
        &self,
        conversation_id: &str,
        role: &str,
        content: &str,
        metadata: Option<Value>,
    ) -> Result<(), RagError> {
        let now = Utc::now();
        let record = MessageRecord {
            conversation_id: conversation_id.to_string(),
            message_id: now.timestamp_micros(),
            role: role.to_string(),
            content: content.to_string(),
            timestamp: now.to_rfc3339(),
            expires_at: (now + self.retention).timestamp(),
            metadata,
        };
        let message_id = record.message_id;

        retry_call(&self.policy, "put_message", TRANSIENT_FAULTS, || {
            self.store.put_message(&self.table, record.clone())
        })
        .await
        .map_err(|err| {
            self.store_error(
                format!("failed to append message: {err}"),
                conversation_id,
                Some(message_id),
                &err,
            )
        })?;

        tracing::debug!(conversation_id, message_id, role, "appended message");
        Ok(())
    }

    /// All live messages for a conversation, oldest first. Returns an empty
    /// list (never a fault) when the conversation has no messages.
    pub async fn list(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, RagError> {
        let mut records = retry_call(&self.policy, "query_messages", TRANSIENT_FAULTS, || {
            self.store.query_messages(&self.table, conversation_id, None)
        })
        .await
        .map_err(|err| {
            self.store_error(
                format!("failed to fetch conversation history: {err}"),
                conversation_id,
                None,
                &err,
            )
        })?;

        // Chronological regardless of store-side physical ordering.
        records.sort_by_key(|r| r.message_id);

        Ok(records
            .into_iter()
            .map(|r| ChatMessage::new(r.role, r.content))
            .collect())
    }

    /// Resolve a usable conversation id: an existing one (probed by a
    /// single-result query) passes through unchanged, anything else gets a
    /// freshly generated id. Conversations themselves are created implicitly
    /// by the first `append`.
    pub async fn resolve_or_create(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<String, RagError> {
        if let Some(id) = conversation_id {
            let probe = retry_call(&self.policy, "probe_conversation", TRANSIENT_FAULTS, || {
                self.store.query_messages(&self.table, id, Some(1))
            })
            .await
            .map_err(|err| {
                self.store_error(
                    format!("failed to check conversation existence: {err}"),
                    id,
                    None,
                    &err,
                )
            })?;

            if !probe.is_empty() {
                return Ok(id.to_string());
            }
        }

        let fresh = generate_conversation_id();
        tracing::debug!(conversation_id = %fresh, "generated new conversation id");
        Ok(fresh)
    }

    pub async fn get_or_create_history(
        &self,
        conversation_id: Option<&str>,
    ) -> Result<(String, Vec<ChatMessage>), RagError> {
        let id = self.resolve_or_create(conversation_id).await?;
        let history = self.list(&id).await?;
        Ok((id, history))
    }

    fn store_error(
        &self,
        message: String,
        conversation_id: &str,
        message_id: Option<i64>,
        err: &RemoteError,
    ) -> RagError {
        let mut details = json!({
            "conversation_id": conversation_id,
            "table": self.table,
        });
        if let Some(id) = message_id {
            details["message_id"] = json!(id);
        }
        if let Some(code) = err.code() {
            details["error_code"] = json!(code);
        }
        RagError::conversation(message, details)
    }
}

/// `conv-` plus 12 lowercase hex characters.
pub fn generate_conversation_id() -> String {
    let bytes: [u8; 6] = rand::rng().random();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("conv-{hex}")
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// In-memory stand-in for the durable store. Honors per-record expiry on
    /// read, the way the managed store does, and returns rows in reverse
    /// insertion order to exercise client-side sorting.
    #[derive(Default)]
    struct FakeStore {
        rows: Mutex<HashMap<String, Vec<MessageRecord>>>,
        put_calls: AtomicUsize,
        query_calls: AtomicUsize,
        seen_limits: Mutex<Vec<Option<usize>>>,
        fail_with: Option<RemoteError>,
    }

    #[async_trait]
    impl MessageStore for FakeStore {
        async fn put_message(&self, _table: &str, record: MessageRecord) -> Result<(), RemoteError> {
            self.put_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            self.rows
                .lock()
                .unwrap()
                .entry(record.conversation_id.clone())
                .or_default()
                .push(record);
            Ok(())
        }

        async fn query_messages(
            &self,
            _table: &str,
            conversation_id: &str,
            limit: Option<usize>,
        ) -> Result<Vec<MessageRecord>, RemoteError> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_limits.lock().unwrap().push(limit);
            if let Some(err) = &self.fail_with {
                return Err(err.clone());
            }
            let now = Utc::now().timestamp();
            let mut live: Vec<MessageRecord> = self
                .rows
                .lock()
                .unwrap()
                .get(conversation_id)
                .map(|rows| {
                    rows.iter()
                        .filter(|r| r.expires_at > now)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            live.reverse();
            if let Some(n) = limit {
                live.truncate(n);
            }
            Ok(live)
        }
    }

    fn store(fake: Arc<FakeStore>) -> HistoryStore {
        HistoryStore::new(fake, "conversations".into())
    }

    #[tokio::test]
    async fn list_of_unknown_conversation_is_empty_not_a_fault() {
        let history = store(Arc::new(FakeStore::default()));
        assert!(history.list("conv-000000000000").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_sorts_ascending_despite_store_ordering() {
        let fake = Arc::new(FakeStore::default());
        let history = store(fake.clone());
        history.append("conv-aaa", "user", "first", None).await.unwrap();
        history.append("conv-aaa", "assistant", "second", None).await.unwrap();
        history.append("conv-aaa", "user", "third", None).await.unwrap();

        let turns = history.list("conv-aaa").await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn generated_ids_match_shape_and_stay_unique() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let id = generate_conversation_id();
            let suffix = id.strip_prefix("conv-").expect("conv- prefix");
            assert_eq!(suffix.len(), 12);
            assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
            assert!(seen.insert(id), "collision across 10k generated ids");
        }
    }

    #[tokio::test]
    async fn resolve_none_generates_fresh_id_without_probe() {
        let fake = Arc::new(FakeStore::default());
        let history = store(fake.clone());
        let id = history.resolve_or_create(None).await.unwrap();
        assert!(id.starts_with("conv-"));
        assert_eq!(fake.query_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn resolve_existing_id_passes_through_with_limit_one_probe() {
        let fake = Arc::new(FakeStore::default());
        let history = store(fake.clone());
        history.append("conv-bbb", "user", "hi", None).await.unwrap();

        let id = history.resolve_or_create(Some("conv-bbb")).await.unwrap();
        assert_eq!(id, "conv-bbb");
        assert_eq!(*fake.seen_limits.lock().unwrap(), vec![Some(1)]);
    }

    #[tokio::test]
    async fn resolve_unknown_id_generates_replacement() {
        let history = store(Arc::new(FakeStore::default()));
        let id = history.resolve_or_create(Some("conv-feedfacecafe")).await.unwrap();
        assert_ne!(id, "conv-feedfacecafe");
        assert!(id.starts_with("conv-"));
    }

    #[tokio::test]
    async fn get_or_create_history_returns_empty_for_fresh_conversation() {
        let history = store(Arc::new(FakeStore::default()));
        let (id, turns) = history.get_or_create_history(None).await.unwrap();
        assert!(id.starts_with("conv-"));
        assert!(turns.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_store_fault_retried_to_cap() {
        let fake = Arc::new(FakeStore {
            fail_with: Some(RemoteError::service(
                "ProvisionedThroughputExceededException",
                "throughput",
            )),
            ..FakeStore::default()
        });
        let err = store(fake.clone())
            .append("conv-ccc", "user", "hi", None)
            .await
            .unwrap_err();

        assert_eq!(fake.put_calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.details()["error_code"], "ProvisionedThroughputExceededException");
        assert_eq!(err.details()["conversation_id"], "conv-ccc");
    }

    #[tokio::test]
    async fn permanent_store_fault_surfaces_immediately() {
        let fake = Arc::new(FakeStore {
            fail_with: Some(RemoteError::service("ValidationException", "bad key")),
            ..FakeStore::default()
        });
        let err = store(fake.clone()).list("conv-ddd").await.unwrap_err();

        assert_eq!(fake.query_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(err, RagError::Conversation { .. }));
    }

    #[tokio::test]
    async fn expiry_is_per_message_not_per_conversation() {
        let fake = Arc::new(FakeStore::default());
        // Zero retention: the first message is already expired when read.
        let fading = store(fake.clone()).with_retention(Duration::seconds(0));
        fading.append("conv-eee", "user", "old turn", None).await.unwrap();

        let durable = store(fake.clone());
        durable.append("conv-eee", "assistant", "new turn", None).await.unwrap();

        let turns = durable.list("conv-eee").await.unwrap();
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["new turn"]);
    }

    #[tokio::test]
    async fn append_never_touches_existing_expiry() {
        let fake = Arc::new(FakeStore::default());
        let history = store(fake.clone());
        history.append("conv-fff", "user", "first", None).await.unwrap();
        let first_expiry = fake.rows.lock().unwrap()["conv-fff"][0].expires_at;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        history.append("conv-fff", "assistant", "second", None).await.unwrap();

        let rows = fake.rows.lock().unwrap();
        assert_eq!(rows["conv-fff"][0].expires_at, first_expiry);
    }
}
