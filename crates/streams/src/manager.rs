use crate::backend::StreamBackend;
use crate::models::{AddMessage, PullOutcome, PullRequest};
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use worldgate_core::keygen;

pub struct StreamManager {
    backend: Arc<dyn StreamBackend>,
    affinity_ttl: Duration,
    stream_ttl: Duration,
}

impl StreamManager {
    pub fn new(backend: Arc<dyn StreamBackend>, affinity_ttl: Duration, stream_ttl: Duration) -> Self {
        Self { backend, affinity_ttl, stream_ttl }
    }

    /// Pipelined, fire-and-forget: callers get immediate success regardless
    /// of whether the append round trip has completed.
    pub async fn batch_add_messages(&self, messages: Vec<AddMessage>) {
        let entries: Vec<(String, serde_json::Value)> = messages
            .into_iter()
            .map(|m| {
                let key = keygen::stream_key(&m.environment, &m.entity_type, m.world_id, &m.entity_id);
                (key, m.message)
            })
            .collect();

        if let Err(e) = self.backend.append_batch(&entries, self.stream_ttl).await {
            tracing::warn!(error = %e, "stream append failed");
        }
    }

    pub async fn batch_pull_messages(&self, requests: Vec<PullRequest>, world_instance_id: &str) -> Vec<PullOutcome> {
        let keys: Vec<String> = requests
            .iter()
            .map(|r| keygen::stream_key(&r.environment, &r.entity_type, r.world_id, &r.entity_id))
            .collect();

        let claims = join_all(keys.iter().map(|key| self.backend.claim_affinity(key, world_instance_id, self.affinity_ttl)));
        let claims = claims.await;

        let pulls = join_all(requests.iter().zip(keys.iter()).map(|(req, key)| {
            let from = req.timestamp.as_deref().unwrap_or("-");
            let count = req.count.unwrap_or(worldgate_core::limits::DEFAULT_STREAM_PULL_COUNT);
            self.backend.pull_range(key, from, count)
        }));
        let pulls = pulls.await;

        claims
            .into_iter()
            .zip(pulls)
            .map(|(claim, pull)| match (claim, pull) {
                (Ok(owner), Ok(data)) => PullOutcome { success: true, world_instance_id: Some(owner), data },
                (Ok(owner), Err(e)) => {
                    tracing::warn!(error = %e, "stream pull failed");
                    PullOutcome { success: false, world_instance_id: Some(owner), data: Vec::new() }
                }
                (Err(e), _) => {
                    tracing::warn!(error = %e, "stream affinity claim failed");
                    PullOutcome { success: false, world_instance_id: None, data: Vec::new() }
                }
            })
            .collect()
    }
}

#[async_trait]
impl worldgate_core::AffinityLookup for StreamManager {
    async fn get_affinity(&self, stream_key: &str) -> Option<String> {
        self.backend.get_affinity(stream_key).await.ok().flatten()
    }
}

#[async_trait]
impl worldgate_core::ChangeEventSink for StreamManager {
    async fn enqueue_change(&self, stream_key: &str, payload: serde_json::Value) {
        if let Err(e) = self.backend.append_batch(&[(stream_key.to_string(), payload)], self.stream_ttl).await {
            tracing::warn!(error = %e, "change-event append failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use crate::models::StreamEntry;
    use serde_json::json;
    use std::collections::HashMap;
    use tokio::sync::Mutex;
    use worldgate_core::AffinityLookup;

    #[derive(Default)]
    struct FakeStreamBackend {
        entries: Mutex<HashMap<String, Vec<StreamEntry>>>,
        affinity: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl StreamBackend for FakeStreamBackend {
        async fn append_batch(&self, entries: &[(String, serde_json::Value)], _ttl: Duration) -> Result<(), StreamError> {
            let mut store = self.entries.lock().await;
            for (key, payload) in entries {
                store.entry(key.clone()).or_default().push(StreamEntry { data: payload.clone(), timestamp: 0 });
            }
            Ok(())
        }

        async fn pull_range(&self, stream_key: &str, _from: &str, count: usize) -> Result<Vec<StreamEntry>, StreamError> {
            let store = self.entries.lock().await;
            Ok(store.get(stream_key).cloned().unwrap_or_default().into_iter().take(count).collect())
        }

        async fn get_affinity(&self, stream_key: &str) -> Result<Option<String>, StreamError> {
            Ok(self.affinity.lock().await.get(stream_key).cloned())
        }

        async fn claim_affinity(&self, stream_key: &str, world_instance_id: &str, _ttl: Duration) -> Result<String, StreamError> {
            let mut affinity = self.affinity.lock().await;
            match affinity.get(stream_key) {
                Some(owner) if owner != world_instance_id => Ok(owner.clone()),
                _ => {
                    affinity.insert(stream_key.to_string(), world_instance_id.to_string());
                    Ok(world_instance_id.to_string())
                }
            }
        }
    }

    fn manager() -> StreamManager {
        StreamManager::new(Arc::new(FakeStreamBackend::default()), Duration::from_secs(60), Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn add_then_pull_returns_message() {
        let mgr = manager();
        mgr.batch_add_messages(vec![AddMessage {
            environment: "production".into(),
            entity_type: "Player".into(),
            entity_id: "p1".into(),
            world_id: 1,
            message: json!({"text": "hi"}),
        }])
        .await;

        let outcomes = mgr
            .batch_pull_messages(
                vec![PullRequest {
                    environment: "production".into(),
                    entity_type: "Player".into(),
                    entity_id: "p1".into(),
                    world_id: 1,
                    timestamp: None,
                    count: None,
                }],
                "instance-a",
            )
            .await;

        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].world_instance_id.as_deref(), Some("instance-a"));
        assert_eq!(outcomes[0].data.len(), 1);
        assert_eq!(outcomes[0].data[0].data, json!({"text": "hi"}));
    }

    #[tokio::test]
    async fn s6_second_owner_does_not_override_existing_affinity() {
        let mgr = manager();
        let key = keygen::stream_key("production", "Player", 1, "p1");

        let req = vec![PullRequest {
            environment: "production".into(),
            entity_type: "Player".into(),
            entity_id: "p1".into(),
            world_id: 1,
            timestamp: None,
            count: None,
        }];

        let first = mgr.batch_pull_messages(req.clone(), "instance-a").await;
        assert_eq!(first[0].world_instance_id.as_deref(), Some("instance-a"));

        let second = mgr.batch_pull_messages(req, "instance-b").await;
        assert_eq!(second[0].world_instance_id.as_deref(), Some("instance-a"), "existing owner is not overwritten");

        assert_eq!(AffinityLookup::get_affinity(&mgr, &key).await.as_deref(), Some("instance-a"));
    }

    #[tokio::test]
    async fn change_event_sink_filters_nothing_itself_caller_must_filter_null_marker() {
        let mgr = manager();
        worldgate_core::ChangeEventSink::enqueue_change(&mgr, "stream:production:entity:Player:1:p1", json!({"hp": 10})).await;

        let pulled = mgr
            .batch_pull_messages(
                vec![PullRequest {
                    environment: "production".into(),
                    entity_type: "Player".into(),
                    entity_id: "p1".into(),
                    world_id: 1,
                    timestamp: None,
                    count: None,
                }],
                "instance-a",
            )
            .await;
        assert_eq!(pulled[0].data[0].data, json!({"hp": 10}));
    }
}
