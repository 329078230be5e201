use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use worldgate_concurrency::{Lock, LockError};
use worldgate_core::merge::{RankEntryUpdate, RankScoreUpdate, RankTypeUpdate};
use worldgate_core::RankScores;
use worldgate_durable::{DurableManager, LoadRequest as DurableLoadRequest, SaveRequest as DurableSaveRequest};
use worldgate_ephemeral::{EphemeralManager, PersistedItem};

const LOCK_KEY: &str = "background:persistence:lock";

/// Periodic drain of the Ephemeral dirty-set into the Durable store.
/// `run` is the production loop; `flush_once` is the deterministic,
/// no-sleeping drain point tests use instead.
pub struct Worker {
    ephemeral: Arc<EphemeralManager>,
    durable: Arc<DurableManager>,
    lock: Arc<Lock>,
    interval: Duration,
    batch_size: usize,
    lock_ttl: Duration,
}

impl Worker {
    pub fn new(
        ephemeral: Arc<EphemeralManager>,
        durable: Arc<DurableManager>,
        lock: Arc<Lock>,
        interval: Duration,
        batch_size: usize,
        lock_ttl: Duration,
    ) -> Self {
        Self { ephemeral, durable, lock, interval, batch_size, lock_ttl }
    }

    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.flush_once().await;
        }
    }

    /// Acquire → drain → release, with the lock released on every exit
    /// path including a panic inside the drain. Lock contention is not an
    /// error here: the tick is simply skipped.
    pub async fn flush_once(&self) {
        match self.lock.with_lock(LOCK_KEY, self.lock_ttl, || self.drain()).await {
            Ok(()) => {}
            Err(LockError::Contention) => {}
            Err(e) => warn!(error = %e, "background worker lock error"),
        }
    }

    async fn drain(&self) {
        let pending = match self.ephemeral.get_pending_updates(self.batch_size).await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "failed to sample pending updates");
                return;
            }
        };
        if pending.is_empty() {
            return;
        }

        let load_requests: Vec<DurableLoadRequest> = pending
            .iter()
            .map(|p| DurableLoadRequest {
                environment: p.entity.environment.clone(),
                entity_type: p.entity.entity_type.clone(),
                entity_id: p.entity.entity_id.clone(),
                world_id: p.entity.world_id,
            })
            .collect();
        let existing = self.durable.batch_load(load_requests).await;

        let save_requests: Vec<DurableSaveRequest> = pending
            .iter()
            .zip(existing.iter())
            .map(|(p, existing)| DurableSaveRequest {
                environment: p.entity.environment.clone(),
                entity_type: p.entity.entity_type.clone(),
                entity_id: p.entity.entity_id.clone(),
                world_id: p.entity.world_id,
                attributes: p.entity.attributes.clone(),
                rank_scores: to_rank_score_update(&p.entity.rank_scores),
                is_create: existing.is_none(),
                is_delete: p.entity.is_deleted,
            })
            .collect();

        let outcomes = self.durable.batch_partial_save(save_requests).await;

        let mut persisted_items = Vec::new();
        for (update, outcome) in pending.iter().zip(outcomes.iter()) {
            if outcome.success {
                persisted_items.push(PersistedItem {
                    environment: update.entity.environment.clone(),
                    entity_type: update.entity.entity_type.clone(),
                    entity_id: update.entity.entity_id.clone(),
                    world_id: update.entity.world_id,
                    persisted_version: update.entity.version,
                });
            } else if let Some(err) = &outcome.error {
                warn!(entity = %update.dirty_key, error = %err, "durable upsert failed for pending entity");
            }
        }

        if persisted_items.is_empty() {
            return;
        }

        let flush_outcomes = self.ephemeral.flush_persisted_entities(&persisted_items).await;
        let flushed_keys: Vec<String> = flush_outcomes.into_iter().filter(|f| f.flushed).map(|f| f.dirty_key).collect();

        if !flushed_keys.is_empty() {
            if let Err(e) = self.ephemeral.remove_dirty_keys(&flushed_keys).await {
                warn!(error = %e, "failed to remove dirty keys after flush");
            }
        }
    }
}

fn to_rank_score_update(rank_scores: &RankScores) -> RankScoreUpdate {
    rank_scores
        .iter()
        .map(|(score_type, partitions)| {
            let entries = partitions.iter().map(|(k, v)| (k.clone(), RankEntryUpdate::Set(*v))).collect();
            (score_type.clone(), RankTypeUpdate::Entries(entries))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::{HashMap, HashSet};
    use tokio::sync::Mutex;
    use worldgate_cache::Cache;
    use worldgate_concurrency::LockBackend;
    use worldgate_durable::{DurableBackend, DurableError, MergedUpsert, UpsertOutcome};
    use worldgate_ephemeral::{EphemeralBackend, EphemeralError, SaveRequest};

    #[derive(Default)]
    struct FakeLockBackend {
        values: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl LockBackend for FakeLockBackend {
        async fn set_if_absent(&self, key: &str, value: &str, _ttl: Duration) -> Result<bool, LockError> {
            let mut values = self.values.lock().await;
            if values.contains_key(key) {
                Ok(false)
            } else {
                values.insert(key.to_string(), value.to_string());
                Ok(true)
            }
        }
        async fn compare_and_delete(&self, key: &str, value: &str) -> Result<bool, LockError> {
            let mut values = self.values.lock().await;
            if values.get(key).map(|v| v.as_str()) == Some(value) {
                values.remove(key);
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    #[derive(Default)]
    struct FakeEphemeralBackend {
        docs: Mutex<HashMap<String, serde_json::Value>>,
        counters: Mutex<HashMap<String, u64>>,
        dirty: Mutex<HashSet<String>>,
    }

    #[async_trait]
    impl EphemeralBackend for FakeEphemeralBackend {
        async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>, EphemeralError> {
            let docs = self.docs.lock().await;
            Ok(keys.iter().map(|k| docs.contains_key(k)).collect())
        }
        async fn get_documents(&self, keys: &[String]) -> Result<Vec<Option<serde_json::Value>>, EphemeralError> {
            let docs = self.docs.lock().await;
            Ok(keys.iter().map(|k| docs.get(k).cloned()).collect())
        }
        async fn put_document(&self, key: &str, doc: &serde_json::Value) -> Result<(), EphemeralError> {
            self.docs.lock().await.insert(key.to_string(), doc.clone());
            Ok(())
        }
        async fn delete_document(&self, key: &str) -> Result<(), EphemeralError> {
            self.docs.lock().await.remove(key);
            Ok(())
        }
        async fn incr_counter(&self, counter_key: &str) -> Result<u64, EphemeralError> {
            let mut counters = self.counters.lock().await;
            let entry = counters.entry(counter_key.to_string()).or_insert(0);
            *entry += 1;
            Ok(*entry)
        }
        async fn delete_counter(&self, counter_key: &str) -> Result<(), EphemeralError> {
            self.counters.lock().await.remove(counter_key);
            Ok(())
        }
        async fn copy_snapshot(&self, _doc: &serde_json::Value, _snapshot_key: &str, _ttl: Duration) -> Result<bool, EphemeralError> {
            Ok(true)
        }
        async fn get_snapshots(&self, keys: &[String]) -> Result<Vec<Option<serde_json::Value>>, EphemeralError> {
            Ok(vec![None; keys.len()])
        }
        async fn dirty_add(&self, _set_key: &str, member: &str) -> Result<(), EphemeralError> {
            self.dirty.lock().await.insert(member.to_string());
            Ok(())
        }
        async fn dirty_sample(&self, _set_key: &str, n: usize) -> Result<Vec<String>, EphemeralError> {
            Ok(self.dirty.lock().await.iter().take(n).cloned().collect())
        }
        async fn dirty_count(&self, _set_key: &str) -> Result<u64, EphemeralError> {
            Ok(self.dirty.lock().await.len() as u64)
        }
        async fn dirty_remove(&self, _set_key: &str, members: &[String]) -> Result<(), EphemeralError> {
            let mut dirty = self.dirty.lock().await;
            for m in members {
                dirty.remove(m);
            }
            Ok(())
        }
        async fn conditional_delete(&self, key: &str, counter_key: &str, persisted_version: u64) -> Result<bool, EphemeralError> {
            let current = *self.counters.lock().await.get(counter_key).unwrap_or(&0);
            if current <= persisted_version {
                self.docs.lock().await.remove(key);
                self.counters.lock().await.remove(counter_key);
                Ok(true)
            } else {
                Ok(false)
            }
        }
    }

    #[derive(Default)]
    struct FakeDurableBackend {
        rows: Mutex<Vec<worldgate_core::Entity>>,
    }

    #[async_trait]
    impl DurableBackend for FakeDurableBackend {
        async fn fetch_existing(&self, environment: &str, entity_type: &str, world_id: u64, ids: &[String]) -> Result<Vec<worldgate_core::Entity>, DurableError> {
            let rows = self.rows.lock().await;
            Ok(rows
                .iter()
                .filter(|e| e.environment == environment && e.entity_type == entity_type && e.world_id == world_id && ids.contains(&e.entity_id))
                .cloned()
                .collect())
        }
        async fn upsert_chunk(&self, chunk: &[MergedUpsert]) -> Result<Vec<UpsertOutcome>, DurableError> {
            let mut rows = self.rows.lock().await;
            let mut out = Vec::new();
            for item in chunk {
                if let Some(existing) = rows
                    .iter_mut()
                    .find(|e| e.environment == item.environment && e.entity_type == item.entity_type && e.entity_id == item.entity_id)
                {
                    worldgate_core::merge::apply_attributes(&mut existing.attributes, &item.attributes);
                    worldgate_core::merge::apply_rank_scores(&mut existing.rank_scores, &item.rank_scores);
                    existing.is_deleted = item.is_delete;
                    existing.version += 1;
                    out.push(UpsertOutcome { entity_type: item.entity_type.clone(), entity_id: item.entity_id.clone(), world_id: item.world_id, success: true, version: existing.version, error: None });
                } else {
                    let mut attributes = HashMap::new();
                    worldgate_core::merge::apply_attributes(&mut attributes, &item.attributes);
                    let mut rank_scores = worldgate_core::RankScores::new();
                    worldgate_core::merge::apply_rank_scores(&mut rank_scores, &item.rank_scores);
                    rows.push(worldgate_core::Entity {
                        environment: item.environment.clone(),
                        entity_type: item.entity_type.clone(),
                        entity_id: item.entity_id.clone(),
                        world_id: item.world_id,
                        attributes,
                        rank_scores,
                        version: 1,
                        is_deleted: item.is_delete,
                        last_write: chrono::Utc::now(),
                        world_instance_id: String::new(),
                    });
                    out.push(UpsertOutcome { entity_type: item.entity_type.clone(), entity_id: item.entity_id.clone(), world_id: item.world_id, success: true, version: 1, error: None });
                }
            }
            Ok(out)
        }
        async fn search_by_name(&self, _e: &str, _t: &str, _w: Option<u64>, _p: &str, _l: usize) -> Result<Vec<worldgate_core::Entity>, DurableError> {
            Ok(Vec::new())
        }
        async fn get_ranked_entities(&self, _e: &str, _t: &str, _w: u64, _st: &str, _pk: &str, _so: worldgate_durable::SortOrder, _l: usize) -> Result<Vec<(worldgate_core::Entity, f64)>, DurableError> {
            Ok(Vec::new())
        }
        async fn get_entity_score(&self, _e: &str, _t: &str, _w: u64, _id: &str, _st: &str, _pk: &str) -> Result<Option<f64>, DurableError> {
            Ok(None)
        }
        async fn count_ranked(&self, _e: &str, _t: &str, _w: u64, _st: &str, _pk: &str) -> Result<u64, DurableError> {
            Ok(0)
        }
        async fn rank_of_score(&self, _e: &str, _t: &str, _w: u64, _st: &str, _pk: &str, _s: f64) -> Result<u64, DurableError> {
            Ok(1)
        }
    }

    fn worker() -> (Worker, Arc<EphemeralManager>, Arc<FakeDurableBackend>) {
        let lock = Arc::new(Lock::new(Arc::new(FakeLockBackend::default())));
        let ephemeral_backend = Arc::new(FakeEphemeralBackend::default());
        let ephemeral = Arc::new(EphemeralManager::new(ephemeral_backend, HashSet::new(), None));
        let durable_backend = Arc::new(FakeDurableBackend::default());
        let cache = Arc::new(Cache::new(None, Duration::from_secs(60), 1000));
        let durable = Arc::new(DurableManager::new(durable_backend.clone(), cache, None));
        let worker = Worker::new(ephemeral.clone(), durable, lock, Duration::from_secs(5), 500, Duration::from_secs(10));
        (worker, ephemeral, durable_backend)
    }

    #[tokio::test]
    async fn drains_dirty_set_into_durable_and_clears_dirty_keys() {
        let (worker, ephemeral, durable_backend) = worker();

        ephemeral
            .batch_partial_save(vec![SaveRequest {
                environment: "production".to_string(),
                entity_type: "Player".to_string(),
                entity_id: "p1".to_string(),
                world_id: 1,
                attributes: HashMap::from([("name".to_string(), json!("Hero"))]),
                rank_scores: HashMap::new(),
                is_create: true,
                is_delete: false,
            }])
            .await;
        assert_eq!(ephemeral.get_pending_count().await.unwrap(), 1);

        worker.flush_once().await;

        assert_eq!(ephemeral.get_pending_count().await.unwrap(), 0, "dirty key removed after a successful flush");
        assert_eq!(durable_backend.rows.lock().await.len(), 1, "entity landed in durable");
    }

    #[tokio::test]
    async fn second_tick_with_nothing_dirty_is_a_no_op() {
        let (worker, ephemeral, durable_backend) = worker();

        ephemeral
            .batch_partial_save(vec![SaveRequest {
                environment: "production".to_string(),
                entity_type: "Player".to_string(),
                entity_id: "p1".to_string(),
                world_id: 1,
                attributes: HashMap::from([("name".to_string(), json!("Hero"))]),
                rank_scores: HashMap::new(),
                is_create: true,
                is_delete: false,
            }])
            .await;

        worker.flush_once().await;
        assert_eq!(durable_backend.rows.lock().await.len(), 1);

        worker.flush_once().await;
        assert_eq!(durable_backend.rows.lock().await.len(), 1, "nothing dirty, second tick does not re-upsert");
        assert_eq!(ephemeral.get_pending_count().await.unwrap(), 0);
    }
}
