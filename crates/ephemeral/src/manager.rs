use crate::backend::EphemeralBackend;
use crate::error::EphemeralError;
use crate::models::{FlushOutcome, LoadOutcome, LoadRequest, PendingUpdate, PersistedItem, SaveOutcome, SaveRequest};
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use worldgate_core::{diff, keygen, merge, AffinityLookup, Entity};

/// Snapshot TTL for versioned diff reads (spec default ~1 hour).
const SNAPSHOT_TTL: Duration = Duration::from_secs(3600);

pub struct EphemeralManager {
    backend: Arc<dyn EphemeralBackend>,
    ephemeral_only_types: HashSet<String>,
    affinity: Option<Arc<dyn AffinityLookup>>,
}

impl EphemeralManager {
    pub fn new(
        backend: Arc<dyn EphemeralBackend>,
        ephemeral_only_types: HashSet<String>,
        affinity: Option<Arc<dyn AffinityLookup>>,
    ) -> Self {
        Self { backend, ephemeral_only_types, affinity }
    }

    fn is_ephemeral_only(&self, entity_type: &str) -> bool {
        self.ephemeral_only_types.contains(entity_type)
    }

    pub async fn batch_partial_save(&self, requests: Vec<SaveRequest>) -> Vec<SaveOutcome> {
        let keys: Vec<String> = requests
            .iter()
            .map(|r| keygen::ephemeral_key(&r.environment, &r.entity_type, r.world_id, &r.entity_id))
            .collect();

        let exists = match self.backend.exists_many(&keys).await {
            Ok(v) => v,
            Err(e) => return requests.iter().map(|_| SaveOutcome::Err { error: e.to_string() }).collect(),
        };

        let prefetched = match self.backend.get_documents(&keys).await {
            Ok(v) => v,
            Err(_) => vec![None; keys.len()],
        };

        let mut working: HashMap<String, Entity> = HashMap::new();
        for (key, doc) in keys.iter().zip(prefetched.into_iter()) {
            if let Some(doc) = doc.and_then(|v| serde_json::from_value::<Entity>(v).ok()) {
                working.insert(key.clone(), doc);
            }
        }

        let mut outcomes = Vec::with_capacity(requests.len());

        for (i, req) in requests.iter().enumerate() {
            let key = &keys[i];
            let key_exists = exists[i] || working.contains_key(key);

            if req.is_create && key_exists {
                outcomes.push(SaveOutcome::Err { error: "CREATE_CONFLICT".to_string() });
                continue;
            }
            if !req.is_create && !key_exists {
                let error = if req.is_delete { "DELETE_NONEXISTENT" } else { "NOT_FOUND" };
                outcomes.push(SaveOutcome::Err { error: error.to_string() });
                continue;
            }

            let counter_key = keygen::ephemeral_counter_key(&req.environment, &req.entity_type, req.world_id, &req.entity_id);
            let persistent = !self.is_ephemeral_only(&req.entity_type);

            if persistent {
                let dirty_key = keygen::dirty_key(&req.environment, &req.entity_type, req.world_id, &req.entity_id);
                if let Err(e) = self.backend.dirty_add(keygen::dirty_set_key(), &dirty_key).await {
                    outcomes.push(SaveOutcome::Err { error: e.to_string() });
                    continue;
                }
            }

            if req.is_delete {
                if !persistent {
                    let _ = self.backend.delete_document(key).await;
                    let _ = self.backend.delete_counter(&counter_key).await;
                    working.remove(key);
                    outcomes.push(SaveOutcome::Ok { version: 0, snapshot_warning: false });
                    continue;
                }

                let mut doc = working.get(key).cloned().unwrap_or_else(|| blank_entity(req));
                let version = match self.backend.incr_counter(&counter_key).await {
                    Ok(v) => v,
                    Err(e) => {
                        outcomes.push(SaveOutcome::Err { error: e.to_string() });
                        continue;
                    }
                };
                doc.is_deleted = true;
                doc.last_write = Utc::now();
                doc.version = version;
                let ok = self.persist_and_snapshot(key, &mut doc, &req.environment, &req.entity_type, req.world_id, &req.entity_id, version).await;
                working.insert(key.clone(), doc);
                outcomes.push(ok);
                continue;
            }

            let mut doc = working.get(key).cloned().unwrap_or_else(|| blank_entity(req));
            merge::apply_attributes(&mut doc.attributes, &req.attributes);
            merge::apply_rank_scores(&mut doc.rank_scores, &req.rank_scores);

            let version = match self.backend.incr_counter(&counter_key).await {
                Ok(v) => v,
                Err(e) => {
                    outcomes.push(SaveOutcome::Err { error: e.to_string() });
                    continue;
                }
            };
            doc.version = version;
            doc.last_write = Utc::now();

            let ok = self.persist_and_snapshot(key, &mut doc, &req.environment, &req.entity_type, req.world_id, &req.entity_id, version).await;
            working.insert(key.clone(), doc);
            outcomes.push(ok);
        }

        outcomes
    }

    async fn persist_and_snapshot(
        &self,
        key: &str,
        doc: &mut Entity,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        entity_id: &str,
        version: u64,
    ) -> SaveOutcome {
        let value = match serde_json::to_value(&*doc) {
            Ok(v) => v,
            Err(e) => return SaveOutcome::Err { error: e.to_string() },
        };
        if let Err(e) = self.backend.put_document(key, &value).await {
            return SaveOutcome::Err { error: e.to_string() };
        }

        let snapshot_key = keygen::ephemeral_version_snapshot_key(environment, entity_type, world_id, entity_id, version);
        let snapshot_ok = self.backend.copy_snapshot(&value, &snapshot_key, SNAPSHOT_TTL).await.unwrap_or(false);

        SaveOutcome::Ok { version, snapshot_warning: !snapshot_ok }
    }

    pub async fn batch_load(&self, requests: Vec<LoadRequest>) -> Vec<LoadOutcome> {
        let keys: Vec<String> = requests
            .iter()
            .map(|r| keygen::ephemeral_key(&r.environment, &r.entity_type, r.world_id, &r.entity_id))
            .collect();

        let docs = self.backend.get_documents(&keys).await.unwrap_or_else(|_| vec![None; keys.len()]);

        let snapshot_keys: Vec<Option<String>> = requests
            .iter()
            .map(|r| {
                r.version
                    .filter(|v| *v > 0)
                    .map(|v| keygen::ephemeral_version_snapshot_key(&r.environment, &r.entity_type, r.world_id, &r.entity_id, v))
            })
            .collect();
        let snapshot_lookup_keys: Vec<String> = snapshot_keys.iter().filter_map(|k| k.clone()).collect();
        let snapshots = self.backend.get_snapshots(&snapshot_lookup_keys).await.unwrap_or_default();
        let mut snapshot_iter = snapshots.into_iter();

        let mut out = Vec::with_capacity(requests.len());
        for (i, req) in requests.iter().enumerate() {
            let current = docs[i].clone().and_then(|v| serde_json::from_value::<Entity>(v).ok());

            let world_instance_id = if let Some(affinity) = &self.affinity {
                let stream_key = keygen::stream_key(&req.environment, &req.entity_type, req.world_id, &req.entity_id);
                affinity.get_affinity(&stream_key).await.unwrap_or_default()
            } else {
                String::new()
            };

            let Some(mut current) = current else {
                out.push(LoadOutcome::Missing);
                continue;
            };
            current.world_instance_id = world_instance_id.clone();

            let wants_snapshot = snapshot_keys[i].is_some();
            let snapshot = if wants_snapshot { snapshot_iter.next().flatten() } else { None };

            match snapshot.and_then(|v| serde_json::from_value::<Entity>(v).ok()) {
                Some(old) => out.push(LoadOutcome::Diff(diff::diff_entities(&old, &current), world_instance_id)),
                None => out.push(LoadOutcome::Full(current)),
            }
        }

        out
    }

    pub async fn get_pending_updates(&self, n: usize) -> Result<Vec<PendingUpdate>, EphemeralError> {
        let dirty_keys = self.backend.dirty_sample(keygen::dirty_set_key(), n).await?;
        let mut out = Vec::new();
        for dirty_key in dirty_keys {
            let Some((environment, entity_type, world_id, entity_id)) = parse_dirty_key(&dirty_key) else {
                continue;
            };
            let key = keygen::ephemeral_key(&environment, &entity_type, world_id, &entity_id);
            if let Ok(docs) = self.backend.get_documents(std::slice::from_ref(&key)).await {
                if let Some(Some(entity)) = docs.into_iter().next().map(|d| d.and_then(|v| serde_json::from_value::<Entity>(v).ok())) {
                    out.push(PendingUpdate { dirty_key, entity });
                }
            }
        }
        Ok(out)
    }

    pub async fn get_pending_count(&self) -> Result<u64, EphemeralError> {
        self.backend.dirty_count(keygen::dirty_set_key()).await
    }

    pub async fn remove_dirty_keys(&self, keys: &[String]) -> Result<(), EphemeralError> {
        self.backend.dirty_remove(keygen::dirty_set_key(), keys).await
    }

    pub async fn flush_persisted_entities(&self, items: &[PersistedItem]) -> Vec<FlushOutcome> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let key = keygen::ephemeral_key(&item.environment, &item.entity_type, item.world_id, &item.entity_id);
            let counter_key = keygen::ephemeral_counter_key(&item.environment, &item.entity_type, item.world_id, &item.entity_id);
            let dirty_key = keygen::dirty_key(&item.environment, &item.entity_type, item.world_id, &item.entity_id);
            let flushed = self
                .backend
                .conditional_delete(&key, &counter_key, item.persisted_version)
                .await
                .unwrap_or(false);
            out.push(FlushOutcome { dirty_key, flushed });
        }
        out
    }
}

fn blank_entity(req: &SaveRequest) -> Entity {
    Entity {
        environment: req.environment.clone(),
        entity_type: req.entity_type.clone(),
        entity_id: req.entity_id.clone(),
        world_id: req.world_id,
        attributes: HashMap::new(),
        rank_scores: HashMap::new(),
        version: 0,
        is_deleted: false,
        last_write: Utc::now(),
        world_instance_id: String::new(),
    }
}

/// Inverse of `keygen::dirty_key`: `<environment>:<entityType>:<worldId>:<entityId>`.
fn parse_dirty_key(dirty_key: &str) -> Option<(String, String, u64, String)> {
    let mut parts = dirty_key.splitn(4, ':');
    let environment = parts.next()?.to_string();
    let entity_type = parts.next()?.to_string();
    let world_id: u64 = parts.next()?.parse().ok()?;
    let entity_id = parts.next()?.to_string();
    Some((environment, entity_type, world_id, entity_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap as Map;
    use tokio::sync::Mutex;
    use worldgate_core::NULL_MARKER;

    #[derive(Default)]
    struct FakeEphemeralBackend {
        docs: Mutex<Map<String, serde_json::Value>>,
        counters: Mutex<Map<String, u64>>,
        snapshots: Mutex<Map<String, serde_json::Value>>,
        dirty: Mutex<std::collections::HashSet<String>>,
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

        async fn copy_snapshot(
            &self,
            doc: &serde_json::Value,
            snapshot_key: &str,
            _ttl: Duration,
        ) -> Result<bool, EphemeralError> {
            self.snapshots.lock().await.insert(snapshot_key.to_string(), doc.clone());
            Ok(true)
        }

        async fn get_snapshots(&self, keys: &[String]) -> Result<Vec<Option<serde_json::Value>>, EphemeralError> {
            let snapshots = self.snapshots.lock().await;
            Ok(keys.iter().map(|k| snapshots.get(k).cloned()).collect())
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

        async fn conditional_delete(
            &self,
            key: &str,
            counter_key: &str,
            persisted_version: u64,
        ) -> Result<bool, EphemeralError> {
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

    fn manager() -> EphemeralManager {
        EphemeralManager::new(Arc::new(FakeEphemeralBackend::default()), HashSet::new(), None)
    }

    fn save(env: &str, ty: &str, id: &str, world: u64, attrs: &[(&str, serde_json::Value)], create: bool, delete: bool) -> SaveRequest {
        SaveRequest {
            environment: env.to_string(),
            entity_type: ty.to_string(),
            entity_id: id.to_string(),
            world_id: world,
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            rank_scores: Map::new(),
            is_create: create,
            is_delete: delete,
        }
    }

    #[tokio::test]
    async fn s1_create_then_load_diff() {
        let mgr = manager();

        let outcomes = mgr
            .batch_partial_save(vec![save(
                "production",
                "Player",
                "p1",
                1,
                &[("name", json!("Hero")), ("hp", json!(100))],
                true,
                false,
            )])
            .await;
        assert!(matches!(outcomes[0], SaveOutcome::Ok { version: 1, .. }));

        let outcomes = mgr
            .batch_partial_save(vec![save("production", "Player", "p1", 1, &[("tag", json!("x"))], false, false)])
            .await;
        assert!(matches!(outcomes[0], SaveOutcome::Ok { version: 2, .. }));

        let outcomes = mgr
            .batch_partial_save(vec![save(
                "production",
                "Player",
                "p1",
                1,
                &[("hp", json!(80)), ("tag", json!(NULL_MARKER))],
                false,
                false,
            )])
            .await;
        assert!(matches!(outcomes[0], SaveOutcome::Ok { version: 3, .. }));

        let loads = mgr
            .batch_load(vec![LoadRequest {
                environment: "production".to_string(),
                entity_type: "Player".to_string(),
                entity_id: "p1".to_string(),
                world_id: 1,
                version: Some(1),
            }])
            .await;

        match &loads[0] {
            LoadOutcome::Diff(diff, _) => {
                assert_eq!(diff.attributes.get("hp"), Some(&json!(80)));
                assert_eq!(diff.attributes.get("tag"), Some(&json!(NULL_MARKER)));
                assert!(!diff.attributes.contains_key("name"));
            }
            other => panic!("expected Diff, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn create_conflict_rejects_second_create() {
        let mgr = manager();
        let req = save("production", "Player", "p1", 1, &[("name", json!("Hero"))], true, false);
        mgr.batch_partial_save(vec![req.clone()]).await;
        let outcomes = mgr.batch_partial_save(vec![req]).await;
        assert!(matches!(&outcomes[0], SaveOutcome::Err { error } if error == "CREATE_CONFLICT"));
    }

    #[tokio::test]
    async fn s3_ephemeral_only_delete_skips_dirty_set() {
        let mut ephemeral_only = HashSet::new();
        ephemeral_only.insert("OnlineMapData".to_string());
        let mgr = EphemeralManager::new(Arc::new(FakeEphemeralBackend::default()), ephemeral_only, None);

        mgr.batch_partial_save(vec![save("production", "OnlineMapData", "m1", 1, &[("x", json!(1))], true, false)])
            .await;
        assert_eq!(mgr.get_pending_count().await.unwrap(), 0);

        mgr.batch_partial_save(vec![save("production", "OnlineMapData", "m1", 1, &[], false, true)]).await;

        let loads = mgr
            .batch_load(vec![LoadRequest {
                environment: "production".to_string(),
                entity_type: "OnlineMapData".to_string(),
                entity_id: "m1".to_string(),
                world_id: 1,
                version: None,
            }])
            .await;
        assert!(matches!(loads[0], LoadOutcome::Missing));
    }

    #[tokio::test]
    async fn persistent_delete_marks_dirty_and_sets_is_deleted() {
        let mgr = manager();
        mgr.batch_partial_save(vec![save("production", "Player", "p1", 1, &[("name", json!("Hero"))], true, false)])
            .await;
        assert_eq!(mgr.get_pending_count().await.unwrap(), 1);

        mgr.batch_partial_save(vec![save("production", "Player", "p1", 1, &[], false, true)]).await;

        let loads = mgr
            .batch_load(vec![LoadRequest {
                environment: "production".to_string(),
                entity_type: "Player".to_string(),
                entity_id: "p1".to_string(),
                world_id: 1,
                version: None,
            }])
            .await;
        match &loads[0] {
            LoadOutcome::Full(entity) => assert!(entity.is_deleted),
            other => panic!("expected Full, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn s4_flush_refused_when_version_advanced_since_sample() {
        let mgr = manager();
        mgr.batch_partial_save(vec![save("production", "Player", "p1", 1, &[("name", json!("Hero"))], true, false)])
            .await;
        // version now 1; simulate a later write advancing it to 2.
        mgr.batch_partial_save(vec![save("production", "Player", "p1", 1, &[("name", json!("Hero2"))], false, false)])
            .await;

        let flushed = mgr
            .flush_persisted_entities(&[PersistedItem {
                environment: "production".to_string(),
                entity_type: "Player".to_string(),
                entity_id: "p1".to_string(),
                world_id: 1,
                persisted_version: 1,
            }])
            .await;
        assert!(!flushed[0].flushed, "flush must be refused when current version exceeds persisted");

        let flushed = mgr
            .flush_persisted_entities(&[PersistedItem {
                environment: "production".to_string(),
                entity_type: "Player".to_string(),
                entity_id: "p1".to_string(),
                world_id: 1,
                persisted_version: 2,
            }])
            .await;
        assert!(flushed[0].flushed);
    }
}
