use crate::backend::CacheBackend;
use crate::error::CacheError;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use worldgate_security::SequenceStore;

/// One L1 slot: the raw bytes plus the instant it stops being valid.
#[derive(Clone)]
pub struct CacheEntry {
    pub value: Vec<u8>,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: Vec<u8>, ttl: Duration) -> Self {
        Self { value, expires_at: Instant::now() + ttl }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Hybrid cache: an in-process `DashMap` (L1) in front of an optional
/// `CacheBackend` (L2, normally Redis). Reads try L1, then L2 (populating
/// L1 on hit); writes go to both. A dependency index lets callers tag a
/// cache key with the entity keys it was derived from, so a write to an
/// entity can invalidate every cache key that was computed from it
/// (search results, rankings) without tracking those keys explicitly.
pub struct Cache {
    l1: DashMap<String, CacheEntry>,
    l2: Option<Arc<dyn CacheBackend>>,
    default_ttl: Duration,
    capacity: usize,
    /// entity key -> set of dependent cache keys
    forward_index: DashMap<String, Vec<String>>,
    /// dependent cache key -> set of entity keys it depends on
    reverse_index: DashMap<String, Vec<String>>,
}

impl Cache {
    pub fn new(l2: Option<Arc<dyn CacheBackend>>, default_ttl: Duration, capacity: usize) -> Self {
        Self {
            l1: DashMap::new(),
            l2,
            default_ttl,
            capacity,
            forward_index: DashMap::new(),
            reverse_index: DashMap::new(),
        }
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(entry) = self.l1.get(key) {
            if !entry.is_expired() {
                return Some(entry.value.clone());
            }
            drop(entry);
            self.l1.remove(key);
        }

        let l2 = self.l2.as_ref()?;
        match l2.get(key).await {
            Ok(Some(value)) => {
                self.insert_l1(key, value.clone());
                Some(value)
            }
            Ok(None) => None,
            Err(err) => {
                tracing::warn!(cache_key = key, error = %err, "L2 get failed, treating as miss");
                None
            }
        }
    }

    pub async fn mget(&self, keys: &[String]) -> Vec<Option<Vec<u8>>> {
        let mut out = vec![None; keys.len()];
        let mut misses = Vec::new();

        for (i, key) in keys.iter().enumerate() {
            if let Some(entry) = self.l1.get(key) {
                if !entry.is_expired() {
                    out[i] = Some(entry.value.clone());
                    continue;
                }
                drop(entry);
                self.l1.remove(key);
            }
            misses.push(i);
        }

        if misses.is_empty() {
            return out;
        }

        let Some(l2) = self.l2.as_ref() else { return out };
        let miss_keys: Vec<String> = misses.iter().map(|&i| keys[i].clone()).collect();
        match l2.mget(&miss_keys).await {
            Ok(values) => {
                for (slot, value) in misses.into_iter().zip(values) {
                    if let Some(value) = value {
                        self.insert_l1(&keys[slot], value.clone());
                        out[slot] = Some(value);
                    }
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "L2 mget failed, treating all misses as empty");
            }
        }

        out
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        self.insert_l1(key, value.clone());
        if let Some(l2) = &self.l2 {
            if let Err(err) = l2.set(key, &value, ttl).await {
                tracing::warn!(cache_key = key, error = %err, "L2 set failed");
            }
        }
    }

    pub async fn mset(&self, entries: Vec<(String, Vec<u8>)>, ttl: Option<Duration>) {
        let ttl = ttl.unwrap_or(self.default_ttl);
        for (key, value) in &entries {
            self.insert_l1(key, value.clone());
        }
        if let Some(l2) = &self.l2 {
            if let Err(err) = l2.mset(&entries, ttl).await {
                tracing::warn!(error = %err, "L2 mset failed");
            }
        }
    }

    /// Records that `cache_key` was derived from `entity_key`, so a future
    /// `invalidate_entities([entity_key])` also evicts `cache_key`.
    pub fn track_dependency(&self, cache_key: &str, entity_key: &str) {
        self.forward_index.entry(entity_key.to_string()).or_default().push(cache_key.to_string());
        self.reverse_index.entry(cache_key.to_string()).or_default().push(entity_key.to_string());
    }

    /// Evicts every cache key that depends on any of `entity_keys`, plus
    /// the entity keys themselves, from both tiers.
    pub async fn invalidate_entities(&self, entity_keys: &[String]) {
        let mut to_delete: Vec<String> = entity_keys.to_vec();

        for entity_key in entity_keys {
            if let Some((_, dependents)) = self.forward_index.remove(entity_key) {
                for dependent in dependents {
                    self.reverse_index.remove(&dependent);
                    to_delete.push(dependent);
                }
            }
        }

        to_delete.sort();
        to_delete.dedup();

        for key in &to_delete {
            self.l1.remove(key);
        }

        if let Some(l2) = &self.l2 {
            if let Err(err) = l2.del_many(&to_delete).await {
                tracing::warn!(error = %err, "L2 del_many failed during invalidation");
            }
        }
    }

    fn insert_l1(&self, key: &str, value: Vec<u8>) {
        if self.l1.len() >= self.capacity && !self.l1.contains_key(key) {
            self.evict_one();
        }
        self.l1.insert(key.to_string(), CacheEntry::new(value, self.default_ttl));
    }

    /// Capacity is a soft cap: evict the first expired entry found, or an
    /// arbitrary entry if none are expired yet. Good enough for an L1
    /// that's backed by an authoritative L2.
    fn evict_one(&self) {
        let expired_key = self.l1.iter().find(|e| e.is_expired()).map(|e| e.key().clone());
        let victim = expired_key.or_else(|| self.l1.iter().next().map(|e| e.key().clone()));
        if let Some(key) = victim {
            self.l1.remove(&key);
        }
    }
}

#[async_trait::async_trait]
impl SequenceStore for Cache {
    async fn get_sequence(
        &self,
        world_instance_id: &str,
    ) -> Result<Option<u64>, worldgate_security::SecurityError> {
        let bytes = self.get(world_instance_id).await;
        Ok(bytes.and_then(|b| std::str::from_utf8(&b).ok().and_then(|s| s.parse::<u64>().ok())))
    }

    async fn set_sequence(
        &self,
        world_instance_id: &str,
        value: u64,
        ttl: Duration,
    ) -> Result<(), worldgate_security::SecurityError> {
        self.set(world_instance_id, value.to_string().into_bytes(), Some(ttl)).await;
        Ok(())
    }
}
