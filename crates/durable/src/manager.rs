use crate::backend::DurableBackend;
use crate::models::{LoadRequest, MergedUpsert, RankResult, SaveRequest, SortOrder, UpsertOutcome};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use worldgate_core::{keygen, limits, ChangeEventSink, Entity, NULL_MARKER};
use worldgate_cache::Cache;

const SEARCH_CACHE_TTL: Duration = Duration::from_secs(5 * 60);
const RANKINGS_CACHE_TTL: Duration = Duration::from_secs(15 * 60);
const RANK_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

pub struct DurableManager {
    backend: Arc<dyn DurableBackend>,
    cache: Arc<Cache>,
    events: Option<Arc<dyn ChangeEventSink>>,
}

impl DurableManager {
    pub fn new(backend: Arc<dyn DurableBackend>, cache: Arc<Cache>, events: Option<Arc<dyn ChangeEventSink>>) -> Self {
        Self { backend, cache, events }
    }

    /// Groups by `(entityType, worldId)`, consults the cache first, fetches
    /// misses with one query per group, and restores the caller's original
    /// ordering.
    pub async fn batch_load(&self, requests: Vec<LoadRequest>) -> Vec<Option<Entity>> {
        let mut groups: HashMap<(String, String, u64), Vec<usize>> = HashMap::new();
        for (i, req) in requests.iter().enumerate() {
            groups
                .entry((req.environment.clone(), req.entity_type.clone(), req.world_id))
                .or_default()
                .push(i);
        }

        let mut out: Vec<Option<Entity>> = vec![None; requests.len()];

        for ((environment, entity_type, world_id), indices) in groups {
            let cache_keys: Vec<String> = indices
                .iter()
                .map(|&i| keygen::cache_entity_key(&environment, &entity_type, world_id, &requests[i].entity_id))
                .collect();

            let cached = self.cache.mget(&cache_keys).await;

            let mut missing_indices = Vec::new();
            let mut missing_ids = Vec::new();
            for (pos, &i) in indices.iter().enumerate() {
                match &cached[pos] {
                    Some(bytes) => {
                        if let Ok(entity) = serde_json::from_slice::<Entity>(bytes) {
                            out[i] = Some(entity);
                        }
                    }
                    None => {
                        missing_indices.push(i);
                        missing_ids.push(requests[i].entity_id.clone());
                    }
                }
            }

            if missing_ids.is_empty() {
                continue;
            }

            let fetched = self
                .backend
                .fetch_existing(&environment, &entity_type, world_id, &missing_ids)
                .await
                .unwrap_or_default();

            let by_id: HashMap<&str, &Entity> = fetched.iter().map(|e| (e.entity_id.as_str(), e)).collect();

            let mut to_cache = Vec::new();
            for &i in &missing_indices {
                if let Some(entity) = by_id.get(requests[i].entity_id.as_str()) {
                    let cache_key = keygen::cache_entity_key(&environment, &entity_type, world_id, &requests[i].entity_id);
                    if let Ok(bytes) = serde_json::to_vec(entity) {
                        to_cache.push((cache_key.clone(), bytes));
                        self.cache.track_dependency(&cache_key, &format!("{entity_type}:{}", requests[i].entity_id));
                    }
                    out[i] = Some((*entity).clone());
                }
            }
            if !to_cache.is_empty() {
                self.cache.mset(to_cache, None).await;
            }
        }

        out
    }

    /// Merges same-identity requests within this batch, then chunks the
    /// merged set to ≤150 entities per transactional upsert.
    pub async fn batch_partial_save(&self, requests: Vec<SaveRequest>) -> Vec<UpsertOutcome> {
        let mut order: Vec<(String, String, String)> = Vec::new();
        let mut merged: HashMap<(String, String, String), MergedUpsert> = HashMap::new();

        for req in requests {
            let identity = (req.environment.clone(), req.entity_type.clone(), req.entity_id.clone());
            if !merged.contains_key(&identity) {
                order.push(identity.clone());
            }
            let entry = merged.entry(identity).or_insert_with(|| MergedUpsert {
                environment: req.environment.clone(),
                entity_type: req.entity_type.clone(),
                entity_id: req.entity_id.clone(),
                world_id: req.world_id,
                is_create: false,
                is_delete: false,
                attributes: HashMap::new(),
                rank_scores: HashMap::new(),
            });

            entry.is_create |= req.is_create;
            entry.is_delete |= req.is_delete;
            for (k, v) in req.attributes {
                entry.attributes.insert(k, v);
            }
            for (score_type, update) in req.rank_scores {
                entry.rank_scores.insert(score_type, update);
            }
        }

        let merged_list: Vec<MergedUpsert> = order.into_iter().filter_map(|id| merged.remove(&id)).collect();

        let mut outcomes = Vec::with_capacity(merged_list.len());
        for chunk in merged_list.chunks(limits::DURABLE_UPSERT_CHUNK) {
            let results = match self.backend.upsert_chunk(chunk).await {
                Ok(results) => results,
                Err(e) => {
                    outcomes.extend(chunk.iter().map(|item| UpsertOutcome {
                        entity_type: item.entity_type.clone(),
                        entity_id: item.entity_id.clone(),
                        world_id: item.world_id,
                        success: false,
                        version: 0,
                        error: Some(e.to_string()),
                    }));
                    continue;
                }
            };

            let entity_keys: Vec<String> = chunk.iter().map(|item| format!("{}:{}", item.entity_type, item.entity_id)).collect();
            self.cache.invalidate_entities(&entity_keys).await;

            if let Some(sink) = &self.events {
                for item in chunk {
                    let stream_key = keygen::stream_key(&item.environment, &item.entity_type, item.world_id, &item.entity_id);
                    let payload: HashMap<&String, &serde_json::Value> =
                        item.attributes.iter().filter(|(_, v)| !is_null_marker(v)).collect();
                    sink.enqueue_change(&stream_key, serde_json::json!({ "attributes": payload, "deleted": item.is_delete })).await;
                }
            }

            outcomes.extend(results);
        }

        outcomes
    }

    pub async fn search_by_name(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: Option<u64>,
        pattern: &str,
        limit: usize,
    ) -> Vec<Entity> {
        let limit = limit.min(limits::MAX_QUERY_LIMIT);
        let cache_key = keygen::search_cache_key(environment, entity_type, world_id.unwrap_or(0), pattern);

        if let Some(bytes) = self.cache.get(&cache_key).await {
            if let Ok(entities) = serde_json::from_slice(&bytes) {
                return entities;
            }
        }

        let results = self
            .backend
            .search_by_name(environment, entity_type, world_id, pattern, limit)
            .await
            .unwrap_or_default();

        if let Ok(bytes) = serde_json::to_vec(&results) {
            self.cache.set(&cache_key, bytes, Some(SEARCH_CACHE_TTL)).await;
        }

        results
    }

    pub async fn get_ranked_entities(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        score_type: &str,
        partition_key: &str,
        sort_order: SortOrder,
        limit: usize,
    ) -> Vec<(Entity, f64)> {
        let limit = limit.min(limits::MAX_QUERY_LIMIT);
        let order_tag = if sort_order == SortOrder::Desc { "DESC" } else { "ASC" };
        let cache_key = keygen::rankings_cache_key(
            environment,
            entity_type,
            world_id,
            &format!("{score_type}:{partition_key}"),
            order_tag,
            limit,
        );

        if let Some(bytes) = self.cache.get(&cache_key).await {
            if let Ok(results) = serde_json::from_slice::<Vec<(Entity, f64)>>(&bytes) {
                return results;
            }
        }

        let results = self
            .backend
            .get_ranked_entities(environment, entity_type, world_id, score_type, partition_key, sort_order, limit)
            .await
            .unwrap_or_default();

        if let Ok(bytes) = serde_json::to_vec(&results) {
            self.cache.set(&cache_key, bytes, Some(RANKINGS_CACHE_TTL)).await;
        }

        results
    }

    pub async fn calculate_entity_rank(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        entity_id: &str,
        score_type: &str,
        partition_key: &str,
    ) -> Option<RankResult> {
        let cache_key = keygen::rank_cache_key(environment, entity_type, world_id, entity_id, &format!("{score_type}:{partition_key}"));

        if let Some(bytes) = self.cache.get(&cache_key).await {
            if let Ok(result) = serde_json::from_slice::<RankResult>(&bytes) {
                return Some(result);
            }
        }

        let score = self
            .backend
            .get_entity_score(environment, entity_type, world_id, entity_id, score_type, partition_key)
            .await
            .ok()
            .flatten()?;

        let total = self.backend.count_ranked(environment, entity_type, world_id, score_type, partition_key).await.unwrap_or(0);
        let rank = self.backend.rank_of_score(environment, entity_type, world_id, score_type, partition_key, score).await.unwrap_or(1);

        let result = RankResult { score, rank, total_entities: total };
        if let Ok(bytes) = serde_json::to_vec(&result) {
            self.cache.set(&cache_key, bytes, Some(RANK_CACHE_TTL)).await;
        }

        Some(result)
    }
}

fn is_null_marker(value: &serde_json::Value) -> bool {
    matches!(value, serde_json::Value::String(s) if s == NULL_MARKER)
}
