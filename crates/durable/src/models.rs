use serde_json::Value;
use std::collections::HashMap;
use worldgate_core::merge::RankScoreUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
}

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub attributes: HashMap<String, Value>,
    pub rank_scores: RankScoreUpdate,
    pub is_create: bool,
    pub is_delete: bool,
}

/// The merged result of every `SaveRequest` in one inbound batch that
/// targets the same `(environment, entityType, entityId)` — later
/// requests override earlier ones for scalar attributes, rank-score maps
/// deep-merge, and create/delete flags OR together.
#[derive(Debug, Clone)]
pub struct MergedUpsert {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub is_create: bool,
    pub is_delete: bool,
    pub attributes: HashMap<String, Value>,
    pub rank_scores: RankScoreUpdate,
}

#[derive(Debug, Clone)]
pub struct UpsertOutcome {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub success: bool,
    pub version: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RankResult {
    pub score: f64,
    pub rank: u64,
    pub total_entities: u64,
}
