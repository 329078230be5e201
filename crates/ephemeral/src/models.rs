use serde_json::Value;
use std::collections::HashMap;
use worldgate_core::merge::RankScoreUpdate;

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    /// `NULL_MARKER` values mean "remove this attribute".
    pub attributes: HashMap<String, Value>,
    pub rank_scores: RankScoreUpdate,
    pub is_create: bool,
    pub is_delete: bool,
}

#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Ok { version: u64, snapshot_warning: bool },
    Err { error: String },
}

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub version: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Missing,
    Full(worldgate_core::Entity),
    Diff(worldgate_core::diff::EntityDiff, String),
}

#[derive(Debug, Clone)]
pub struct PendingUpdate {
    pub dirty_key: String,
    pub entity: worldgate_core::Entity,
}

#[derive(Debug, Clone)]
pub struct PersistedItem {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub persisted_version: u64,
}

#[derive(Debug, Clone)]
pub struct FlushOutcome {
    pub dirty_key: String,
    pub flushed: bool,
}
