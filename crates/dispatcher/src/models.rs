use serde_json::Value;
use std::collections::HashMap;
use worldgate_core::diff::EntityDiff;
use worldgate_core::Entity;
use worldgate_durable::RankResult as DurableRankResult;
use worldgate_streams::StreamEntry;

#[derive(Debug, Clone)]
pub struct LoadCmd {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub version: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct SaveCmd {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub attributes: HashMap<String, Value>,
    pub is_create: bool,
    pub is_delete: bool,
}

#[derive(Debug, Clone)]
pub struct SendCmd {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub message: Value,
}

#[derive(Debug, Clone)]
pub struct RecvCmd {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub timestamp: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct SearchCmd {
    pub entity_type: String,
    pub world_id: Option<u64>,
    pub name_pattern: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RankCmd {
    pub entity_type: String,
    pub world_id: u64,
    pub entity_id: String,
    pub rank_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct TopCmd {
    pub entity_type: String,
    pub world_id: u64,
    pub rank_key: String,
    pub sort_order: SortOrder,
    pub limit: Option<usize>,
}

/// One inbound batch, tagged by command type, plus the `environment` that
/// applies to every command in it.
#[derive(Debug, Clone, Default)]
pub struct CommandBatch {
    pub environment: String,
    pub load: Vec<LoadCmd>,
    pub save: Vec<SaveCmd>,
    pub send: Vec<SendCmd>,
    pub recv: Vec<RecvCmd>,
    pub search: Vec<SearchCmd>,
    pub rank: Vec<RankCmd>,
    pub top: Vec<TopCmd>,
}

#[derive(Debug, Clone)]
pub enum LoadResult {
    Missing,
    Full(Entity),
    Diff(EntityDiff, String),
}

#[derive(Debug, Clone)]
pub struct SaveResult {
    pub success: bool,
    pub version: Option<u64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecvResult {
    pub success: bool,
    pub world_instance_id: Option<String>,
    pub data: Vec<StreamEntry>,
}

/// Index-aligned per-type result arrays, one slot per command in the
/// matching `CommandBatch` array.
#[derive(Debug, Clone, Default)]
pub struct DispatchResponse {
    pub load: Vec<LoadResult>,
    pub save: Vec<SaveResult>,
    pub send: Vec<bool>,
    pub recv: Vec<RecvResult>,
    pub search: Vec<Vec<Entity>>,
    pub rank: Vec<Option<DurableRankResult>>,
    pub top: Vec<Vec<(Entity, f64)>>,
}
