//! Wire-shape response types. Field names match spec section 6 camelCase;
//! construction from dispatcher/durable/streams output lives in `convert`.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, Serialize)]
pub struct GatewayResponse {
    pub load: Vec<Option<LoadResultWire>>,
    pub save: Vec<SaveResultWire>,
    pub send: Vec<SendResultWire>,
    pub recv: Vec<RecvResultWire>,
    pub search: Vec<Vec<EntityWire>>,
    pub rank: Vec<Option<RankResultWire>>,
    pub top: Vec<Vec<TopEntryWire>>,
}

/// A full entity snapshot, as returned by an unversioned load or inside a
/// search/top result array.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityWire {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub attributes: HashMap<String, Value>,
    pub rank_scores: HashMap<String, HashMap<String, f64>>,
    pub version: u64,
    pub is_deleted: bool,
    pub last_write: chrono::DateTime<chrono::Utc>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub world_instance_id: String,
}

/// A versioned load's result: only what changed since the requested
/// version, with deleted keys carrying `NULL_MARKER`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffWire {
    pub attributes: HashMap<String, Value>,
    pub rank_scores: HashMap<String, HashMap<String, f64>>,
    pub world_instance_id: String,
}

/// Load elements are the full entity, a diff entity, or null (the `null`
/// case is represented by wrapping this type in `Option` at the response
/// level, not a variant here).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum LoadResultWire {
    Full(EntityWire),
    Diff(DiffWire),
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveResultWire {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResultWire {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecvResultWire {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub world_instance_id: Option<String>,
    pub data: Vec<StreamEntryWire>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StreamEntryWire {
    pub data: Value,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankResultWire {
    pub score: f64,
    pub rank: u64,
    pub total_entities: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopEntryWire {
    pub entity: EntityWire,
    pub score: f64,
}
