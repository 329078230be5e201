//! Wire-shape request types, deserialized directly off the request body.
//! Field names match spec section 6 camelCase exactly; conversion into
//! the dispatcher's internal `CommandBatch` (with validation) happens in
//! `convert`.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayRequest {
    pub auth: String,
    pub encrypted: String,
    pub nonce: String,
    #[serde(rename = "worldInstanceId")]
    pub world_instance_id: String,
    /// Not part of spec section 6's documented payload shape, but required
    /// for entity identity everywhere else in the data model; carried at
    /// the request level and applied to every command in the batch.
    #[serde(default)]
    pub environment: String,
    #[serde(default)]
    pub commands: Commands,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Commands {
    #[serde(default)]
    pub load: Vec<LoadRequest>,
    #[serde(default)]
    pub save: Vec<SaveRequest>,
    #[serde(default)]
    pub send: Vec<SendRequest>,
    #[serde(default)]
    pub recv: Vec<RecvRequest>,
    #[serde(default)]
    pub search: Vec<SearchRequest>,
    #[serde(default)]
    pub rank: Vec<RankRequest>,
    #[serde(default)]
    pub top: Vec<TopRequest>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    #[serde(default)]
    pub version: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub is_create: bool,
    #[serde(default)]
    pub is_delete: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub message: Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecvRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub entity_type: String,
    #[serde(default)]
    pub world_id: Option<u64>,
    pub name_pattern: String,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankRequest {
    pub entity_type: String,
    pub world_id: u64,
    pub entity_id: String,
    pub rank_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopRequest {
    pub entity_type: String,
    pub world_id: u64,
    pub rank_key: String,
    #[serde(default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}
