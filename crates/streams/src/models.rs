use serde_json::Value;

#[derive(Debug, Clone)]
pub struct AddMessage {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub message: Value,
}

#[derive(Debug, Clone)]
pub struct PullRequest {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub timestamp: Option<String>,
    pub count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamEntry {
    pub data: Value,
    pub timestamp: i64,
}

#[derive(Debug, Clone)]
pub struct PullOutcome {
    pub success: bool,
    pub world_instance_id: Option<String>,
    pub data: Vec<StreamEntry>,
}
