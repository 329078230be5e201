use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sentinel meaning "remove this key (at its nested path)". Never appears
/// in stored state; only ever seen as a value supplied by a client, or
/// echoed back in a diff for a key that was deleted.
pub const NULL_MARKER: &str = "$$__NULL__$$";

/// `(environment, entityType, entityId)`. `worldId` partitions queries but
/// is intentionally excluded from identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
}

impl EntityId {
    pub fn new(
        environment: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            environment: environment.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }

    /// The unit of cache dependency: `"<entityType>:<entityId>"`.
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.entity_type, self.entity_id)
    }
}

/// Which tier an entity type is classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Lives only in the ephemeral store; never reaches Durable, never
    /// appears in the dirty set.
    EphemeralOnly,
    /// Lives in both tiers: ephemeral for hot access, durable for
    /// long-term storage via the background worker.
    Persistent,
}

/// A scalar, nested-object, or deletion-sentinel attribute value as it
/// crosses the wire or lives inside a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null(serde_json::Value),
    Scalar(serde_json::Value),
}

impl AttributeValue {
    /// True if this value is (or wraps) the `NULL_MARKER` sentinel.
    pub fn is_null_marker(value: &serde_json::Value) -> bool {
        matches!(value, serde_json::Value::String(s) if s == NULL_MARKER)
    }
}

/// `rankScores[scoreType][partitionKey] = value`.
pub type RankScores = HashMap<String, HashMap<String, f64>>;

/// The logical entity, as returned from a load or held internally between
/// tiers. `attributes` never contains `NULL_MARKER` once materialized from
/// storage; it may appear transiently in a write request or in a diff
/// result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub environment: String,
    pub entity_type: String,
    pub entity_id: String,
    pub world_id: u64,
    pub attributes: HashMap<String, serde_json::Value>,
    pub rank_scores: RankScores,
    pub version: u64,
    pub is_deleted: bool,
    pub last_write: chrono::DateTime<chrono::Utc>,
    /// Set by the ephemeral load path to stabilize stream ownership
    /// alongside an entity read; empty string when not applicable.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub world_instance_id: String,
}

impl Entity {
    pub fn id(&self) -> EntityId {
        EntityId::new(
            self.environment.clone(),
            self.entity_type.clone(),
            self.entity_id.clone(),
        )
    }
}
