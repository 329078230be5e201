use std::collections::HashSet;
use std::time::Duration;

/// Everything the core consumes from the environment. Loading this from
/// actual env vars / files is an external collaborator's job; this struct
/// only describes the shape.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub database_url: String,
    pub ephemeral_store_url: String,
    pub stream_store_url: String,
    pub cache_store_url: String,

    /// Base64 X25519 public key identifying the sender this gateway trusts.
    pub sender_public_key_b64: String,
    /// Base64 X25519 private key this gateway decrypts payloads with.
    pub recipient_private_key_b64: String,

    /// Entity types that never reach the Durable store.
    pub ephemeral_only_types: HashSet<String>,

    pub cache_default_ttl: Duration,
    pub cache_l1_capacity: usize,

    pub worker_interval: Duration,
    pub worker_batch_size: usize,
    pub worker_lock_ttl: Duration,

    pub stream_affinity_ttl: Duration,
    /// Sliding TTL refreshed on every append to a given stream.
    pub stream_ttl: Duration,
    pub sequence_ttl: Duration,

    pub max_query_limit: usize,
    pub allowed_environments: Vec<String>,
}

impl GatewayConfig {
    pub fn is_ephemeral_only(&self, entity_type: &str) -> bool {
        self.ephemeral_only_types.contains(entity_type)
    }
}

/// Sensible localhost defaults, useful as a starting point for tests and
/// for a config loader to override piecemeal.
impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/worldgate".into(),
            ephemeral_store_url: "redis://localhost:6379/0".into(),
            stream_store_url: "redis://localhost:6379/1".into(),
            cache_store_url: "redis://localhost:6379/2".into(),
            sender_public_key_b64: String::new(),
            recipient_private_key_b64: String::new(),
            ephemeral_only_types: HashSet::from(["OnlineMapData".to_string()]),
            cache_default_ttl: Duration::from_secs(300),
            cache_l1_capacity: 10_000,
            worker_interval: Duration::from_secs(5),
            worker_batch_size: crate::limits::DEFAULT_WORKER_BATCH_SIZE,
            worker_lock_ttl: Duration::from_secs(10),
            stream_affinity_ttl: Duration::from_secs(60),
            stream_ttl: Duration::from_secs(24 * 3600),
            sequence_ttl: Duration::from_secs(5),
            max_query_limit: crate::limits::MAX_QUERY_LIMIT,
            allowed_environments: vec!["staging".to_string(), "production".to_string()],
        }
    }
}
