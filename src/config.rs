//! Loads `GatewayConfig` from the environment, falling back to
//! `GatewayConfig::default()`'s localhost values field by field. See spec
//! section 6's "Environment enumeration" for the full key list.

use std::collections::HashSet;
use std::time::Duration;
use worldgate_core::GatewayConfig;

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_seconds(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

fn env_set(key: &str, default: HashSet<String>) -> HashSet<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.split(',').map(|s| s.trim().to_string()).collect(),
        _ => default,
    }
}

fn env_list(key: &str, default: Vec<String>) -> Vec<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => v.split(',').map(|s| s.trim().to_string()).collect(),
        _ => default,
    }
}

/// Reads `WORLDGATE_*` environment variables over top of
/// `GatewayConfig::default()`. Every key is optional; an unset key keeps
/// the default.
pub fn load_config() -> GatewayConfig {
    let defaults = GatewayConfig::default();

    GatewayConfig {
        database_url: env_string("WORLDGATE_DATABASE_URL", &defaults.database_url),
        ephemeral_store_url: env_string("WORLDGATE_EPHEMERAL_STORE_URL", &defaults.ephemeral_store_url),
        stream_store_url: env_string("WORLDGATE_STREAM_STORE_URL", &defaults.stream_store_url),
        cache_store_url: env_string("WORLDGATE_CACHE_STORE_URL", &defaults.cache_store_url),
        sender_public_key_b64: env_string("WORLDGATE_SENDER_PUBLIC_KEY", &defaults.sender_public_key_b64),
        recipient_private_key_b64: env_string("WORLDGATE_RECIPIENT_PRIVATE_KEY", &defaults.recipient_private_key_b64),
        ephemeral_only_types: env_set("WORLDGATE_EPHEMERAL_ONLY_TYPES", defaults.ephemeral_only_types),
        cache_default_ttl: env_seconds("WORLDGATE_CACHE_DEFAULT_TTL_SECS", defaults.cache_default_ttl),
        cache_l1_capacity: env_usize("WORLDGATE_CACHE_L1_CAPACITY", defaults.cache_l1_capacity),
        worker_interval: env_seconds("WORLDGATE_WORKER_INTERVAL_SECS", defaults.worker_interval),
        worker_batch_size: env_usize("WORLDGATE_WORKER_BATCH_SIZE", defaults.worker_batch_size),
        worker_lock_ttl: env_seconds("WORLDGATE_WORKER_LOCK_TTL_SECS", defaults.worker_lock_ttl),
        stream_affinity_ttl: env_seconds("WORLDGATE_STREAM_AFFINITY_TTL_SECS", defaults.stream_affinity_ttl),
        stream_ttl: env_seconds("WORLDGATE_STREAM_TTL_SECS", defaults.stream_ttl),
        sequence_ttl: env_seconds("WORLDGATE_SEQUENCE_TTL_SECS", defaults.sequence_ttl),
        max_query_limit: env_usize("WORLDGATE_MAX_QUERY_LIMIT", defaults.max_query_limit),
        allowed_environments: env_list("WORLDGATE_ALLOWED_ENVIRONMENTS", defaults.allowed_environments),
    }
}
