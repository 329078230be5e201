//! Pure namespaced-key construction. No I/O, no allocation beyond the
//! returned `String`. Every other crate that talks to a store builds its
//! keys through here so the namespacing only has one definition.

/// `<env>:entity:<type>:<world>:<id>`, optionally suffixed `:v<version>`.
pub fn cache_entity_key(environment: &str, entity_type: &str, world_id: u64, entity_id: &str) -> String {
    format!("{environment}:entity:{entity_type}:{world_id}:{entity_id}")
}

pub fn cache_entity_version_key(
    environment: &str,
    entity_type: &str,
    world_id: u64,
    entity_id: &str,
    version: u64,
) -> String {
    format!("{}:v{version}", cache_entity_key(environment, entity_type, world_id, entity_id))
}

/// `sequence:<worldInstanceId>` — admission-control sequence cache key.
pub fn sequence_key(world_instance_id: &str) -> String {
    format!("sequence:{world_instance_id}")
}

/// `search:<env>:<type>:<world>:<pattern>` — searchByName cache key.
pub fn search_cache_key(environment: &str, entity_type: &str, world_id: u64, pattern: &str) -> String {
    format!("search:{environment}:{entity_type}:{world_id}:{pattern}")
}

/// `rankings:<env>:<type>:<world>:<rankKey>:<sortOrder>:<limit>` — top-N cache key.
pub fn rankings_cache_key(
    environment: &str,
    entity_type: &str,
    world_id: u64,
    rank_key: &str,
    sort_order: &str,
    limit: usize,
) -> String {
    format!("rankings:{environment}:{entity_type}:{world_id}:{rank_key}:{sort_order}:{limit}")
}

/// `rank:<env>:<type>:<world>:<id>:<rankKey>` — single-entity rank cache key.
pub fn rank_cache_key(environment: &str, entity_type: &str, world_id: u64, entity_id: &str, rank_key: &str) -> String {
    format!("rank:{environment}:{entity_type}:{world_id}:{entity_id}:{rank_key}")
}

/// `<env>:ephemeral:<type>:<world>:<id>`, optionally suffixed `:v<version>`.
pub fn ephemeral_key(environment: &str, entity_type: &str, world_id: u64, entity_id: &str) -> String {
    format!("{environment}:ephemeral:{entity_type}:{world_id}:{entity_id}")
}

pub fn ephemeral_version_snapshot_key(
    environment: &str,
    entity_type: &str,
    world_id: u64,
    entity_id: &str,
    version: u64,
) -> String {
    format!("{}:v{version}", ephemeral_key(environment, entity_type, world_id, entity_id))
}

/// Sibling counter key holding the live `version` for an ephemeral document.
pub fn ephemeral_counter_key(environment: &str, entity_type: &str, world_id: u64, entity_id: &str) -> String {
    format!("{}:version", ephemeral_key(environment, entity_type, world_id, entity_id))
}

/// The one global dirty-set key.
pub fn dirty_set_key() -> &'static str {
    "ephemeral:dirty_entities"
}

/// `<env>:<type>:<world>:<id>` — an individual member of the dirty set.
pub fn dirty_key(environment: &str, entity_type: &str, world_id: u64, entity_id: &str) -> String {
    format!("{environment}:{entity_type}:{world_id}:{entity_id}")
}

/// `stream:<env>:entity:<type>:<world>:<id>`.
pub fn stream_key(environment: &str, entity_type: &str, world_id: u64, entity_id: &str) -> String {
    format!("stream:{}", cache_entity_key(environment, entity_type, world_id, entity_id))
}

/// `stream_world_instance:<streamId>` — world-instance affinity key.
pub fn stream_affinity_key(stream_id: &str) -> String {
    format!("stream_world_instance:{stream_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_key_shape() {
        assert_eq!(
            cache_entity_key("production", "Player", 1, "p1"),
            "production:entity:Player:1:p1"
        );
    }

    #[test]
    fn version_key_appends_suffix() {
        assert_eq!(
            cache_entity_version_key("production", "Player", 1, "p1", 3),
            "production:entity:Player:1:p1:v3"
        );
    }

    #[test]
    fn dirty_key_has_no_ephemeral_prefix() {
        assert_eq!(dirty_key("staging", "Player", 2, "p9"), "staging:Player:2:p9");
    }

    #[test]
    fn stream_key_wraps_entity_key() {
        assert_eq!(
            stream_key("staging", "Player", 2, "p9"),
            "stream:staging:entity:Player:2:p9"
        );
    }
}
