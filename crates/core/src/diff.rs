//! Pure diffing between two entity snapshots. Used by the ephemeral load
//! path to serve a versioned read as "only what changed since version N"
//! instead of the full document.

use crate::entity::{Entity, RankScores, NULL_MARKER};
use serde_json::Value;
use std::collections::HashMap;

/// The subset of an entity that changed between an older snapshot and the
/// current document. Deleted keys carry `NULL_MARKER` rather than being
/// omitted.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDiff {
    pub attributes: HashMap<String, Value>,
    pub rank_scores: RankScores,
}

/// Diff `old` (the versioned snapshot) against `current` (the newest
/// document). Keys present in `old` but absent in `current` are reported
/// with `NULL_MARKER`. Keys whose value is unchanged are omitted.
pub fn diff_entities(old: &Entity, current: &Entity) -> EntityDiff {
    EntityDiff {
        attributes: diff_map(&old.attributes, &current.attributes),
        rank_scores: diff_rank_scores(&old.rank_scores, &current.rank_scores),
    }
}

fn diff_map(old: &HashMap<String, Value>, current: &HashMap<String, Value>) -> HashMap<String, Value> {
    let mut out = HashMap::new();
    for (k, v) in current {
        if old.get(k) != Some(v) {
            out.insert(k.clone(), v.clone());
        }
    }
    for k in old.keys() {
        if !current.contains_key(k) {
            out.insert(k.clone(), Value::String(NULL_MARKER.to_string()));
        }
    }
    out
}

fn diff_rank_scores(old: &RankScores, current: &RankScores) -> RankScores {
    let mut out = RankScores::new();
    for (score_type, partitions) in current {
        match old.get(score_type) {
            Some(old_partitions) => {
                let inner = diff_numeric_map(old_partitions, partitions);
                if !inner.is_empty() {
                    out.insert(score_type.clone(), inner);
                }
            }
            None => {
                out.insert(score_type.clone(), partitions.clone());
            }
        }
    }
    for score_type in old.keys() {
        if !current.contains_key(score_type) {
            // Whole score-type removed: represent with a single sentinel
            // partition so the caller can see it's gone. Callers that
            // serialize this to wire JSON special-case an empty-string
            // partition key as "delete whole type".
            out.insert(score_type.clone(), HashMap::new());
        }
    }
    out
}

fn diff_numeric_map(old: &HashMap<String, f64>, current: &HashMap<String, f64>) -> HashMap<String, f64> {
    let mut out = HashMap::new();
    for (k, v) in current {
        if old.get(k) != Some(v) {
            out.insert(k.clone(), *v);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;

    fn entity(attrs: &[(&str, Value)], ranks: RankScores) -> Entity {
        Entity {
            environment: "production".into(),
            entity_type: "Player".into(),
            entity_id: "p1".into(),
            world_id: 1,
            attributes: attrs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            rank_scores: ranks,
            version: 1,
            is_deleted: false,
            last_write: Utc::now(),
            world_instance_id: String::new(),
        }
    }

    #[test]
    fn s1_create_then_load_diff() {
        let old = entity(&[("name", Value::from("Hero")), ("hp", Value::from(100)), ("tag", Value::from("x"))], HashMap::new());
        let current = entity(&[("name", Value::from("Hero")), ("hp", Value::from(80))], HashMap::new());

        let diff = diff_entities(&old, &current);
        assert_eq!(diff.attributes.get("hp"), Some(&Value::from(80)));
        assert_eq!(diff.attributes.get("tag"), Some(&Value::String(NULL_MARKER.to_string())));
        assert!(!diff.attributes.contains_key("name"));
    }

    #[test]
    fn unchanged_rank_scores_are_omitted() {
        let mut ranks = HashMap::new();
        ranks.insert("kills".to_string(), HashMap::from([("1".to_string(), 100.0)]));
        let old = entity(&[], ranks.clone());
        let current = entity(&[], ranks);
        assert!(diff_entities(&old, &current).rank_scores.is_empty());
    }
}
