//! Pure, shared attribute/rank-score merge semantics used by both the
//! Ephemeral partial-save path and the Durable in-request merge. Kept
//! here so both tiers apply `NULL_MARKER` removal and rank-score
//! deep-merge identically.

use crate::entity::{RankScores, NULL_MARKER};
use serde_json::Value;
use std::collections::HashMap;

/// One partition's update within a score type.
#[derive(Debug, Clone, PartialEq)]
pub enum RankEntryUpdate {
    Set(f64),
    Remove,
}

/// One score type's update: either merge/replace individual partitions, or
/// remove the score type entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum RankTypeUpdate {
    RemoveType,
    Entries(HashMap<String, RankEntryUpdate>),
}

pub type RankScoreUpdate = HashMap<String, RankTypeUpdate>;

/// Applies attribute updates in place: a `NULL_MARKER` value removes the
/// key, anything else overwrites it.
pub fn apply_attributes(attributes: &mut HashMap<String, Value>, updates: &HashMap<String, Value>) {
    for (key, value) in updates {
        if is_null_marker(value) {
            attributes.remove(key);
        } else {
            attributes.insert(key.clone(), value.clone());
        }
    }
}

/// Applies rank-score updates in place: whole-type removal, per-partition
/// set, or per-partition removal.
pub fn apply_rank_scores(rank_scores: &mut RankScores, updates: &RankScoreUpdate) {
    for (score_type, update) in updates {
        match update {
            RankTypeUpdate::RemoveType => {
                rank_scores.remove(score_type);
            }
            RankTypeUpdate::Entries(entries) => {
                let partitions = rank_scores.entry(score_type.clone()).or_default();
                for (partition_key, entry) in entries {
                    match entry {
                        RankEntryUpdate::Set(v) => {
                            partitions.insert(partition_key.clone(), *v);
                        }
                        RankEntryUpdate::Remove => {
                            partitions.remove(partition_key);
                        }
                    }
                }
            }
        }
    }
}

fn is_null_marker(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == NULL_MARKER)
}
