use serde_json::Value;
use std::collections::HashMap;
use worldgate_core::merge::{RankEntryUpdate, RankScoreUpdate, RankTypeUpdate};

/// The only rank partition the wire protocol's flat `attributes` map can
/// address — `rankScores.<scoreType>."1"` in every scenario the spec
/// exercises. Partitioned leaderboards with other partition keys are set
/// directly against `Durable`/`Ephemeral`, not through this shorthand.
const DEFAULT_PARTITION_KEY: &str = "1";

/// Splits `attributes` in place: keys matching `rank_<name>`,
/// `<name>_score`, or `<name>_rank` are removed and folded into a
/// `RankScoreUpdate` keyed by `<name>`, `NULL_MARKER` values removing that
/// partition. Everything else stays a plain attribute.
pub fn extract_rank_scores(attributes: &mut HashMap<String, Value>) -> RankScoreUpdate {
    let rank_keys: Vec<String> = attributes
        .keys()
        .filter(|k| score_type_of(k).is_some())
        .cloned()
        .collect();

    let mut rank_scores: RankScoreUpdate = HashMap::new();
    for key in rank_keys {
        let Some(value) = attributes.remove(&key) else { continue };
        let score_type = score_type_of(&key).unwrap().to_string();

        let entry_update = match &value {
            Value::String(s) if s == worldgate_core::NULL_MARKER => RankEntryUpdate::Remove,
            Value::Number(n) => match n.as_f64() {
                Some(f) => RankEntryUpdate::Set(f),
                None => continue,
            },
            _ => continue,
        };

        match rank_scores.entry(score_type).or_insert_with(|| RankTypeUpdate::Entries(HashMap::new())) {
            RankTypeUpdate::Entries(entries) => {
                entries.insert(DEFAULT_PARTITION_KEY.to_string(), entry_update);
            }
            RankTypeUpdate::RemoveType => {}
        }
    }

    rank_scores
}

fn score_type_of(key: &str) -> Option<&str> {
    if let Some(rest) = key.strip_prefix("rank_") {
        Some(rest)
    } else if let Some(rest) = key.strip_suffix("_score") {
        Some(rest)
    } else if let Some(rest) = key.strip_suffix("_rank") {
        Some(rest)
    } else {
        None
    }
}
