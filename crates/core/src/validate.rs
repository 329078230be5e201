//! Input-shape guards. Pure, synchronous, and the only place these regexes
//! (expressed as manual char scans — the shapes involved are simple enough
//! that pulling in `regex` for them would be pure overhead) are defined.

use crate::error::ValidationError;

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_id_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn matches_shape(s: &str, max_len: usize, allowed: impl Fn(char) -> bool) -> bool {
    !s.is_empty() && s.chars().count() <= max_len && s.chars().all(allowed)
}

/// `[A-Za-z0-9_]{1,64}`
pub fn validate_entity_type(entity_type: &str) -> Result<(), ValidationError> {
    if matches_shape(entity_type, 64, is_word_char) {
        Ok(())
    } else {
        Err(ValidationError::BadEntityType(entity_type.to_string()))
    }
}

/// `[A-Za-z0-9_-]{1,128}`
pub fn validate_entity_id(entity_id: &str) -> Result<(), ValidationError> {
    if matches_shape(entity_id, 128, is_id_char) {
        Ok(())
    } else {
        Err(ValidationError::BadEntityId(entity_id.to_string()))
    }
}

/// `[A-Za-z0-9_]{1,64}`
pub fn validate_attribute_key(key: &str) -> Result<(), ValidationError> {
    if matches_shape(key, 64, is_word_char) {
        Ok(())
    } else {
        Err(ValidationError::BadAttributeKey(key.to_string()))
    }
}

/// `[A-Za-z0-9_-]{1,128}`
pub fn validate_world_instance_id(id: &str) -> Result<(), ValidationError> {
    if matches_shape(id, 128, is_id_char) {
        Ok(())
    } else {
        Err(ValidationError::BadWorldInstanceId(id.to_string()))
    }
}

/// `scoreType:partitionKey`, each half a valid attribute-key shape.
pub fn validate_rank_key(rank_key: &str) -> Result<(String, String), ValidationError> {
    let Some((score_type, partition_key)) = rank_key.split_once(':') else {
        return Err(ValidationError::BadRankKey(rank_key.to_string()));
    };
    validate_attribute_key(score_type).map_err(|_| ValidationError::BadRankKey(rank_key.to_string()))?;
    validate_attribute_key(partition_key).map_err(|_| ValidationError::BadRankKey(rank_key.to_string()))?;
    Ok((score_type.to_string(), partition_key.to_string()))
}

/// A non-zero limit no greater than `max` (search/top queries cap at 1000).
pub fn validate_limit(limit: usize, max: usize) -> Result<usize, ValidationError> {
    if limit == 0 {
        Ok(max)
    } else if limit > max {
        Err(ValidationError::LimitExceeded(limit, max))
    } else {
        Ok(limit)
    }
}

/// `environment` must be one of the configured closed set.
pub fn validate_environment(environment: &str, allowed: &[String]) -> Result<(), ValidationError> {
    if allowed.iter().any(|e| e == environment) {
        Ok(())
    } else {
        Err(ValidationError::UnknownEnvironment(environment.to_string()))
    }
}
