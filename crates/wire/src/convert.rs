//! Request -> `CommandBatch` validation/conversion, and
//! `DispatchResponse` -> `GatewayResponse` shaping.

use crate::request::{
    Commands, LoadRequest, RankRequest, RecvRequest, SaveRequest, SearchRequest, SendRequest,
    TopRequest,
};
use crate::response::{
    DiffWire, EntityWire, GatewayResponse, LoadResultWire, RankResultWire, RecvResultWire,
    SaveResultWire, SendResultWire, StreamEntryWire, TopEntryWire,
};
use worldgate_core::error::ValidationError;
use worldgate_core::validate;
use worldgate_core::Entity;
use worldgate_dispatcher::{
    CommandBatch, DispatchResponse, LoadCmd, LoadResult, RankCmd, RecvCmd, SaveCmd, SearchCmd,
    SendCmd, SortOrder, TopCmd,
};

/// Validates every command in the request and builds the dispatcher's
/// internal batch. The whole request is rejected (nothing dispatched) if
/// any single command fails shape validation, per the batch-level
/// `VALIDATION_*` error class.
pub fn to_command_batch(
    environment: String,
    commands: Commands,
    max_query_limit: usize,
) -> Result<CommandBatch, ValidationError> {
    let Commands { load, save, send, recv, search, rank, top } = commands;

    Ok(CommandBatch {
        environment,
        load: load.into_iter().map(to_load_cmd).collect::<Result<_, _>>()?,
        save: save.into_iter().map(to_save_cmd).collect::<Result<_, _>>()?,
        send: send.into_iter().map(to_send_cmd).collect::<Result<_, _>>()?,
        recv: recv.into_iter().map(to_recv_cmd).collect::<Result<_, _>>()?,
        search: search
            .into_iter()
            .map(|s| to_search_cmd(s, max_query_limit))
            .collect::<Result<_, _>>()?,
        rank: rank.into_iter().map(to_rank_cmd).collect::<Result<_, _>>()?,
        top: top
            .into_iter()
            .map(|t| to_top_cmd(t, max_query_limit))
            .collect::<Result<_, _>>()?,
    })
}

fn to_load_cmd(r: LoadRequest) -> Result<LoadCmd, ValidationError> {
    validate::validate_entity_type(&r.entity_type)?;
    validate::validate_entity_id(&r.entity_id)?;
    Ok(LoadCmd { entity_type: r.entity_type, entity_id: r.entity_id, world_id: r.world_id, version: r.version })
}

fn to_save_cmd(r: SaveRequest) -> Result<SaveCmd, ValidationError> {
    validate::validate_entity_type(&r.entity_type)?;
    validate::validate_entity_id(&r.entity_id)?;
    for key in r.attributes.keys() {
        validate::validate_attribute_key(key)?;
    }
    Ok(SaveCmd {
        entity_type: r.entity_type,
        entity_id: r.entity_id,
        world_id: r.world_id,
        attributes: r.attributes,
        is_create: r.is_create,
        is_delete: r.is_delete,
    })
}

fn to_send_cmd(r: SendRequest) -> Result<SendCmd, ValidationError> {
    validate::validate_entity_type(&r.entity_type)?;
    validate::validate_entity_id(&r.entity_id)?;
    Ok(SendCmd { entity_type: r.entity_type, entity_id: r.entity_id, world_id: r.world_id, message: r.message })
}

fn to_recv_cmd(r: RecvRequest) -> Result<RecvCmd, ValidationError> {
    validate::validate_entity_type(&r.entity_type)?;
    validate::validate_entity_id(&r.entity_id)?;
    Ok(RecvCmd {
        entity_type: r.entity_type,
        entity_id: r.entity_id,
        world_id: r.world_id,
        timestamp: r.timestamp,
        count: r.count,
    })
}

fn to_search_cmd(r: SearchRequest, max_query_limit: usize) -> Result<SearchCmd, ValidationError> {
    validate::validate_entity_type(&r.entity_type)?;
    let limit = validate::validate_limit(r.limit.unwrap_or(0), max_query_limit)?;
    Ok(SearchCmd { entity_type: r.entity_type, world_id: r.world_id, name_pattern: r.name_pattern, limit: Some(limit) })
}

fn to_rank_cmd(r: RankRequest) -> Result<RankCmd, ValidationError> {
    validate::validate_entity_type(&r.entity_type)?;
    validate::validate_entity_id(&r.entity_id)?;
    validate::validate_rank_key(&r.rank_key)?;
    Ok(RankCmd { entity_type: r.entity_type, world_id: r.world_id, entity_id: r.entity_id, rank_key: r.rank_key })
}

fn to_top_cmd(r: TopRequest, max_query_limit: usize) -> Result<TopCmd, ValidationError> {
    validate::validate_entity_type(&r.entity_type)?;
    validate::validate_rank_key(&r.rank_key)?;
    let limit = validate::validate_limit(r.limit.unwrap_or(0), max_query_limit)?;
    let sort_order = match r.sort_order.as_deref() {
        Some("asc") => SortOrder::Asc,
        _ => SortOrder::Desc,
    };
    Ok(TopCmd { entity_type: r.entity_type, world_id: r.world_id, rank_key: r.rank_key, sort_order, limit: Some(limit) })
}

pub fn from_dispatch_response(resp: DispatchResponse) -> GatewayResponse {
    GatewayResponse {
        load: resp.load.into_iter().map(load_result_wire).collect(),
        save: resp
            .save
            .into_iter()
            .map(|s| SaveResultWire { success: s.success, version: s.version, error: s.error })
            .collect(),
        send: resp.send.into_iter().map(|success| SendResultWire { success }).collect(),
        recv: resp
            .recv
            .into_iter()
            .map(|r| RecvResultWire {
                success: r.success,
                world_instance_id: r.world_instance_id,
                data: r.data.into_iter().map(|e| StreamEntryWire { data: e.data, timestamp: e.timestamp }).collect(),
            })
            .collect(),
        search: resp.search.into_iter().map(|es| es.into_iter().map(entity_wire).collect()).collect(),
        rank: resp
            .rank
            .into_iter()
            .map(|r| r.map(|r| RankResultWire { score: r.score, rank: r.rank, total_entities: r.total_entities }))
            .collect(),
        top: resp
            .top
            .into_iter()
            .map(|entries| entries.into_iter().map(|(e, score)| TopEntryWire { entity: entity_wire(e), score }).collect())
            .collect(),
    }
}

fn load_result_wire(result: LoadResult) -> Option<LoadResultWire> {
    match result {
        LoadResult::Missing => None,
        LoadResult::Full(entity) => Some(LoadResultWire::Full(entity_wire(entity))),
        LoadResult::Diff(diff, world_instance_id) => {
            Some(LoadResultWire::Diff(DiffWire { attributes: diff.attributes, rank_scores: diff.rank_scores, world_instance_id }))
        }
    }
}

fn entity_wire(e: Entity) -> EntityWire {
    EntityWire {
        entity_type: e.entity_type,
        entity_id: e.entity_id,
        world_id: e.world_id,
        attributes: e.attributes,
        rank_scores: e.rank_scores,
        version: e.version,
        is_deleted: e.is_deleted,
        last_write: e.last_write,
        world_instance_id: e.world_instance_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::GatewayRequest;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn deserializes_example_request_payload() {
        let raw = json!({
            "auth": "YXV0aA==",
            "encrypted": "ZW5j",
            "nonce": "bm9uY2U=",
            "worldInstanceId": "world-1",
            "environment": "staging",
            "commands": {
                "load": [{"entityType": "Player", "entityId": "p1", "worldId": 1, "version": 3}],
                "save": [{"entityType": "Player", "entityId": "p1", "worldId": 1, "attributes": {"hp": 80}}],
                "rank": [{"entityType": "Player", "worldId": 1, "entityId": "p1", "rankKey": "kills:1"}]
            }
        });

        let req: GatewayRequest = serde_json::from_value(raw).unwrap();
        assert_eq!(req.world_instance_id, "world-1");
        assert_eq!(req.commands.load.len(), 1);
        assert_eq!(req.commands.load[0].version, Some(3));
        assert_eq!(req.commands.save[0].attributes.get("hp"), Some(&json!(80)));
    }

    #[test]
    fn missing_command_arrays_default_to_empty() {
        let raw = json!({
            "auth": "a",
            "encrypted": "e",
            "nonce": "n",
            "worldInstanceId": "world-1"
        });
        let req: GatewayRequest = serde_json::from_value(raw).unwrap();
        assert!(req.commands.load.is_empty());
        assert!(req.environment.is_empty());
    }

    #[test]
    fn bad_entity_type_rejects_whole_batch() {
        let commands = Commands {
            load: vec![LoadRequest { entity_type: "bad type!".into(), entity_id: "p1".into(), world_id: 1, version: None }],
            ..Default::default()
        };
        let err = to_command_batch("staging".into(), commands, 1000).unwrap_err();
        assert!(matches!(err, ValidationError::BadEntityType(_)));
    }

    #[test]
    fn rank_key_without_colon_is_rejected() {
        let commands = Commands {
            rank: vec![RankRequest { entity_type: "Player".into(), world_id: 1, entity_id: "p1".into(), rank_key: "kills".into() }],
            ..Default::default()
        };
        let err = to_command_batch("staging".into(), commands, 1000).unwrap_err();
        assert!(matches!(err, ValidationError::BadRankKey(_)));
    }

    #[test]
    fn missing_load_serializes_as_json_null() {
        let resp = DispatchResponse { load: vec![LoadResult::Missing], ..Default::default() };
        let wire = from_dispatch_response(resp);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["load"][0], serde_json::Value::Null);
    }

    #[test]
    fn full_load_result_serializes_camel_case_fields() {
        let entity = Entity {
            environment: "staging".into(),
            entity_type: "Player".into(),
            entity_id: "p1".into(),
            world_id: 1,
            attributes: HashMap::new(),
            rank_scores: HashMap::new(),
            version: 2,
            is_deleted: false,
            last_write: chrono::Utc::now(),
            world_instance_id: "world-1".into(),
        };
        let resp = DispatchResponse { load: vec![LoadResult::Full(entity)], ..Default::default() };
        let wire = from_dispatch_response(resp);
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(json["load"][0]["entityType"], "Player");
        assert_eq!(json["load"][0]["worldInstanceId"], "world-1");
    }
}
