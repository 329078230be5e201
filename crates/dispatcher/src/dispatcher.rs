use crate::models::*;
use crate::rank_extract::extract_rank_scores;
use futures::future::join_all;
use std::sync::Arc;
use worldgate_core::GatewayConfig;
use worldgate_durable::SortOrder as DurableSortOrder;
use worldgate_ephemeral::EphemeralManager;
use worldgate_durable::DurableManager;
use worldgate_streams::StreamManager;

/// Takes one validated inbound batch, splits it per §4.2's classification
/// and type routing, runs every sub-batch concurrently, and reassembles
/// results index-aligned with the caller's per-type arrays.
pub struct Dispatcher {
    ephemeral: Arc<EphemeralManager>,
    durable: Arc<DurableManager>,
    streams: Arc<StreamManager>,
    config: Arc<GatewayConfig>,
}

impl Dispatcher {
    pub fn new(ephemeral: Arc<EphemeralManager>, durable: Arc<DurableManager>, streams: Arc<StreamManager>, config: Arc<GatewayConfig>) -> Self {
        Self { ephemeral, durable, streams, config }
    }

    pub async fn dispatch(&self, batch: CommandBatch, world_instance_id: &str) -> DispatchResponse {
        let CommandBatch { environment, load, save, send, recv, search, rank, top } = batch;

        let (load_result, save_result, send_result, recv_result, search_result, rank_result, top_result) = tokio::join!(
            self.run_load(&environment, load),
            self.run_save(&environment, save),
            self.run_send(&environment, send),
            self.run_recv(&environment, recv, world_instance_id),
            self.run_search(&environment, search),
            self.run_rank(&environment, rank),
            self.run_top(&environment, top),
        );

        DispatchResponse {
            load: load_result,
            save: save_result,
            send: send_result,
            recv: recv_result,
            search: search_result,
            rank: rank_result,
            top: top_result,
        }
    }

    async fn run_load(&self, environment: &str, cmds: Vec<LoadCmd>) -> Vec<LoadResult> {
        let mut ephemeral_idx = Vec::new();
        let mut ephemeral_reqs = Vec::new();
        let mut durable_idx = Vec::new();
        let mut durable_reqs = Vec::new();

        for (i, cmd) in cmds.iter().enumerate() {
            if self.config.is_ephemeral_only(&cmd.entity_type) {
                ephemeral_idx.push(i);
                ephemeral_reqs.push(worldgate_ephemeral::LoadRequest {
                    environment: environment.to_string(),
                    entity_type: cmd.entity_type.clone(),
                    entity_id: cmd.entity_id.clone(),
                    world_id: cmd.world_id,
                    version: cmd.version,
                });
            } else {
                durable_idx.push(i);
                durable_reqs.push(worldgate_durable::LoadRequest {
                    environment: environment.to_string(),
                    entity_type: cmd.entity_type.clone(),
                    entity_id: cmd.entity_id.clone(),
                    world_id: cmd.world_id,
                });
            }
        }

        let mut out: Vec<LoadResult> = vec![LoadResult::Missing; cmds.len()];

        if !ephemeral_reqs.is_empty() {
            let outcomes = self.ephemeral.batch_load(ephemeral_reqs).await;
            for (pos, outcome) in ephemeral_idx.into_iter().zip(outcomes) {
                out[pos] = match outcome {
                    worldgate_ephemeral::LoadOutcome::Missing => LoadResult::Missing,
                    worldgate_ephemeral::LoadOutcome::Full(e) => LoadResult::Full(e),
                    worldgate_ephemeral::LoadOutcome::Diff(d, w) => LoadResult::Diff(d, w),
                };
            }
        }

        if !durable_reqs.is_empty() {
            let outcomes = self.durable.batch_load(durable_reqs).await;
            for (pos, outcome) in durable_idx.into_iter().zip(outcomes) {
                out[pos] = match outcome {
                    Some(e) => LoadResult::Full(e),
                    None => LoadResult::Missing,
                };
            }
        }

        out
    }

    async fn run_save(&self, environment: &str, cmds: Vec<SaveCmd>) -> Vec<SaveResult> {
        let mut ephemeral_idx = Vec::new();
        let mut ephemeral_reqs = Vec::new();
        let mut durable_idx = Vec::new();
        let mut durable_reqs = Vec::new();

        for (i, cmd) in cmds.into_iter().enumerate() {
            let mut attributes = cmd.attributes;
            let rank_scores = extract_rank_scores(&mut attributes);

            if self.config.is_ephemeral_only(&cmd.entity_type) {
                ephemeral_idx.push(i);
                ephemeral_reqs.push(worldgate_ephemeral::SaveRequest {
                    environment: environment.to_string(),
                    entity_type: cmd.entity_type,
                    entity_id: cmd.entity_id,
                    world_id: cmd.world_id,
                    attributes,
                    rank_scores,
                    is_create: cmd.is_create,
                    is_delete: cmd.is_delete,
                });
            } else {
                durable_idx.push(i);
                durable_reqs.push(worldgate_durable::SaveRequest {
                    environment: environment.to_string(),
                    entity_type: cmd.entity_type,
                    entity_id: cmd.entity_id,
                    world_id: cmd.world_id,
                    attributes,
                    rank_scores,
                    is_create: cmd.is_create,
                    is_delete: cmd.is_delete,
                });
            }
        }

        let total = ephemeral_idx.len() + durable_idx.len();
        let mut out: Vec<SaveResult> = vec![SaveResult { success: false, version: None, error: None }; total];

        if !ephemeral_reqs.is_empty() {
            let outcomes = self.ephemeral.batch_partial_save(ephemeral_reqs).await;
            for (pos, outcome) in ephemeral_idx.into_iter().zip(outcomes) {
                out[pos] = match outcome {
                    worldgate_ephemeral::SaveOutcome::Ok { version, .. } => SaveResult { success: true, version: Some(version), error: None },
                    worldgate_ephemeral::SaveOutcome::Err { error } => SaveResult { success: false, version: None, error: Some(error) },
                };
            }
        }

        if !durable_reqs.is_empty() {
            let outcomes = self.durable.batch_partial_save(durable_reqs).await;
            for (pos, outcome) in durable_idx.into_iter().zip(outcomes) {
                out[pos] = SaveResult { success: outcome.success, version: Some(outcome.version), error: outcome.error };
            }
        }

        out
    }

    async fn run_send(&self, environment: &str, cmds: Vec<SendCmd>) -> Vec<bool> {
        let count = cmds.len();
        let messages = cmds
            .into_iter()
            .map(|cmd| worldgate_streams::AddMessage {
                environment: environment.to_string(),
                entity_type: cmd.entity_type,
                entity_id: cmd.entity_id,
                world_id: cmd.world_id,
                message: cmd.message,
            })
            .collect();
        self.streams.batch_add_messages(messages).await;
        vec![true; count]
    }

    async fn run_recv(&self, environment: &str, cmds: Vec<RecvCmd>, world_instance_id: &str) -> Vec<RecvResult> {
        if cmds.is_empty() {
            return Vec::new();
        }
        let requests = cmds
            .into_iter()
            .map(|cmd| worldgate_streams::PullRequest {
                environment: environment.to_string(),
                entity_type: cmd.entity_type,
                entity_id: cmd.entity_id,
                world_id: cmd.world_id,
                timestamp: cmd.timestamp,
                count: cmd.count,
            })
            .collect();

        self.streams
            .batch_pull_messages(requests, world_instance_id)
            .await
            .into_iter()
            .map(|o| RecvResult { success: o.success, world_instance_id: o.world_instance_id, data: o.data })
            .collect()
    }

    async fn run_search(&self, environment: &str, cmds: Vec<SearchCmd>) -> Vec<Vec<worldgate_core::Entity>> {
        join_all(cmds.into_iter().map(|cmd| {
            let limit = cmd.limit.unwrap_or(self.config.max_query_limit).min(self.config.max_query_limit);
            self.durable.search_by_name(environment, &cmd.entity_type, cmd.world_id, &cmd.name_pattern, limit)
        }))
        .await
    }

    async fn run_rank(&self, environment: &str, cmds: Vec<RankCmd>) -> Vec<Option<worldgate_durable::RankResult>> {
        join_all(cmds.into_iter().map(|cmd| {
            let (score_type, partition_key) = split_rank_key(&cmd.rank_key);
            self.durable.calculate_entity_rank(environment, &cmd.entity_type, cmd.world_id, &cmd.entity_id, score_type, partition_key)
        }))
        .await
    }

    async fn run_top(&self, environment: &str, cmds: Vec<TopCmd>) -> Vec<Vec<(worldgate_core::Entity, f64)>> {
        join_all(cmds.into_iter().map(|cmd| {
            let (score_type, partition_key) = split_rank_key(&cmd.rank_key);
            let sort_order = match cmd.sort_order {
                SortOrder::Asc => DurableSortOrder::Asc,
                SortOrder::Desc => DurableSortOrder::Desc,
            };
            let limit = cmd.limit.unwrap_or(self.config.max_query_limit).min(self.config.max_query_limit);
            self.durable.get_ranked_entities(environment, &cmd.entity_type, cmd.world_id, score_type, partition_key, sort_order, limit)
        }))
        .await
    }
}

/// `"scoreType:partitionKey"` per §4.4.3; a key with no `:` is treated as
/// the whole key being the score type against the default partition.
fn split_rank_key(rank_key: &str) -> (&str, &str) {
    match rank_key.split_once(':') {
        Some((score_type, partition_key)) => (score_type, partition_key),
        None => (rank_key, "1"),
    }
}
