use crate::error::DurableError;
use crate::models::{MergedUpsert, SortOrder, UpsertOutcome};
use async_trait::async_trait;
use worldgate_core::Entity;

/// The relational store seam. Real implementation is `sqlx::PgPool`
/// against an `entities` table; tests use an in-memory fake so merge and
/// chunking logic doesn't need a live Postgres.
#[async_trait]
pub trait DurableBackend: Send + Sync {
    async fn fetch_existing(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        ids: &[String],
    ) -> Result<Vec<Entity>, DurableError>;

    /// Executes one chunk (≤150 entities) as a single transaction: insert
    /// on absence, else merge attributes/rank-scores and apply
    /// `keysToRemove`, setting `isDeleted` or bumping `version` as
    /// appropriate.
    async fn upsert_chunk(&self, chunk: &[MergedUpsert]) -> Result<Vec<UpsertOutcome>, DurableError>;

    async fn search_by_name(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: Option<u64>,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<Entity>, DurableError>;

    async fn get_ranked_entities(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        score_type: &str,
        partition_key: &str,
        sort_order: SortOrder,
        limit: usize,
    ) -> Result<Vec<(Entity, f64)>, DurableError>;

    /// The entity's raw score plus how many entities in the same
    /// `(entityType, worldId, scoreType, partitionKey)` group have that
    /// rank key at all (for `totalEntities`).
    async fn get_entity_score(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        entity_id: &str,
        score_type: &str,
        partition_key: &str,
    ) -> Result<Option<f64>, DurableError>;

    async fn count_ranked(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        score_type: &str,
        partition_key: &str,
    ) -> Result<u64, DurableError>;

    /// 1-based dense rank of `score` from the top among entities sharing
    /// the same rank key.
    async fn rank_of_score(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        score_type: &str,
        partition_key: &str,
        score: f64,
    ) -> Result<u64, DurableError>;
}
