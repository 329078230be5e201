use crate::backend::DurableBackend;
use crate::error::DurableError;
use crate::models::{MergedUpsert, SortOrder, UpsertOutcome};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use worldgate_core::{merge, Entity, RankScores};

fn to_err(e: sqlx::Error) -> DurableError {
    DurableError::Backend(e.to_string())
}

/// `sqlx::PgPool`-backed implementation against an `entities` table with
/// composite primary key `(environment, entity_type, entity_id)`, a
/// `world_id` column, JSONB `attributes`/`rank_scores`, and the usual
/// `version`/`is_deleted`/`last_write` bookkeeping columns.
pub struct PgDurableBackend {
    pool: PgPool,
}

impl PgDurableBackend {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn row_to_entity(row: &sqlx::postgres::PgRow) -> Result<Entity, DurableError> {
    let attributes: Value = row.try_get("attributes").map_err(to_err)?;
    let rank_scores: Value = row.try_get("rank_scores").map_err(to_err)?;
    Ok(Entity {
        environment: row.try_get("environment").map_err(to_err)?,
        entity_type: row.try_get("entity_type").map_err(to_err)?,
        entity_id: row.try_get("entity_id").map_err(to_err)?,
        world_id: row.try_get::<i64, _>("world_id").map_err(to_err)? as u64,
        attributes: serde_json::from_value(attributes).unwrap_or_default(),
        rank_scores: serde_json::from_value(rank_scores).unwrap_or_default(),
        version: row.try_get::<i64, _>("version").map_err(to_err)? as u64,
        is_deleted: row.try_get("is_deleted").map_err(to_err)?,
        last_write: row.try_get("last_write").map_err(to_err)?,
        world_instance_id: String::new(),
    })
}

#[async_trait]
impl DurableBackend for PgDurableBackend {
    async fn fetch_existing(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        ids: &[String],
    ) -> Result<Vec<Entity>, DurableError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(
            "SELECT environment, entity_type, entity_id, world_id, attributes, rank_scores, version, is_deleted, last_write \
             FROM entities WHERE environment = $1 AND entity_type = $2 AND world_id = $3 AND entity_id = ANY($4) AND is_deleted = false",
        )
        .bind(environment)
        .bind(entity_type)
        .bind(world_id as i64)
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(to_err)?;

        rows.iter().map(row_to_entity).collect()
    }

    async fn upsert_chunk(&self, chunk: &[MergedUpsert]) -> Result<Vec<UpsertOutcome>, DurableError> {
        let mut tx = self.pool.begin().await.map_err(to_err)?;
        let mut out = Vec::with_capacity(chunk.len());

        for item in chunk {
            let existing = sqlx::query(
                "SELECT attributes, rank_scores, version, is_deleted FROM entities \
                 WHERE environment = $1 AND entity_type = $2 AND entity_id = $3 FOR UPDATE",
            )
            .bind(&item.environment)
            .bind(&item.entity_type)
            .bind(&item.entity_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(to_err)?;

            if item.is_create && existing.is_some() {
                out.push(UpsertOutcome {
                    entity_type: item.entity_type.clone(),
                    entity_id: item.entity_id.clone(),
                    world_id: item.world_id,
                    success: false,
                    version: 0,
                    error: Some("CREATE_CONFLICT".to_string()),
                });
                continue;
            }
            if !item.is_create && existing.is_none() {
                out.push(UpsertOutcome {
                    entity_type: item.entity_type.clone(),
                    entity_id: item.entity_id.clone(),
                    world_id: item.world_id,
                    success: false,
                    version: 0,
                    error: Some("NOT_FOUND".to_string()),
                });
                continue;
            }

            let (mut attrs_map, mut ranks_map, mut version, mut is_deleted) = match &existing {
                Some(row) => {
                    let attributes: Value = row.try_get("attributes").map_err(to_err)?;
                    let rank_scores: Value = row.try_get("rank_scores").map_err(to_err)?;
                    let attrs_map: HashMap<String, Value> = serde_json::from_value(attributes).unwrap_or_default();
                    let ranks_map: RankScores = serde_json::from_value(rank_scores).unwrap_or_default();
                    let version: i64 = row.try_get("version").map_err(to_err)?;
                    let is_deleted: bool = row.try_get("is_deleted").map_err(to_err)?;
                    (attrs_map, ranks_map, version as u64, is_deleted)
                }
                None => (HashMap::new(), RankScores::new(), 0u64, false),
            };

            if item.is_delete {
                is_deleted = true;
            } else {
                merge::apply_attributes(&mut attrs_map, &item.attributes);
                merge::apply_rank_scores(&mut ranks_map, &item.rank_scores);
            }
            version += 1;

            let attrs_json = serde_json::to_value(&attrs_map).map_err(|e| DurableError::Backend(e.to_string()))?;
            let ranks_json = serde_json::to_value(&ranks_map).map_err(|e| DurableError::Backend(e.to_string()))?;

            sqlx::query(
                "INSERT INTO entities (environment, entity_type, entity_id, world_id, attributes, rank_scores, version, is_deleted, last_write) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now()) \
                 ON CONFLICT (environment, entity_type, entity_id) DO UPDATE SET \
                 world_id = EXCLUDED.world_id, attributes = EXCLUDED.attributes, rank_scores = EXCLUDED.rank_scores, \
                 version = EXCLUDED.version, is_deleted = EXCLUDED.is_deleted, last_write = now()",
            )
            .bind(&item.environment)
            .bind(&item.entity_type)
            .bind(&item.entity_id)
            .bind(item.world_id as i64)
            .bind(&attrs_json)
            .bind(&ranks_json)
            .bind(version as i64)
            .bind(is_deleted)
            .execute(&mut *tx)
            .await
            .map_err(to_err)?;

            out.push(UpsertOutcome {
                entity_type: item.entity_type.clone(),
                entity_id: item.entity_id.clone(),
                world_id: item.world_id,
                success: true,
                version,
                error: None,
            });
        }

        tx.commit().await.map_err(to_err)?;
        Ok(out)
    }

    async fn search_by_name(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: Option<u64>,
        pattern: &str,
        limit: usize,
    ) -> Result<Vec<Entity>, DurableError> {
        let like = format!("%{}%", pattern.to_lowercase());
        let rows = sqlx::query(
            "SELECT environment, entity_type, entity_id, world_id, attributes, rank_scores, version, is_deleted, last_write \
             FROM entities WHERE environment = $1 AND entity_type = $2 AND is_deleted = false \
             AND ($3::bigint IS NULL OR world_id = $3) \
             AND lower(attributes->>'name') LIKE $4 LIMIT $5",
        )
        .bind(environment)
        .bind(entity_type)
        .bind(world_id.map(|w| w as i64))
        .bind(like)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(to_err)?;

        rows.iter().map(row_to_entity).collect()
    }

    async fn get_ranked_entities(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        score_type: &str,
        partition_key: &str,
        sort_order: SortOrder,
        limit: usize,
    ) -> Result<Vec<(Entity, f64)>, DurableError> {
        let order = match sort_order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let query = format!(
            "SELECT environment, entity_type, entity_id, world_id, attributes, rank_scores, version, is_deleted, last_write, \
             (rank_scores->$3->>$4)::double precision AS score \
             FROM entities WHERE environment = $1 AND entity_type = $2 AND world_id = $5 AND is_deleted = false \
             AND rank_scores ? $3 AND rank_scores->$3 ? $4 \
             ORDER BY score {order} LIMIT $6"
        );
        let rows = sqlx::query(&query)
            .bind(environment)
            .bind(entity_type)
            .bind(score_type)
            .bind(partition_key)
            .bind(world_id as i64)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(to_err)?;

        rows.iter()
            .map(|row| {
                let entity = row_to_entity(row)?;
                let score: f64 = row.try_get("score").map_err(to_err)?;
                Ok((entity, score))
            })
            .collect()
    }

    async fn get_entity_score(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        entity_id: &str,
        score_type: &str,
        partition_key: &str,
    ) -> Result<Option<f64>, DurableError> {
        let row = sqlx::query(
            "SELECT (rank_scores->$5->>$6)::double precision AS score FROM entities \
             WHERE environment = $1 AND entity_type = $2 AND world_id = $3 AND entity_id = $4 AND is_deleted = false",
        )
        .bind(environment)
        .bind(entity_type)
        .bind(world_id as i64)
        .bind(entity_id)
        .bind(score_type)
        .bind(partition_key)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_err)?;

        Ok(row.and_then(|r| r.try_get::<Option<f64>, _>("score").ok().flatten()))
    }

    async fn count_ranked(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        score_type: &str,
        partition_key: &str,
    ) -> Result<u64, DurableError> {
        let row = sqlx::query(
            "SELECT count(*) AS n FROM entities WHERE environment = $1 AND entity_type = $2 AND world_id = $3 \
             AND is_deleted = false AND rank_scores ? $4 AND rank_scores->$4 ? $5",
        )
        .bind(environment)
        .bind(entity_type)
        .bind(world_id as i64)
        .bind(score_type)
        .bind(partition_key)
        .fetch_one(&self.pool)
        .await
        .map_err(to_err)?;

        Ok(row.try_get::<i64, _>("n").map_err(to_err)? as u64)
    }

    async fn rank_of_score(
        &self,
        environment: &str,
        entity_type: &str,
        world_id: u64,
        score_type: &str,
        partition_key: &str,
        score: f64,
    ) -> Result<u64, DurableError> {
        let row = sqlx::query(
            "SELECT count(*) AS n FROM entities WHERE environment = $1 AND entity_type = $2 AND world_id = $3 \
             AND is_deleted = false AND rank_scores ? $4 AND rank_scores->$4 ? $5 \
             AND (rank_scores->$4->>$5)::double precision > $6",
        )
        .bind(environment)
        .bind(entity_type)
        .bind(world_id as i64)
        .bind(score_type)
        .bind(partition_key)
        .bind(score)
        .fetch_one(&self.pool)
        .await
        .map_err(to_err)?;

        Ok(row.try_get::<i64, _>("n").map_err(to_err)? as u64 + 1)
    }
}
