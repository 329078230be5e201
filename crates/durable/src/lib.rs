//! Relational entity store: merged batched upserts, soft delete, and the
//! name/rank/leaderboard queries fronted by the hybrid cache.

pub mod backend;
pub mod error;
pub mod manager;
pub mod models;
pub mod sqlx_backend;

pub use backend::DurableBackend;
pub use error::DurableError;
pub use manager::DurableManager;
pub use models::{LoadRequest, MergedUpsert, RankResult, SaveRequest, SortOrder, UpsertOutcome};
pub use sqlx_backend::PgDurableBackend;
