//! Per-entity append-only message streams with world-instance affinity,
//! used for both client send/recv commands and internal change-event
//! fan-out from the durable store.

pub mod backend;
pub mod error;
pub mod manager;
pub mod models;
pub mod redis_backend;

pub use backend::StreamBackend;
pub use error::StreamError;
pub use manager::StreamManager;
pub use models::{AddMessage, PullOutcome, PullRequest, StreamEntry};
pub use redis_backend::RedisStreamBackend;
