//! Versioned document store for hot entity reads/writes: partial saves,
//! diff-on-read, and dirty-set tracking for the background persistence
//! worker.

pub mod backend;
pub mod error;
pub mod manager;
pub mod models;
pub mod redis_backend;

pub use backend::EphemeralBackend;
pub use error::EphemeralError;
pub use manager::EphemeralManager;
pub use models::{FlushOutcome, LoadOutcome, LoadRequest, PendingUpdate, PersistedItem, SaveOutcome, SaveRequest};
pub use redis_backend::RedisEphemeralBackend;
