use crate::error::EphemeralError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Document-store seam a RedisJSON-equivalent store sits behind. Real
/// implementation pipelines these over `redis`; tests use an in-memory
/// fake so the manager's ordering and fencing logic can be exercised
/// without a live server.
#[async_trait]
pub trait EphemeralBackend: Send + Sync {
    async fn exists_many(&self, keys: &[String]) -> Result<Vec<bool>, EphemeralError>;
    async fn get_documents(&self, keys: &[String]) -> Result<Vec<Option<Value>>, EphemeralError>;
    async fn put_document(&self, key: &str, doc: &Value) -> Result<(), EphemeralError>;
    async fn delete_document(&self, key: &str) -> Result<(), EphemeralError>;

    /// Initializes the counter to 1 if absent, otherwise atomically
    /// increments and returns the new value.
    async fn incr_counter(&self, counter_key: &str) -> Result<u64, EphemeralError>;
    async fn delete_counter(&self, counter_key: &str) -> Result<(), EphemeralError>;

    async fn copy_snapshot(&self, doc: &Value, snapshot_key: &str, ttl: Duration) -> Result<bool, EphemeralError>;
    async fn get_snapshots(&self, keys: &[String]) -> Result<Vec<Option<Value>>, EphemeralError>;

    async fn dirty_add(&self, set_key: &str, member: &str) -> Result<(), EphemeralError>;
    async fn dirty_sample(&self, set_key: &str, n: usize) -> Result<Vec<String>, EphemeralError>;
    async fn dirty_count(&self, set_key: &str) -> Result<u64, EphemeralError>;
    async fn dirty_remove(&self, set_key: &str, members: &[String]) -> Result<(), EphemeralError>;

    /// Deletes `key` and `counter_key` only if the value currently held at
    /// `counter_key` is ≤ `persisted_version`. Must run as one atomic
    /// server-side operation (Lua `EVAL` for the real backend) so a
    /// concurrent bump of the counter aborts the delete.
    async fn conditional_delete(
        &self,
        key: &str,
        counter_key: &str,
        persisted_version: u64,
    ) -> Result<bool, EphemeralError>;
}
