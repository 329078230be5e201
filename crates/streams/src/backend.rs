use crate::error::StreamError;
use crate::models::StreamEntry;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Per-stream append-only log plus the world-instance affinity map that
/// rides alongside it. Real implementation is Redis Streams (`XADD`/
/// `XRANGE`) with a sliding `EXPIRE`; tests use an in-memory fake.
#[async_trait]
pub trait StreamBackend: Send + Sync {
    /// Pipelined append, one entry per `(streamKey, payload)`; refreshes
    /// the stream's sliding TTL. Fire-and-forget: callers don't wait on
    /// individual entry ids.
    async fn append_batch(&self, entries: &[(String, Value)], ttl: Duration) -> Result<(), StreamError>;

    /// Entries from `from` (Redis range syntax, `"-"` meaning the start)
    /// up to `count`, oldest first.
    async fn pull_range(&self, stream_key: &str, from: &str, count: usize) -> Result<Vec<StreamEntry>, StreamError>;

    async fn get_affinity(&self, stream_key: &str) -> Result<Option<String>, StreamError>;

    /// Atomic claim: sets `stream_key`'s affinity to `world_instance_id`
    /// with `ttl` only if unowned or already owned by the same caller,
    /// and always returns the owner in effect afterward.
    async fn claim_affinity(&self, stream_key: &str, world_instance_id: &str, ttl: Duration) -> Result<String, StreamError>;
}
