use crate::error::LockError;
use async_trait::async_trait;
use std::time::Duration;

/// The two primitives a real lock store needs to provide atomically.
/// Redis gives us both directly (`SET key value NX PX ttl` and an EVAL
/// script for compare-and-delete); an in-memory fake for tests implements
/// the same two operations behind a mutex.
#[async_trait]
pub trait LockBackend: Send + Sync {
    /// Atomic "set if absent with expiry". Returns `true` if this call
    /// won ownership.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, LockError>;

    /// Atomic "delete key only if its current value equals `value`".
    /// Returns `true` if the delete happened.
    async fn compare_and_delete(&self, key: &str, value: &str) -> Result<bool, LockError>;
}
