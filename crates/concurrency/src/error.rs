use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    /// Not an error at the background worker: the caller is expected to
    /// treat this as "skip the tick", not retry in a loop.
    #[error("lock held by another owner")]
    Contention,
    #[error("backend unavailable: {0}")]
    Backend(String),
}
