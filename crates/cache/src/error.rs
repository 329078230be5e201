use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// L2 errors are logged and treated as misses / lost writes; this
    /// variant exists for the log line, it is never propagated to a caller.
    #[error("L2 backend error: {0}")]
    L2(String),
}
