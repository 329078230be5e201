use thiserror::Error;

/// Every variant here corresponds to one named admission failure mode.
/// All of them terminate the request before any dispatch work runs.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum SecurityError {
    #[error("AUTH_BAD_TOKEN")]
    BadToken,
    #[error("AUTH_BAD_NONCE")]
    BadNonce,
    #[error("AUTH_DECRYPT_FAILED")]
    DecryptFailed,
    #[error("AUTH_BAD_SEQUENCE")]
    BadSequence,
    #[error("store unavailable while checking sequence: {0}")]
    StoreUnavailable(String),
}
