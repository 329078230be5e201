use thiserror::Error;

/// Errors from the pure validation layer. These abort the whole request
/// rather than partially applying it.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("entityType `{0}` does not match [A-Za-z0-9_]{{1,64}}")]
    BadEntityType(String),
    #[error("entityId `{0}` does not match [A-Za-z0-9_-]{{1,128}}")]
    BadEntityId(String),
    #[error("attribute key `{0}` does not match [A-Za-z0-9_]{{1,64}}")]
    BadAttributeKey(String),
    #[error("worldInstanceId `{0}` does not match [A-Za-z0-9_-]{{1..128}}")]
    BadWorldInstanceId(String),
    #[error("rankKey `{0}` must have the form scoreType:partitionKey")]
    BadRankKey(String),
    #[error("limit {0} exceeds the maximum of {1}")]
    LimitExceeded(usize, usize),
    #[error("environment `{0}` is not one of the configured environments")]
    UnknownEnvironment(String),
}

/// Top-level error aggregating every crate's error enum, used by the
/// orchestration entry point that wires Auth -> Dispatcher -> tiers.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("auth: {0}")]
    Auth(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    /// The request body did not parse as the expected JSON shape at all
    /// (not a single malformed command, the whole envelope).
    #[error("malformed request body: {0}")]
    Malformed(String),
}
