use thiserror::Error;

#[derive(Debug, Error)]
pub enum DurableError {
    #[error("entity already exists")]
    CreateConflict,
    #[error("entity not found")]
    NotFound,
    #[error("backend unavailable: {0}")]
    Backend(String),
}
