use thiserror::Error;

#[derive(Debug, Error)]
pub enum EphemeralError {
    #[error("entity already exists")]
    CreateConflict,
    #[error("entity not found")]
    NotFound,
    #[error("cannot delete nonexistent entity")]
    DeleteNonexistent,
    #[error("backend unavailable: {0}")]
    Backend(String),
}
