use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("backend failure: {0}")]
    Backend(String),
}
