use crate::error::CacheError;
use async_trait::async_trait;
use std::time::Duration;

/// The L2 store. Real implementation is Redis (`redis_backend`); tests use
/// an in-memory fake so L1/dependency-index logic doesn't need a live server.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError>;
    async fn mget(&self, keys: &[String]) -> Result<Vec<Option<Vec<u8>>>, CacheError>;
    async fn mset(&self, entries: &[(String, Vec<u8>)], ttl: Duration) -> Result<(), CacheError>;
    async fn del_many(&self, keys: &[String]) -> Result<(), CacheError>;
}
