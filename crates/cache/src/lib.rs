//! Hybrid L1 (in-process) / L2 (Redis) cache with dependency-driven
//! invalidation.

pub mod backend;
pub mod cache;
pub mod error;
pub mod redis_backend;

pub use backend::CacheBackend;
pub use cache::{Cache, CacheEntry};
pub use error::CacheError;
