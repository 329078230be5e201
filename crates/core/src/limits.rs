//! Size and count bounds shared across crates so nobody re-states magic
//! constants.

/// `searchByName` / `getRankedEntities` results are capped at 1000.
pub const MAX_QUERY_LIMIT: usize = 1000;

/// Durable batch upserts are chunked to at most 150 entities per
/// server-side transaction.
pub const DURABLE_UPSERT_CHUNK: usize = 150;

/// Background worker's default pending-update sample size.
pub const DEFAULT_WORKER_BATCH_SIZE: usize = 500;

/// Stream pull default page size.
pub const DEFAULT_STREAM_PULL_COUNT: usize = 1000;

/// Nonce layout is a fixed 24 bytes: 3 little-endian u64s.
pub const NONCE_LEN: usize = 24;
