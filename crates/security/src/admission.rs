use crate::error::SecurityError;
use async_trait::async_trait;
use std::time::Duration;
use worldgate_core::keygen;

/// The tiny slice of the hybrid cache admission needs: a single
/// get/set-with-ttl pair. Implemented by `worldgate-cache::Cache` in the
/// binary that wires crates together, so this crate never has to depend
/// on the whole cache stack for one counter.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    async fn get_sequence(&self, world_instance_id: &str) -> Result<Option<u64>, SecurityError>;
    async fn set_sequence(&self, world_instance_id: &str, value: u64, ttl: Duration) -> Result<(), SecurityError>;
}

/// Wraps a `SequenceStore` with the read-compare-write monotonic
/// sequence-number admission rule.
pub struct AdmissionGuard<'a> {
    store: &'a dyn SequenceStore,
    ttl: Duration,
}

impl<'a> AdmissionGuard<'a> {
    pub fn new(store: &'a dyn SequenceStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Rejects unless `sequence_number` is strictly greater than whatever
    /// is currently stored for this world instance, then advances it.
    pub async fn check_and_advance(&self, world_instance_id: &str, sequence_number: u64) -> Result<(), SecurityError> {
        let key = keygen::sequence_key(world_instance_id);
        let current = self.store.get_sequence(&key).await?;

        if let Some(current) = current {
            if sequence_number <= current {
                return Err(SecurityError::BadSequence);
            }
        }

        self.store.set_sequence(&key, sequence_number, self.ttl).await
    }
}
