//! Auth & Admission: constant-time token check, nonce decode, X25519 box
//! open, and per-world-instance sequence monotonicity.

pub mod admission;
pub mod crypto;
pub mod error;
pub mod nonce;

pub use admission::{AdmissionGuard, SequenceStore};
pub use error::SecurityError;

use worldgate_core::config::GatewayConfig;

/// The inbound payload shape, minus `commands` (handled by `worldgate-wire`
/// / the dispatcher once admission succeeds).
#[derive(Debug, Clone)]
pub struct AuthEnvelope {
    pub auth_b64: String,
    pub encrypted_b64: String,
    pub nonce_b64: String,
    pub world_instance_id: String,
}

/// Runs the full admission pipeline: token compare, nonce decode, box
/// open, plaintext check, then (via the caller-supplied sequence store)
/// the monotonicity check. Returns the decoded sequence number on success
/// so the caller can log it.
pub async fn admit(
    envelope: &AuthEnvelope,
    config: &GatewayConfig,
    box_keys: &crypto::BoxKeys,
    sequence_store: &dyn SequenceStore,
) -> Result<u64, SecurityError> {
    crypto::verify_sender_token(&envelope.auth_b64, &config.sender_public_key_b64)?;

    let decoded_nonce = nonce::decode_nonce(&envelope.nonce_b64)?;

    let plaintext = crypto::open_box(&envelope.encrypted_b64, &decoded_nonce.raw, box_keys)?;
    if plaintext != envelope.world_instance_id.as_bytes() {
        return Err(SecurityError::DecryptFailed);
    }

    let guard = AdmissionGuard::new(sequence_store, config.sequence_ttl);
    guard
        .check_and_advance(&envelope.world_instance_id, decoded_nonce.sequence_number)
        .await?;

    Ok(decoded_nonce.sequence_number)
}
