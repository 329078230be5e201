use crate::error::SecurityError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use worldgate_core::limits::NONCE_LEN;

/// A decoded 24-byte nonce: `LE u64 sequenceNumber | u64 random | u64 elapsedSeconds`.
///
/// Ciphertext encoding is sometimes inconsistent across client paths
/// (ASCII vs base64). This crate picks one canonical encoding — base64,
/// always — for both `nonce` and `encrypted`, and rejects anything that
/// doesn't decode as valid base64 of the expected length rather than
/// silently accepting ASCII.
pub struct DecodedNonce {
    pub raw: [u8; NONCE_LEN],
    pub sequence_number: u64,
    pub random: u64,
    pub elapsed_seconds: u64,
}

pub fn decode_nonce(nonce_b64: &str) -> Result<DecodedNonce, SecurityError> {
    let bytes = STANDARD.decode(nonce_b64).map_err(|_| SecurityError::BadNonce)?;
    if bytes.len() != NONCE_LEN {
        return Err(SecurityError::BadNonce);
    }

    let mut raw = [0u8; NONCE_LEN];
    raw.copy_from_slice(&bytes);

    let sequence_number = u64::from_le_bytes(raw[0..8].try_into().unwrap());
    let random = u64::from_le_bytes(raw[8..16].try_into().unwrap());
    let elapsed_seconds = u64::from_le_bytes(raw[16..24].try_into().unwrap());

    Ok(DecodedNonce {
        raw,
        sequence_number,
        random,
        elapsed_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_nonce(seq: u64, random: u64, elapsed: u64) -> String {
        let mut raw = [0u8; NONCE_LEN];
        raw[0..8].copy_from_slice(&seq.to_le_bytes());
        raw[8..16].copy_from_slice(&random.to_le_bytes());
        raw[16..24].copy_from_slice(&elapsed.to_le_bytes());
        STANDARD.encode(raw)
    }

    #[test]
    fn round_trips_fields() {
        let encoded = encode_nonce(1000, 42, 7);
        let decoded = decode_nonce(&encoded).unwrap();
        assert_eq!(decoded.sequence_number, 1000);
        assert_eq!(decoded.random, 42);
        assert_eq!(decoded.elapsed_seconds, 7);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let short = STANDARD.encode([0u8; 16]);
        assert_eq!(decode_nonce(&short), Err(SecurityError::BadNonce));
    }

    #[test]
    fn non_base64_is_rejected() {
        assert_eq!(decode_nonce("not base64!!"), Err(SecurityError::BadNonce));
    }
}
