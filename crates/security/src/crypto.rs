use crate::error::SecurityError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use crypto_box::aead::Aead;
use crypto_box::{Nonce, PublicKey, SalsaBox, SecretKey};

/// The X25519 key pair this gateway decrypts with, plus the sender's
/// public key it authenticates against. Built once at startup and reused
/// for every request — `SalsaBox` precomputes the X25519 shared secret
/// once instead of redoing the scalar multiplication per message.
pub struct BoxKeys {
    sender_public_key: PublicKey,
    salsa_box: SalsaBox,
}

impl BoxKeys {
    pub fn from_config(sender_public_key_b64: &str, recipient_private_key_b64: &str) -> Result<Self, SecurityError> {
        let sender_public_bytes = decode_32(sender_public_key_b64)?;
        let recipient_secret_bytes = decode_32(recipient_private_key_b64)?;

        let sender_public_key = PublicKey::from(sender_public_bytes);
        let recipient_secret = SecretKey::from(recipient_secret_bytes);

        Ok(Self {
            salsa_box: SalsaBox::new(&sender_public_key, &recipient_secret),
            sender_public_key,
        })
    }

    pub fn sender_public_key_bytes(&self) -> [u8; 32] {
        *self.sender_public_key.as_bytes()
    }
}

fn decode_32(b64: &str) -> Result<[u8; 32], SecurityError> {
    let bytes = STANDARD.decode(b64).map_err(|_| SecurityError::BadToken)?;
    bytes.try_into().map_err(|_| SecurityError::BadToken)
}

/// Constant-time compare of the `auth` field against the configured
/// sender public key.
pub fn verify_sender_token(auth_b64: &str, sender_public_key_b64: &str) -> Result<(), SecurityError> {
    let given = STANDARD.decode(auth_b64).map_err(|_| SecurityError::BadToken)?;
    let expected = STANDARD.decode(sender_public_key_b64).map_err(|_| SecurityError::BadToken)?;

    if constant_time_eq(&given, &expected) {
        Ok(())
    } else {
        Err(SecurityError::BadToken)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Opens `encrypted_b64` using the 24-byte nonce decoded from the
/// payload's `nonce` field. The plaintext is returned raw; the caller
/// checks it equals `worldInstanceId`.
pub fn open_box(encrypted_b64: &str, nonce_raw: &[u8; 24], keys: &BoxKeys) -> Result<Vec<u8>, SecurityError> {
    let ciphertext = STANDARD.decode(encrypted_b64).map_err(|_| SecurityError::DecryptFailed)?;
    let nonce = Nonce::clone_from_slice(nonce_raw);
    keys.salsa_box.decrypt(&nonce, ciphertext.as_ref()).map_err(|_| SecurityError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_time_eq_rejects_different_lengths() {
        assert!(!constant_time_eq(b"abc", b"ab"));
    }

    #[test]
    fn constant_time_eq_matches_equal_slices() {
        assert!(constant_time_eq(b"abc", b"abc"));
    }
}
