//! AES-256-GCM sealing and opening of record payloads.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Nonce};

use caduceus_core::error::GatewayError;
use caduceus_core::record::Envelope;

use crate::keys::KeyMaterial;

/// AES-GCM nonce length in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Authenticated-encryption codec bound to one tenant key.
pub struct CipherCodec {
    cipher: Aes256Gcm,
}

impl CipherCodec {
    pub fn new(key: &KeyMaterial) -> Result<Self, GatewayError> {
        let cipher = Aes256Gcm::new_from_slice(&key.bytes).map_err(|e| {
            GatewayError::KeyUnavailable { reason: format!("cipher init failed: {e}") }
        })?;
        Ok(Self { cipher })
    }

    /// Seal a payload under a fresh random nonce. Nonces are never reused:
    /// every call draws new bytes from the OS generator.
    pub fn seal(&self, plaintext: &[u8]) -> Result<Envelope, GatewayError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|e| GatewayError::Internal { reason: format!("seal failed: {e}") })?;
        Ok(Envelope { nonce: hex::encode(nonce), ciphertext: hex::encode(ciphertext) })
    }

    /// Open an envelope. Malformed hex, a wrong-length nonce, and a failed
    /// authentication tag are indistinguishable to the caller: every failure
    /// is `DecryptionFailed` with no further detail.
    pub fn open(&self, envelope: &Envelope) -> Result<Vec<u8>, GatewayError> {
        let nonce_bytes = hex::decode(&envelope.nonce).map_err(|_| GatewayError::DecryptionFailed)?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(GatewayError::DecryptionFailed);
        }
        let ciphertext =
            hex::decode(&envelope.ciphertext).map_err(|_| GatewayError::DecryptionFailed)?;
        self.cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| GatewayError::DecryptionFailed)
    }
}
