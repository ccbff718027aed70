//! Encryption at rest for third-party API credentials.
//!
//! One process-wide ChaCha20-Poly1305 key is loaded at startup. There is no key
//! rotation: if the key is lost or replaced, every stored credential becomes
//! undecryptable and users must enter their credentials again.

mod error;

pub use error::VaultError;

use base64::{engine::general_purpose::STANDARD, engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chacha20poly1305::{aead::Aead, ChaCha20Poly1305, KeyInit, Nonce};
use rand::RngCore;

const ENVELOPE_VERSION: &str = "v1";
const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct CredentialVault {
    cipher: ChaCha20Poly1305,
}

impl CredentialVault {
    /// Accepts a 32 byte key encoded as standard or url-safe base64.
    pub fn from_base64_key(encoded: &str) -> Result<Self, VaultError> {
        let encoded = encoded.trim();
        let bytes = STANDARD
            .decode(encoded)
            .or_else(|_| URL_SAFE_NO_PAD.decode(encoded.trim_end_matches('=')))
            .map_err(|e| VaultError::InvalidKey(e.to_string()))?;

        if bytes.len() != KEY_LEN {
            return Err(VaultError::InvalidKey(format!(
                "expected {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        Self::from_key_bytes(&bytes)
    }

    pub fn from_key_bytes(key: &[u8]) -> Result<Self, VaultError> {
        let cipher = ChaCha20Poly1305::new_from_slice(key).map_err(|e| VaultError::InvalidKey(e.to_string()))?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_bytes())
            .map_err(|_| VaultError::EncryptionFailed)?;

        Ok(format!(
            "{ENVELOPE_VERSION}:{}:{}",
            URL_SAFE_NO_PAD.encode(nonce_bytes),
            URL_SAFE_NO_PAD.encode(ciphertext)
        ))
    }

    pub fn decrypt(&self, envelope: &str) -> Result<String, VaultError> {
        let mut parts = envelope.split(':');
        let (Some(ENVELOPE_VERSION), Some(nonce_b64), Some(ciphertext_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(VaultError::CorruptCredential);
        };

        let nonce = URL_SAFE_NO_PAD
            .decode(nonce_b64)
            .map_err(|_| VaultError::CorruptCredential)?;
        if nonce.len() != NONCE_LEN {
            return Err(VaultError::CorruptCredential);
        }
        let ciphertext = URL_SAFE_NO_PAD
            .decode(ciphertext_b64)
            .map_err(|_| VaultError::CorruptCredential)?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext.as_ref())
            .map_err(|_| VaultError::CorruptCredential)?;

        String::from_utf8(plaintext).map_err(|_| VaultError::CorruptCredential)
    }
}
