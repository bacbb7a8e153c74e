//! Symmetric token vault using ChaCha20-Poly1305
//!
//! Seals secrets held at rest (upstream access tokens, search-engine keys).
//! A sealed blob is `nonce || ciphertext`, where the ciphertext carries the
//! Poly1305 authentication tag.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    ChaCha20Poly1305, Key, Nonce,
};

use super::AuthError;

/// Master key length in bytes
pub const KEY_LEN: usize = 32;

/// Nonce length in bytes
pub const NONCE_LEN: usize = 12;

/// Poly1305 tag length in bytes
const TAG_LEN: usize = 16;

pub struct TokenVault {
    cipher: ChaCha20Poly1305,
}

// The cipher holds the master key; never print it.
impl fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenVault").finish_non_exhaustive()
    }
}

impl TokenVault {
    /// Build a vault from a raw 32-byte master key
    pub fn new(key: &[u8]) -> Result<Self, AuthError> {
        if key.len() != KEY_LEN {
            return Err(AuthError::ConfigurationFatal(format!(
                "vault key must be {} bytes, got {}",
                KEY_LEN,
                key.len()
            )));
        }

        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(key)),
        })
    }

    /// Build a vault from a hex-encoded master key
    pub fn from_hex(hex_key: &str) -> Result<Self, AuthError> {
        let key = hex::decode(hex_key.trim()).map_err(|_| {
            AuthError::ConfigurationFatal("vault key must be hex encoded".to_string())
        })?;
        Self::new(&key)
    }

    /// Seal `plaintext` under a fresh random nonce
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, AuthError> {
        let nonce = ChaCha20Poly1305::generate_nonce(&mut OsRng);

        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext)
            .map_err(|_| AuthError::CryptoFailure)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);
        Ok(blob)
    }

    /// Open a blob produced by [`TokenVault::encrypt`]
    ///
    /// Truncated input, a wrong key, or any tampering yields `CryptoFailure`.
    pub fn decrypt(&self, blob: &[u8]) -> Result<Vec<u8>, AuthError> {
        if blob.len() < NONCE_LEN + TAG_LEN {
            return Err(AuthError::CryptoFailure);
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AuthError::CryptoFailure)
    }

    pub fn encrypt_str(&self, plaintext: &str) -> Result<Vec<u8>, AuthError> {
        self.encrypt(plaintext.as_bytes())
    }

    pub fn decrypt_string(&self, blob: &[u8]) -> Result<String, AuthError> {
        String::from_utf8(self.decrypt(blob)?).map_err(|_| AuthError::CryptoFailure)
    }
}
