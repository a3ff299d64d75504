//! AES-256-GCM codec for secure notes.
//!
//! Stored form is `base64(nonce || ciphertext || tag)`, so every note carries
//! what it needs to be decrypted on its own.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::entity::Note;
use crate::error::{Result, ShortFormError};

const NONCE_LEN: usize = 12;

/// Encrypts and decrypts note content under a key derived from a user secret.
#[derive(Clone)]
pub struct NoteCipher {
    key: [u8; 32],
}

impl NoteCipher {
    /// Derive the key as SHA-256 of the secret, so the same secret always
    /// opens notes written under it.
    pub fn from_secret(secret: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self { key }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| ShortFormError::Encryption(e.to_string()))?;

        let mut nonce = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| ShortFormError::Encryption("AES-GCM encryption failed".into()))?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ciphertext);

        Ok(base64::engine::general_purpose::STANDARD.encode(blob))
    }

    pub fn decrypt(&self, stored: &str) -> Result<String> {
        let blob = base64::engine::general_purpose::STANDARD
            .decode(stored)
            .map_err(|_| ShortFormError::Decryption)?;
        if blob.len() <= NONCE_LEN {
            return Err(ShortFormError::Decryption);
        }

        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher =
            Aes256Gcm::new_from_slice(&self.key).map_err(|_| ShortFormError::Decryption)?;
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| ShortFormError::Decryption)?;

        String::from_utf8(plaintext).map_err(|_| ShortFormError::Decryption)
    }

    /// Encrypted copy of `note`; the original keeps its plaintext.
    pub fn seal(&self, note: &Note) -> Result<Note> {
        let mut sealed = note.clone();
        sealed.content = self.encrypt(&note.content)?;
        sealed.secure = true;
        Ok(sealed)
    }

    /// Decrypted copy of a secure note. Insecure notes come back unchanged.
    pub fn open(&self, note: &Note) -> Result<Note> {
        let mut opened = note.clone();
        if note.secure {
            opened.content = self.decrypt(&note.content)?;
        }
        Ok(opened)
    }
}

impl std::fmt::Debug for NoteCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoteCipher")
            .field("key", &"[REDACTED]")
            .finish()
    }
}
