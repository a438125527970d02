//! AEAD sealing for the tunneled byte stream carried inside disguise packets.
//!
//! Distinct from the Minecraft protocol's own (unused, here) AES-CFB8 stream cipher:
//! this module authenticates and encrypts the inner tunnel payload with AES-256-GCM,
//! keyed directly off the shared secret rather than a negotiated session key.

use aes_gcm::aead::{Aead, OsRng as AeadOsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, KeyInit};
use sha2::{Digest, Sha256};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("ciphertext too short to contain a nonce and tag")]
    Truncated,
    #[error("authentication failed while opening sealed data")]
    AuthenticationFailed,
}

/// Derives the AES-256 key for a shared secret: `K = SHA-256(secret)`.
pub fn derive_key(secret: &str) -> Key<Aes256Gcm> {
    let digest = Sha256::digest(secret.as_bytes());
    *Key::<Aes256Gcm>::from_slice(&digest)
}

/// Encrypts `plaintext` under `key`, returning `nonce ∥ ciphertext ∥ tag`.
pub fn seal(key: &Key<Aes256Gcm>, plaintext: &[u8]) -> Vec<u8> {
    let cipher = Aes256Gcm::new(key);
    let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);
    let mut sealed = cipher
        .encrypt(&nonce, plaintext)
        .expect("AES-256-GCM encryption is infallible for bounded payloads");

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.append(&mut sealed);
    out
}

/// Decrypts a `nonce ∥ ciphertext ∥ tag` blob produced by [`seal`].
pub fn open(key: &Key<Aes256Gcm>, sealed: &[u8]) -> Result<Vec<u8>, Error> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(Error::Truncated);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    let cipher = Aes256Gcm::new(key);
    cipher
        .decrypt(nonce.into(), ciphertext)
        .map_err(|_| Error::AuthenticationFailed)
}
