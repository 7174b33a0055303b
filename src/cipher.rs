//! Symmetric stream cipher for the hop-to-hop link.
//!
//! Uses ChaCha20 (RFC 8439) as a pure stream cipher: ciphertext is the
//! same length as plaintext, so the relay never re-frames the byte stream.
//!
//! Each direction of a tunnel owns its own [`CipherStream`], seeded with
//! the shared key and a random per-direction nonce. The nonce travels in
//! the clear exactly once at the head of its direction's byte stream and
//! is excluded from the encrypted payload.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of the shared secret in bytes (256 bits).
pub const KEY_SIZE: usize = 32;

/// Size of the per-direction nonce in bytes (96 bits).
pub const NONCE_SIZE: usize = 12;

/// The shared secret, provisioned out of band on both hops.
///
/// Zeroized when dropped.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherKey([u8; KEY_SIZE]);

impl std::fmt::Debug for CipherKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CipherKey(..)")
    }
}

impl CipherKey {
    /// Create a key from raw bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Create a key from a configuration-supplied secret.
    ///
    /// Fails with [`Error::KeySize`] when the secret is not exactly
    /// [`KEY_SIZE`] bytes; callers treat this as fatal at startup.
    pub fn from_secret(secret: &[u8]) -> Result<Self> {
        if secret.len() != KEY_SIZE {
            return Err(Error::KeySize {
                expected: KEY_SIZE,
                actual: secret.len(),
            });
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(secret);
        Ok(Self(bytes))
    }

    /// Get the raw key bytes.
    ///
    /// # Security
    ///
    /// Handle with care - this is secret key material.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// A per-direction nonce, generated fresh for every tunnel direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Nonce([u8; NONCE_SIZE]);

impl Nonce {
    /// Generate a random nonce from the OS entropy source.
    pub fn random() -> Self {
        let mut bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Create a nonce from raw bytes (the peer's transmitted nonce).
    pub fn from_bytes(bytes: [u8; NONCE_SIZE]) -> Self {
        Self(bytes)
    }

    /// Get the raw nonce bytes.
    pub fn as_bytes(&self) -> &[u8; NONCE_SIZE] {
        &self.0
    }
}

/// Stateful keystream for one direction of one tunnel.
///
/// Successive calls advance the keystream position, so the two ends must
/// process the same byte stream in the same order. Never shared between
/// directions or sessions.
pub struct CipherStream {
    inner: ChaCha20,
}

impl CipherStream {
    /// Create a new stream seeded with the shared key and a direction nonce.
    pub fn new(key: &CipherKey, nonce: &Nonce) -> Self {
        Self {
            inner: ChaCha20::new(key.as_bytes().into(), nonce.as_bytes().into()),
        }
    }

    /// Encrypt a buffer in place, advancing the keystream.
    pub fn encrypt(&mut self, buf: &mut [u8]) {
        self.inner.apply_keystream(buf);
    }

    /// Decrypt a buffer in place, advancing the keystream.
    ///
    /// ChaCha20 is an XOR keystream, so this is the same transform as
    /// [`CipherStream::encrypt`]; the separate name keeps call sites honest.
    pub fn decrypt(&mut self, buf: &mut [u8]) {
        self.inner.apply_keystream(buf);
    }
}
