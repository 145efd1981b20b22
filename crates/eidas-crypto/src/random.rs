//! Cryptographically secure random generation.
//!
//! Used for AEAD nonces and for generating assertion encryption keys.

use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;

/// Generates a cryptographically secure random byte array.
///
/// Uses the thread-local random number generator which is cryptographically
/// secure by default.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut rng = rand::rng();
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes[..]);
    bytes
}

/// Generates a cryptographically secure random alphanumeric string.
#[must_use]
pub fn random_alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    Alphanumeric.sample_string(&mut rng, len)
}

/// Generates a fresh AES-256 key.
#[must_use]
pub fn generate_aes_key() -> [u8; 32] {
    let mut key = [0u8; 32];
    rand::rng().fill(&mut key);
    key
}
