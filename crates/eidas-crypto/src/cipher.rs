//! AES-256-GCM sealing for encrypted assertions.
//!
//! Sealed output layout: `nonce (12) || ciphertext || tag (16)`.

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use thiserror::Error;

use crate::random::random_bytes;

/// AES-256 key length in bytes.
pub const AES_256_KEY_LEN: usize = 32;

/// Error type for cipher operations.
#[derive(Debug, Error)]
pub enum CipherError {
    /// Key material has the wrong length.
    #[error("invalid key length: expected {AES_256_KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),

    /// Sealed input is shorter than nonce plus tag.
    #[error("sealed data is truncated")]
    Truncated,

    /// Encryption failed.
    #[error("encryption failed")]
    Seal,

    /// Authentication tag mismatch or corrupted ciphertext.
    #[error("decryption failed")]
    Open,
}

fn key(key: &[u8]) -> Result<LessSafeKey, CipherError> {
    if key.len() != AES_256_KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    let unbound = UnboundKey::new(&AES_256_GCM, key).map_err(|_| CipherError::InvalidKeyLength(key.len()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypts `plaintext` under a fresh random nonce.
///
/// # Errors
///
/// Returns an error if the key is not 32 bytes or sealing fails.
pub fn seal(key_bytes: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let key = key(key_bytes)?;
    let nonce_bytes = random_bytes(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(&nonce_bytes).map_err(|_| CipherError::Seal)?;

    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| CipherError::Seal)?;

    let mut sealed = nonce_bytes;
    sealed.extend_from_slice(&in_out);
    Ok(sealed)
}

/// Decrypts data produced by [`seal`].
///
/// # Errors
///
/// Returns an error if the input is truncated or fails authentication.
pub fn open(key_bytes: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
    let key = key(key_bytes)?;
    if sealed.len() < NONCE_LEN + AES_256_GCM.tag_len() {
        return Err(CipherError::Truncated);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CipherError::Open)?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| CipherError::Open)?;
    Ok(plaintext.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [7u8; 32];

    #[test]
    fn sealed_data_opens_with_same_key() {
        let sealed = seal(&KEY, b"<saml2:Assertion/>").expect("seal");
        assert_eq!(open(&KEY, &sealed).expect("open"), b"<saml2:Assertion/>");
    }

    #[test]
    fn nonces_differ_between_calls() {
        let a = seal(&KEY, b"same").expect("seal");
        let b = seal(&KEY, b"same").expect("seal");
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_fails() {
        let sealed = seal(&KEY, b"secret").expect("seal");
        assert!(matches!(open(&[9u8; 32], &sealed), Err(CipherError::Open)));
    }

    #[test]
    fn flipped_bit_fails() {
        let mut sealed = seal(&KEY, b"secret").expect("seal");
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(open(&KEY, &sealed), Err(CipherError::Open)));
    }

    #[test]
    fn short_key_is_rejected() {
        assert!(matches!(seal(&[1u8; 16], b"x"), Err(CipherError::InvalidKeyLength(16))));
        assert!(matches!(open(&KEY, &[0u8; 4]), Err(CipherError::Truncated)));
    }
}
