//! Signing key management using aws-lc-rs.
//!
//! ## Supported Algorithms
//!
//! ### RSA
//! - RS256 / RS384 / RS512 (RSA PKCS#1 v1.5)
//! - PS256 / PS384 / PS512 (RSA-PSS with MGF1)
//!
//! ### ECDSA
//! - ES256 / ES384 / ES512, emitting fixed-width `r || s` signatures

use aws_lc_rs::{
    rand::SystemRandom,
    signature::{
        self, EcdsaKeyPair, KeyPair, RsaKeyPair, ECDSA_P256_SHA256_FIXED_SIGNING,
        ECDSA_P384_SHA384_FIXED_SIGNING, ECDSA_P521_SHA512_FIXED_SIGNING,
    },
};
use base64::Engine;

use crate::algorithm::SignatureAlgorithm;
use crate::signature::SignatureError;

/// RSA key pair for signing.
///
/// Supports PKCS#1 v1.5 and PSS padding schemes.
pub struct RsaSigningKey {
    key_pair: RsaKeyPair,
    key_id: String,
    algorithm: SignatureAlgorithm,
}

impl RsaSigningKey {
    /// Creates a new RSA signing key from a PKCS#8 DER-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid, too small, or the algorithm is
    /// not RSA-based.
    pub fn from_pkcs8(pkcs8_der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        if !algorithm.is_rsa() {
            return Err(SignatureError::UnsupportedAlgorithm(format!(
                "{algorithm:?} is not an RSA algorithm"
            )));
        }

        let key_pair = RsaKeyPair::from_pkcs8(pkcs8_der)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA PKCS#8 key: {e}")))?;

        let key_bits = key_pair.public_modulus_len() * 8;
        #[allow(clippy::cast_possible_truncation)]
        SignatureAlgorithm::validate_rsa_key_size(key_bits as u32)
            .map_err(|e| SignatureError::InvalidKey(e.to_string()))?;

        let key_id = generate_key_id(key_pair.public_key().as_ref());

        Ok(Self {
            key_pair,
            key_id,
            algorithm,
        })
    }

    /// Returns the key ID.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the signature algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Signs the given data.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let rng = SystemRandom::new();
        let mut signature = vec![0u8; self.key_pair.public_modulus_len()];

        let padding: &'static dyn signature::RsaEncoding = match self.algorithm {
            SignatureAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
            SignatureAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
            SignatureAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
            SignatureAlgorithm::Ps256 => &signature::RSA_PSS_SHA256,
            SignatureAlgorithm::Ps384 => &signature::RSA_PSS_SHA384,
            SignatureAlgorithm::Ps512 => &signature::RSA_PSS_SHA512,
            _ => {
                return Err(SignatureError::UnsupportedAlgorithm(format!(
                    "{:?} not supported for RSA signing",
                    self.algorithm
                )));
            }
        };

        self.key_pair
            .sign(padding, &rng, data, &mut signature)
            .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

        Ok(signature)
    }
}

/// ECDSA key pair for signing.
pub struct EcdsaSigningKey {
    key_pair: EcdsaKeyPair,
    key_id: String,
    algorithm: SignatureAlgorithm,
}

impl EcdsaSigningKey {
    /// Creates a new ECDSA signing key from a PKCS#8 DER-encoded private key.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the algorithm is not
    /// ECDSA-based.
    pub fn from_pkcs8(pkcs8_der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        let signing_alg = match algorithm {
            SignatureAlgorithm::Es256 => &ECDSA_P256_SHA256_FIXED_SIGNING,
            SignatureAlgorithm::Es384 => &ECDSA_P384_SHA384_FIXED_SIGNING,
            SignatureAlgorithm::Es512 => &ECDSA_P521_SHA512_FIXED_SIGNING,
            _ => {
                return Err(SignatureError::UnsupportedAlgorithm(format!(
                    "{algorithm:?} is not an ECDSA algorithm"
                )));
            }
        };

        let key_pair = EcdsaKeyPair::from_pkcs8(signing_alg, pkcs8_der)
            .map_err(|e| SignatureError::InvalidKey(format!("Invalid ECDSA PKCS#8 key: {e}")))?;

        let key_id = generate_key_id(key_pair.public_key().as_ref());

        Ok(Self {
            key_pair,
            key_id,
            algorithm,
        })
    }

    /// Returns the key ID.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the signature algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }

    /// Signs the given data.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        let rng = SystemRandom::new();

        let signature = self
            .key_pair
            .sign(&rng, data)
            .map_err(|e| SignatureError::Signing(format!("ECDSA signing failed: {e}")))?;

        Ok(signature.as_ref().to_vec())
    }
}

/// A signing key of either family, selected by algorithm.
pub enum SigningKey {
    /// RSA key.
    Rsa(RsaSigningKey),
    /// ECDSA key.
    Ecdsa(EcdsaSigningKey),
}

impl SigningKey {
    /// Loads a PKCS#8 private key for the given algorithm.
    ///
    /// # Errors
    ///
    /// Returns an error if the key does not match the algorithm family.
    pub fn from_pkcs8(pkcs8_der: &[u8], algorithm: SignatureAlgorithm) -> Result<Self, SignatureError> {
        if algorithm.is_ecdsa() {
            EcdsaSigningKey::from_pkcs8(pkcs8_der, algorithm).map(Self::Ecdsa)
        } else {
            RsaSigningKey::from_pkcs8(pkcs8_der, algorithm).map(Self::Rsa)
        }
    }

    /// Returns the key ID.
    #[must_use]
    pub fn key_id(&self) -> &str {
        match self {
            Self::Rsa(key) => key.key_id(),
            Self::Ecdsa(key) => key.key_id(),
        }
    }

    /// Returns the signature algorithm.
    #[must_use]
    pub const fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::Rsa(key) => key.algorithm(),
            Self::Ecdsa(key) => key.algorithm(),
        }
    }

    /// Signs the given data.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign(&self, data: &[u8]) -> Result<Vec<u8>, SignatureError> {
        match self {
            Self::Rsa(key) => key.sign(data),
            Self::Ecdsa(key) => key.sign(data),
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id())
            .field("algorithm", &self.algorithm())
            .finish_non_exhaustive()
    }
}

/// Generates a key ID from the public key bytes.
fn generate_key_id(public_key: &[u8]) -> String {
    let hash = crate::sha256(public_key);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(&hash[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::self_signed;

    #[test]
    fn ecdsa_key_loads_and_signs() {
        let (_, pkcs8) = self_signed("FR");
        let key = SigningKey::from_pkcs8(&pkcs8, SignatureAlgorithm::Es384).expect("key");

        assert_eq!(key.algorithm(), SignatureAlgorithm::Es384);
        assert_eq!(key.sign(b"payload").expect("sign").len(), 96);
    }

    #[test]
    fn key_id_is_stable() {
        let (_, pkcs8) = self_signed("FR");
        let a = SigningKey::from_pkcs8(&pkcs8, SignatureAlgorithm::Es384).expect("key");
        let b = SigningKey::from_pkcs8(&pkcs8, SignatureAlgorithm::Es384).expect("key");
        assert_eq!(a.key_id(), b.key_id());
    }

    #[test]
    fn ecdsa_key_rejected_for_rsa_algorithm() {
        let (_, pkcs8) = self_signed("FR");
        let result = SigningKey::from_pkcs8(&pkcs8, SignatureAlgorithm::Rs256);
        assert!(matches!(result, Err(SignatureError::InvalidKey(_))));
    }

    #[test]
    fn curve_mismatch_is_rejected() {
        let (_, pkcs8) = self_signed("FR");
        assert!(SigningKey::from_pkcs8(&pkcs8, SignatureAlgorithm::Es256).is_err());
    }
}
