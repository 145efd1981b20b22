//! Digital signature verification.
//!
//! Signing lives with the key types in [`crate::keys`]; verification only
//! needs the raw public key bits taken from an X.509 certificate.

use aws_lc_rs::signature::{self, UnparsedPublicKey, VerificationAlgorithm};
use thiserror::Error;

use crate::algorithm::SignatureAlgorithm;

/// Error type for signature operations.
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Invalid key format.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Algorithm not supported.
    #[error("algorithm not supported: {0}")]
    UnsupportedAlgorithm(String),
}

/// Verifies a signature produced by one of the supported algorithms.
///
/// `public_key` is the content of the certificate's `subjectPublicKey` bit
/// string: an uncompressed EC point or a PKCS#1 `RSAPublicKey`. ECDSA
/// signatures use the fixed-width `r || s` encoding XML-DSig mandates.
///
/// ## Errors
///
/// Returns [`SignatureError::Verification`] if the signature does not match.
pub fn verify_signature(
    algorithm: SignatureAlgorithm,
    public_key: &[u8],
    data: &[u8],
    sig: &[u8],
) -> Result<(), SignatureError> {
    let verification_alg: &'static dyn VerificationAlgorithm = match algorithm {
        SignatureAlgorithm::Es256 => &signature::ECDSA_P256_SHA256_FIXED,
        SignatureAlgorithm::Es384 => &signature::ECDSA_P384_SHA384_FIXED,
        SignatureAlgorithm::Es512 => &signature::ECDSA_P521_SHA512_FIXED,
        SignatureAlgorithm::Rs256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        SignatureAlgorithm::Rs384 => &signature::RSA_PKCS1_2048_8192_SHA384,
        SignatureAlgorithm::Rs512 => &signature::RSA_PKCS1_2048_8192_SHA512,
        SignatureAlgorithm::Ps256 => &signature::RSA_PSS_2048_8192_SHA256,
        SignatureAlgorithm::Ps384 => &signature::RSA_PSS_2048_8192_SHA384,
        SignatureAlgorithm::Ps512 => &signature::RSA_PSS_2048_8192_SHA512,
    };

    UnparsedPublicKey::new(verification_alg, public_key)
        .verify(data, sig)
        .map_err(|_| SignatureError::Verification)
}
