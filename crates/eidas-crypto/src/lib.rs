//! # eidas-crypto
//!
//! Cryptographic operations for the eIDAS SAML engine using aws-lc-rs.
//!
//! ## Algorithm Policy
//!
//! eIDAS interoperability requires SHA-256 based XML signatures, so unlike a
//! pure CNSA 2.0 profile this crate accepts ES256/RS256/PS256 alongside the
//! SHA-384 and SHA-512 families. SHA-1 is never accepted:
//! - **NO SHA-1** - digest and signature URIs using SHA-1 are rejected
//! - **RSA minimum 3072 bits** for signing keys
//! - **AES-256-GCM** for assertion encryption

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod algorithm;
pub mod certificate;
pub mod cipher;
pub mod hash;
pub mod keys;
pub mod random;
pub mod signature;

#[cfg(test)]
mod testing;

pub use algorithm::{AlgorithmError, HashAlgorithm, SignatureAlgorithm};
pub use certificate::{Certificate, CertificateError, KeyType};
pub use cipher::{open, seal, CipherError, AES_256_KEY_LEN};
pub use hash::{hash, sha256, sha384, sha512};
pub use keys::{EcdsaSigningKey, RsaSigningKey, SigningKey};
pub use signature::{verify_signature, SignatureError};
