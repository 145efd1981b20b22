//! Cryptographic algorithm definitions.
//!
//! Every algorithm carries the XML-DSig URI it is advertised under, so the
//! SAML layer never has to keep its own URI tables in sync with this crate.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for algorithm operations.
#[derive(Debug, Error)]
pub enum AlgorithmError {
    /// Algorithm is explicitly forbidden (SHA-1 family).
    #[error("algorithm '{0}' is forbidden")]
    Forbidden(String),

    /// Unknown algorithm.
    #[error("unknown algorithm: {0}")]
    Unknown(String),

    /// Key size too small.
    #[error("key size {0} bits is below the minimum of {1} bits")]
    KeySizeTooSmall(u32, u32),
}

/// Hash algorithms usable for XML-DSig digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HashAlgorithm {
    /// SHA-256 (eIDAS minimum).
    #[serde(rename = "SHA256")]
    Sha256,

    /// SHA-384.
    #[serde(rename = "SHA384")]
    Sha384,

    /// SHA-512.
    #[serde(rename = "SHA512")]
    Sha512,
}

impl HashAlgorithm {
    /// Returns the output length in bytes.
    #[must_use]
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }

    /// Returns the algorithm name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }

    /// Returns the XML-DSig digest method URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::Sha256 => "http://www.w3.org/2001/04/xmlenc#sha256",
            Self::Sha384 => "http://www.w3.org/2001/04/xmldsig-more#sha384",
            Self::Sha512 => "http://www.w3.org/2001/04/xmlenc#sha512",
        }
    }

    /// Parses an XML-DSig digest method URI.
    ///
    /// ## Errors
    ///
    /// Returns an error if the URI names SHA-1 or is unknown.
    pub fn from_xml_dsig_uri(uri: &str) -> Result<Self, AlgorithmError> {
        match uri {
            "http://www.w3.org/2001/04/xmlenc#sha256" => Ok(Self::Sha256),
            "http://www.w3.org/2001/04/xmldsig-more#sha384" => Ok(Self::Sha384),
            "http://www.w3.org/2001/04/xmlenc#sha512" => Ok(Self::Sha512),
            "http://www.w3.org/2000/09/xmldsig#sha1" => Err(AlgorithmError::Forbidden(uri.to_string())),
            _ => Err(AlgorithmError::Unknown(uri.to_string())),
        }
    }
}

/// Signature algorithms accepted for SAML message signing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgorithm {
    // ECDSA
    /// ECDSA using P-256 curve and SHA-256 hash.
    #[serde(rename = "ES256")]
    Es256,

    /// ECDSA using P-384 curve and SHA-384 hash.
    #[serde(rename = "ES384")]
    Es384,

    /// ECDSA using P-521 curve and SHA-512 hash.
    #[serde(rename = "ES512")]
    Es512,

    // RSA PKCS#1 v1.5 signatures
    /// RSA PKCS#1 v1.5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,

    /// RSA PKCS#1 v1.5 with SHA-384.
    #[serde(rename = "RS384")]
    Rs384,

    /// RSA PKCS#1 v1.5 with SHA-512.
    #[serde(rename = "RS512")]
    Rs512,

    // RSA-PSS signatures
    /// RSA-PSS (MGF1) with SHA-256.
    #[serde(rename = "PS256")]
    Ps256,

    /// RSA-PSS (MGF1) with SHA-384.
    #[serde(rename = "PS384")]
    Ps384,

    /// RSA-PSS (MGF1) with SHA-512.
    #[serde(rename = "PS512")]
    Ps512,
}

impl SignatureAlgorithm {
    /// Returns the short algorithm name used in configuration.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
        }
    }

    /// Returns the XML-DSig signature method URI.
    #[must_use]
    pub const fn xml_dsig_uri(self) -> &'static str {
        match self {
            Self::Es256 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha256",
            Self::Es384 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha384",
            Self::Es512 => "http://www.w3.org/2001/04/xmldsig-more#ecdsa-sha512",
            Self::Rs256 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
            Self::Rs384 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha384",
            Self::Rs512 => "http://www.w3.org/2001/04/xmldsig-more#rsa-sha512",
            Self::Ps256 => "http://www.w3.org/2007/05/xmldsig-more#sha256-rsa-MGF1",
            Self::Ps384 => "http://www.w3.org/2007/05/xmldsig-more#sha384-rsa-MGF1",
            Self::Ps512 => "http://www.w3.org/2007/05/xmldsig-more#sha512-rsa-MGF1",
        }
    }

    /// Returns the hash algorithm used by this signature algorithm.
    #[must_use]
    pub const fn hash_algorithm(self) -> HashAlgorithm {
        match self {
            Self::Es256 | Self::Rs256 | Self::Ps256 => HashAlgorithm::Sha256,
            Self::Es384 | Self::Rs384 | Self::Ps384 => HashAlgorithm::Sha384,
            Self::Es512 | Self::Rs512 | Self::Ps512 => HashAlgorithm::Sha512,
        }
    }

    /// Returns whether this is an ECDSA algorithm.
    #[must_use]
    pub const fn is_ecdsa(self) -> bool {
        matches!(self, Self::Es256 | Self::Es384 | Self::Es512)
    }

    /// Returns whether this is an RSA algorithm.
    #[must_use]
    pub const fn is_rsa(self) -> bool {
        !self.is_ecdsa()
    }

    /// Parses a short algorithm name such as `ES384`.
    ///
    /// ## Errors
    ///
    /// Returns an error if the algorithm is forbidden or unknown.
    pub fn from_name(name: &str) -> Result<Self, AlgorithmError> {
        match name {
            "ES256" => Ok(Self::Es256),
            "ES384" => Ok(Self::Es384),
            "ES512" => Ok(Self::Es512),
            "RS256" => Ok(Self::Rs256),
            "RS384" => Ok(Self::Rs384),
            "RS512" => Ok(Self::Rs512),
            "PS256" => Ok(Self::Ps256),
            "PS384" => Ok(Self::Ps384),
            "PS512" => Ok(Self::Ps512),
            "RSA-SHA1" | "ECDSA-SHA1" => Err(AlgorithmError::Forbidden(name.to_string())),
            _ => Err(AlgorithmError::Unknown(name.to_string())),
        }
    }

    /// Parses an XML-DSig signature method URI.
    ///
    /// ## Errors
    ///
    /// Returns an error if the URI names a SHA-1 method or is unknown.
    pub fn from_xml_dsig_uri(uri: &str) -> Result<Self, AlgorithmError> {
        const ALL: [SignatureAlgorithm; 9] = [
            SignatureAlgorithm::Es256,
            SignatureAlgorithm::Es384,
            SignatureAlgorithm::Es512,
            SignatureAlgorithm::Rs256,
            SignatureAlgorithm::Rs384,
            SignatureAlgorithm::Rs512,
            SignatureAlgorithm::Ps256,
            SignatureAlgorithm::Ps384,
            SignatureAlgorithm::Ps512,
        ];

        if uri.ends_with("sha1") {
            return Err(AlgorithmError::Forbidden(uri.to_string()));
        }
        ALL.into_iter()
            .find(|alg| alg.xml_dsig_uri() == uri)
            .ok_or_else(|| AlgorithmError::Unknown(uri.to_string()))
    }

    /// Validates that an RSA signing key is large enough.
    ///
    /// ## Errors
    ///
    /// Returns an error if the key size is below 3072 bits.
    pub const fn validate_rsa_key_size(bits: u32) -> Result<(), AlgorithmError> {
        const MIN_RSA_BITS: u32 = 3072;

        if bits < MIN_RSA_BITS {
            return Err(AlgorithmError::KeySizeTooSmall(bits, MIN_RSA_BITS));
        }
        Ok(())
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
