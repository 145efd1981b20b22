//! X.509 certificate handling.
//!
//! Certificates travel inside `ds:KeyInfo` as base64 DER and are compared
//! byte-for-byte against the trust store, so [`Certificate`] keeps the DER
//! form and parses it on demand.

use base64::Engine;
use thiserror::Error;
use x509_parser::oid_registry::{OID_KEY_TYPE_EC_PUBLIC_KEY, OID_PKCS1_RSAENCRYPTION};
use x509_parser::prelude::{FromDer, X509Certificate};

/// Error type for certificate operations.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The DER structure could not be parsed.
    #[error("invalid certificate: {0}")]
    Parse(String),

    /// The base64 or PEM wrapper could not be decoded.
    #[error("invalid certificate encoding: {0}")]
    Encoding(String),

    /// The public key type is not supported.
    #[error("unsupported public key type: {0}")]
    UnsupportedKey(String),
}

/// Public key family of a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// Elliptic curve key.
    Ec,
    /// RSA key.
    Rsa,
}

/// A DER-encoded X.509 certificate.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    /// Creates a certificate from DER bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are not a parseable certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CertificateError> {
        X509Certificate::from_der(der).map_err(|e| CertificateError::Parse(e.to_string()))?;
        Ok(Self { der: der.to_vec() })
    }

    /// Creates a certificate from base64 DER, ignoring embedded whitespace.
    ///
    /// This is the form used by `ds:X509Certificate`.
    ///
    /// # Errors
    ///
    /// Returns an error if decoding or parsing fails.
    pub fn from_base64(encoded: &str) -> Result<Self, CertificateError> {
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let der = base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| CertificateError::Encoding(e.to_string()))?;
        Self::from_der(&der)
    }

    /// Creates a certificate from a PEM block.
    ///
    /// # Errors
    ///
    /// Returns an error if the PEM markers are missing or the body is invalid.
    pub fn from_pem(pem: &str) -> Result<Self, CertificateError> {
        let body = pem
            .lines()
            .skip_while(|line| !line.starts_with("-----BEGIN CERTIFICATE-----"))
            .skip(1)
            .take_while(|line| !line.starts_with("-----END CERTIFICATE-----"))
            .collect::<String>();
        if body.is_empty() {
            return Err(CertificateError::Encoding("missing PEM certificate block".to_string()));
        }
        Self::from_base64(&body)
    }

    /// Returns the DER bytes.
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns the certificate as base64 DER without line breaks.
    #[must_use]
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.der)
    }

    /// Returns the raw subject public key bits.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate cannot be parsed.
    pub fn public_key(&self) -> Result<Vec<u8>, CertificateError> {
        let (_, cert) = self.parse()?;
        Ok(cert.public_key().subject_public_key.data.to_vec())
    }

    /// Returns the public key family.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is neither EC nor RSA.
    pub fn key_type(&self) -> Result<KeyType, CertificateError> {
        let (_, cert) = self.parse()?;
        let oid = &cert.public_key().algorithm.algorithm;
        if *oid == OID_KEY_TYPE_EC_PUBLIC_KEY {
            Ok(KeyType::Ec)
        } else if *oid == OID_PKCS1_RSAENCRYPTION {
            Ok(KeyType::Rsa)
        } else {
            Err(CertificateError::UnsupportedKey(oid.to_id_string()))
        }
    }

    /// Returns the first `C=` value of the subject distinguished name.
    #[must_use]
    pub fn country(&self) -> Option<String> {
        let (_, cert) = self.parse().ok()?;
        let country = cert
            .subject()
            .iter_country()
            .next()
            .and_then(|attr| attr.as_str().ok())
            .map(str::to_string);
        country
    }

    /// Returns the subject distinguished name in RFC 4514 form.
    #[must_use]
    pub fn subject(&self) -> String {
        self.parse()
            .map(|(_, cert)| cert.subject().to_string())
            .unwrap_or_default()
    }

    fn parse(&self) -> Result<(&[u8], X509Certificate<'_>), CertificateError> {
        X509Certificate::from_der(&self.der).map_err(|e| CertificateError::Parse(e.to_string()))
    }
}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::self_signed;

    #[test]
    fn country_is_read_from_subject() {
        let (cert, _) = self_signed("ES");
        assert_eq!(cert.country().as_deref(), Some("ES"));
        assert!(cert.subject().contains("C=ES"));
    }

    #[test]
    fn base64_round_trip_tolerates_line_breaks() {
        let (cert, _) = self_signed("PT");
        let encoded = cert.to_base64();
        let wrapped: String = encoded
            .as_bytes()
            .chunks(64)
            .map(|chunk| format!("{}\n", String::from_utf8_lossy(chunk)))
            .collect();

        let decoded = Certificate::from_base64(&wrapped).expect("decode");
        assert_eq!(decoded, cert);
    }

    #[test]
    fn pem_is_accepted() {
        let (cert, _) = self_signed("IT");
        let pem = format!(
            "-----BEGIN CERTIFICATE-----\n{}\n-----END CERTIFICATE-----\n",
            cert.to_base64()
        );
        assert_eq!(Certificate::from_pem(&pem).expect("pem"), cert);
    }

    #[test]
    fn ec_key_type_is_detected() {
        let (cert, _) = self_signed("IT");
        assert_eq!(cert.key_type().expect("key type"), KeyType::Ec);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(Certificate::from_der(b"not a cert"), Err(CertificateError::Parse(_))));
        assert!(matches!(Certificate::from_base64("%%%"), Err(CertificateError::Encoding(_))));
        assert!(Certificate::from_pem("no markers").is_err());
    }
}
