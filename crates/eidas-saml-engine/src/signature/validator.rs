//! XML Signature validation.

use base64::Engine;
use eidas_crypto::{hash, verify_signature, Certificate};

use super::{canonicalize, invalid, XmlSignature};
use crate::error::EngineResult;
use crate::types::XMLDSIG_NS;
use crate::xml::Element;

/// XML signature validator.
///
/// Validates enveloped signatures against a fixed set of trusted
/// certificates. The certificate embedded in the signature must be
/// byte-for-byte one of them.
#[derive(Debug, Clone, Default)]
pub struct XmlSignatureValidator {
    trusted_certificates: Vec<Certificate>,
}

impl XmlSignatureValidator {
    /// Creates a validator with the given trusted certificates.
    #[must_use]
    pub fn new(trusted_certificates: Vec<Certificate>) -> Self {
        Self {
            trusted_certificates,
        }
    }

    /// The trusted certificates.
    #[must_use]
    pub fn trusted_certificates(&self) -> &[Certificate] {
        &self.trusted_certificates
    }

    /// Validates the enveloped signature of `element` against the trust store.
    ///
    /// # Errors
    ///
    /// See [`XmlSignatureValidator::validate_with`].
    pub fn validate(&self, element: &Element) -> EngineResult<Certificate> {
        Self::validate_with(element, &self.trusted_certificates)
    }

    /// Validates the enveloped signature of `element` against `trusted`.
    ///
    /// Checks, in order: a signature is present; its single reference points
    /// at the element's own `ID`; only the enveloped and exclusive-c14n
    /// transforms are used; the embedded certificate is trusted; the digest
    /// matches; the signature over `SignedInfo` verifies.
    ///
    /// # Errors
    ///
    /// Returns an `INVALID_SIGNATURE` validation error naming the failed check.
    pub fn validate_with(element: &Element, trusted: &[Certificate]) -> EngineResult<Certificate> {
        let signature_element = element
            .find_child(XMLDSIG_NS, "Signature")
            .ok_or_else(|| invalid("No signature"))?;
        let signature = XmlSignature::from_element(signature_element)?;

        let id = element
            .attribute("ID")
            .ok_or_else(|| invalid("signed element has no ID"))?;
        if signature.reference_uri != format!("#{id}") {
            return Err(invalid(format!(
                "signature reference {} does not point at the signed element",
                signature.reference_uri
            )));
        }
        if !signature.has_supported_transforms() {
            return Err(invalid("signature uses unsupported transforms"));
        }

        let certificate = find_certificate(&signature, trusted)?;
        verify_digest(element, &signature)?;

        let signature_bytes = base64::engine::general_purpose::STANDARD
            .decode(strip_whitespace(&signature.signature_value))
            .map_err(|e| invalid(format!("invalid signature encoding: {e}")).with_source(e))?;
        let public_key = certificate
            .public_key()
            .map_err(|e| invalid(e.to_string()).with_source(e))?;
        verify_signature(
            signature.algorithm,
            &public_key,
            &canonicalize(&signature.signed_info),
            &signature_bytes,
        )
        .map_err(|e| invalid(e.to_string()).with_source(e))?;

        tracing::debug!(
            id,
            algorithm = %signature.algorithm,
            signer = %certificate.subject(),
            "signature validated"
        );
        Ok(certificate)
    }
}

fn find_certificate(signature: &XmlSignature, trusted: &[Certificate]) -> EngineResult<Certificate> {
    let embedded = signature
        .x509_certificate
        .as_deref()
        .ok_or_else(|| invalid("signature carries no certificate"))?;
    let certificate = Certificate::from_base64(embedded)
        .map_err(|e| invalid(format!("invalid certificate: {e}")).with_source(e))?;

    if trusted.iter().any(|candidate| candidate == &certificate) {
        Ok(certificate)
    } else {
        Err(invalid(format!(
            "certificate {} is not trusted",
            certificate.subject()
        )))
    }
}

fn verify_digest(element: &Element, signature: &XmlSignature) -> EngineResult<()> {
    let mut unsigned = element.clone();
    unsigned.remove_child(XMLDSIG_NS, "Signature");

    let calculated = hash(signature.digest_algorithm, &canonicalize(&unsigned));
    let expected = base64::engine::general_purpose::STANDARD
        .decode(strip_whitespace(&signature.digest_value))
        .map_err(|e| invalid(format!("invalid digest encoding: {e}")).with_source(e))?;

    if calculated == expected {
        Ok(())
    } else {
        Err(invalid("Digest value mismatch"))
    }
}

fn strip_whitespace(value: &str) -> String {
    value.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}
