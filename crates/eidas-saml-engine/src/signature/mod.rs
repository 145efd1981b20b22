//! XML Signature support for SAML.
//!
//! Enveloped XML-DSig over the engine's DOM. Requests, responses and
//! assertions are signed in place: the `ds:Signature` element goes right
//! after `Issuer` and references its parent by ID.
//!
//! # Signing Algorithms
//!
//! Signature and digest methods come from [`eidas_crypto::SignatureAlgorithm`]:
//! - ECDSA-SHA256/384/512
//! - RSA-SHA256/384/512 (PKCS#1 v1.5 and PSS)
//!
//! SHA-1 signature or digest methods are rejected on validation.

mod canonical;
mod signer;
mod validator;

pub use canonical::canonicalize;
pub use signer::XmlSigner;
pub use validator::XmlSignatureValidator;

use eidas_crypto::{Certificate, HashAlgorithm, SignatureAlgorithm};

use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::types::{canonicalization_algorithms, transforms, XMLDSIG_NS};
use crate::xml::Element;

/// Signs and validates SAML elements.
pub trait Signer: Send + Sync {
    /// Algorithm of the signing key.
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Returns `element` with an enveloped signature over it.
    ///
    /// # Errors
    ///
    /// Fails if the element has no `ID` or the key cannot sign.
    fn sign(&self, element: Element) -> EngineResult<Element>;

    /// Validates the enveloped signature of `element`.
    ///
    /// When `trusted` is given, the signing certificate must be one of
    /// those; otherwise the signer's own trust store applies. Returns the
    /// certificate that produced the signature.
    ///
    /// # Errors
    ///
    /// Fails with `INVALID_SIGNATURE` if the signature is absent, does not
    /// verify, or was made by an untrusted certificate.
    fn validate_signature(
        &self,
        element: &Element,
        trusted: Option<&[Certificate]>,
    ) -> EngineResult<Certificate>;
}

/// A `ds:Signature` element as read from a document.
#[derive(Debug, Clone)]
pub struct XmlSignature {
    /// The signature algorithm used.
    pub algorithm: SignatureAlgorithm,
    /// The digest algorithm of the single reference.
    pub digest_algorithm: HashAlgorithm,
    /// The reference URI (`#` followed by the signed element's ID).
    pub reference_uri: String,
    /// Transform algorithm URIs in order.
    pub transforms: Vec<String>,
    /// The digest value (base64 encoded).
    pub digest_value: String,
    /// The signature value (base64 encoded).
    pub signature_value: String,
    /// Embedded X.509 certificate (base64 encoded, DER format).
    pub x509_certificate: Option<String>,
    /// The `SignedInfo` element exactly as received.
    pub signed_info: Element,
}

impl XmlSignature {
    /// Reads a `ds:Signature` element.
    ///
    /// # Errors
    ///
    /// Fails with `INVALID_SIGNATURE` if a required part is missing, an
    /// algorithm is unknown or SHA-1 based, or more than one reference is
    /// present.
    pub fn from_element(signature: &Element) -> EngineResult<Self> {
        let signed_info = signature
            .find_child(XMLDSIG_NS, "SignedInfo")
            .ok_or_else(|| invalid("Signature is missing SignedInfo"))?;

        let canonicalization = algorithm_of(signed_info, "CanonicalizationMethod")?;
        if canonicalization != canonicalization_algorithms::EXCLUSIVE_C14N {
            return Err(invalid(format!(
                "unsupported canonicalization method {canonicalization}"
            )));
        }

        let algorithm = SignatureAlgorithm::from_xml_dsig_uri(algorithm_of(
            signed_info,
            "SignatureMethod",
        )?)
        .map_err(|e| invalid(e.to_string()).with_source(e))?;

        let mut references = signed_info.find_children(XMLDSIG_NS, "Reference");
        let reference = references
            .next()
            .ok_or_else(|| invalid("SignedInfo has no Reference"))?;
        if references.next().is_some() {
            return Err(invalid("SignedInfo must have exactly one Reference"));
        }

        let digest_algorithm = HashAlgorithm::from_xml_dsig_uri(algorithm_of(reference, "DigestMethod")?)
            .map_err(|e| invalid(e.to_string()).with_source(e))?;

        let transforms = reference
            .find_child(XMLDSIG_NS, "Transforms")
            .map(|transforms| {
                transforms
                    .find_children(XMLDSIG_NS, "Transform")
                    .filter_map(|transform| transform.attribute("Algorithm"))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let x509_certificate = signature
            .find_child(XMLDSIG_NS, "KeyInfo")
            .and_then(|key_info| key_info.find_child(XMLDSIG_NS, "X509Data"))
            .and_then(|data| data.child_text(XMLDSIG_NS, "X509Certificate"));

        Ok(Self {
            algorithm,
            digest_algorithm,
            reference_uri: reference.attribute("URI").unwrap_or_default().to_string(),
            transforms,
            digest_value: reference
                .child_text(XMLDSIG_NS, "DigestValue")
                .ok_or_else(|| invalid("Reference is missing DigestValue"))?,
            signature_value: signature
                .child_text(XMLDSIG_NS, "SignatureValue")
                .ok_or_else(|| invalid("Signature is missing SignatureValue"))?,
            x509_certificate,
            signed_info: signed_info.clone(),
        })
    }

    /// Returns true if only the transforms the signer emits are listed.
    #[must_use]
    pub fn has_supported_transforms(&self) -> bool {
        self.transforms.iter().all(|transform| {
            transform == transforms::ENVELOPED_SIGNATURE
                || transform == canonicalization_algorithms::EXCLUSIVE_C14N
        })
    }
}

fn algorithm_of<'a>(parent: &'a Element, local_name: &str) -> EngineResult<&'a str> {
    parent
        .find_child(XMLDSIG_NS, local_name)
        .and_then(|method| method.attribute("Algorithm"))
        .ok_or_else(|| invalid(format!("{local_name} is missing Algorithm")))
}

pub(crate) fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::validation_with_code(ErrorCode::InvalidSignature, message)
}
