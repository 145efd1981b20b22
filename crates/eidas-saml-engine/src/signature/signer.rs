//! XML Signature creation.

use base64::Engine;
use eidas_crypto::{hash, Certificate, KeyType, SignatureAlgorithm, SigningKey};

use super::{canonicalize, Signer, XmlSignatureValidator};
use crate::error::{EngineError, EngineResult};
use crate::types::{canonicalization_algorithms, ds, prefixes, transforms, SAML_NS, XMLDSIG_NS};
use crate::xml::Element;

/// Enveloped XML-DSig signer.
///
/// Signs with one key and embeds the matching certificate in `KeyInfo`.
/// Validation goes through an [`XmlSignatureValidator`] holding the node's
/// trust store.
#[derive(Debug)]
pub struct XmlSigner {
    key: SigningKey,
    certificate: Certificate,
    validator: XmlSignatureValidator,
}

impl XmlSigner {
    /// Creates a signer.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the certificate's key does not belong
    /// to the signing algorithm's family.
    pub fn new(
        key: SigningKey,
        certificate: Certificate,
        trusted_certificates: Vec<Certificate>,
    ) -> EngineResult<Self> {
        let key_type = certificate
            .key_type()
            .map_err(|e| EngineError::configuration(e.to_string()).with_source(e))?;
        let expected = if key.algorithm().is_ecdsa() {
            KeyType::Ec
        } else {
            KeyType::Rsa
        };
        if key_type != expected {
            return Err(EngineError::configuration(format!(
                "signing certificate holds a {key_type:?} key but the algorithm is {}",
                key.algorithm()
            )));
        }

        Ok(Self {
            key,
            certificate,
            validator: XmlSignatureValidator::new(trusted_certificates),
        })
    }

    /// Loads the key from PKCS#8 DER.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the key cannot be loaded or does not
    /// match the certificate.
    pub fn from_pkcs8(
        pkcs8_der: &[u8],
        algorithm: SignatureAlgorithm,
        certificate: Certificate,
        trusted_certificates: Vec<Certificate>,
    ) -> EngineResult<Self> {
        let key = SigningKey::from_pkcs8(pkcs8_der, algorithm)
            .map_err(|e| EngineError::configuration(e.to_string()).with_source(e))?;
        Self::new(key, certificate, trusted_certificates)
    }

    /// The certificate embedded in produced signatures.
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// The validator backing [`Signer::validate_signature`].
    #[must_use]
    pub fn validator(&self) -> &XmlSignatureValidator {
        &self.validator
    }

    fn signed_info(&self, id: &str, digest: &[u8]) -> Element {
        let algorithm = self.key.algorithm();
        let digest_value = base64::engine::general_purpose::STANDARD.encode(digest);

        ds("SignedInfo")
            .declare_namespace(prefixes::DS, XMLDSIG_NS)
            .with_child(
                ds("CanonicalizationMethod")
                    .with_attribute("Algorithm", canonicalization_algorithms::EXCLUSIVE_C14N),
            )
            .with_child(ds("SignatureMethod").with_attribute("Algorithm", algorithm.xml_dsig_uri()))
            .with_child(
                ds("Reference")
                    .with_attribute("URI", format!("#{id}"))
                    .with_child(
                        ds("Transforms")
                            .with_child(
                                ds("Transform")
                                    .with_attribute("Algorithm", transforms::ENVELOPED_SIGNATURE),
                            )
                            .with_child(ds("Transform").with_attribute(
                                "Algorithm",
                                canonicalization_algorithms::EXCLUSIVE_C14N,
                            )),
                    )
                    .with_child(
                        ds("DigestMethod")
                            .with_attribute("Algorithm", algorithm.hash_algorithm().xml_dsig_uri()),
                    )
                    .with_child(ds("DigestValue").with_text(digest_value)),
            )
    }
}

impl Signer for XmlSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        self.key.algorithm()
    }

    fn sign(&self, mut element: Element) -> EngineResult<Element> {
        let id = element
            .attribute("ID")
            .map(str::to_string)
            .ok_or_else(|| EngineError::internal(format!("{} has no ID to sign", element.name())))?;

        element.remove_child(XMLDSIG_NS, "Signature");
        let algorithm = self.key.algorithm();
        let digest = hash(algorithm.hash_algorithm(), &canonicalize(&element));

        let signed_info = self.signed_info(&id, &digest);
        let signature_value = self
            .key
            .sign(&canonicalize(&signed_info))
            .map_err(|e| EngineError::internal(e.to_string()).with_source(e))?;

        let signature = ds("Signature")
            .declare_namespace(prefixes::DS, XMLDSIG_NS)
            .with_child(signed_info)
            .with_child(
                ds("SignatureValue")
                    .with_text(base64::engine::general_purpose::STANDARD.encode(signature_value)),
            )
            .with_child(ds("KeyInfo").with_child(
                ds("X509Data").with_child(ds("X509Certificate").with_text(self.certificate.to_base64())),
            ));

        let position = element
            .position_of(SAML_NS, "Issuer")
            .map_or(0, |issuer| issuer + 1);
        element.insert_child(position, signature);

        tracing::debug!(id = %id, element = element.name(), %algorithm, "element signed");
        Ok(element)
    }

    fn validate_signature(
        &self,
        element: &Element,
        trusted: Option<&[Certificate]>,
    ) -> EngineResult<Certificate> {
        match trusted {
            Some(trusted) => XmlSignatureValidator::validate_with(element, trusted),
            None => self.validator.validate(element),
        }
    }
}
