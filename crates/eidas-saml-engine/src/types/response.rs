//! SAML Response types.
//!
//! Response messages sent by a proxy service back to the connector.

use chrono::{DateTime, Utc};

use super::{
    ds, encryption_algorithms, expect, format_instant, issuer, issuer_of, parse_instant,
    prefixes, required_attribute, saml, samlp, signature_certificate, xenc, Assertion, SamlObject,
    Status, SAMLP_NS, SAML_NS, SAML_VERSION, XMLDSIG_NS, XMLENC_NS,
};
use crate::error::{EngineError, EngineResult};
use crate::xml::Element;

/// SAML Response.
#[derive(Debug, Clone)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the node that issued this response.
    pub issuer: String,

    /// The ID of the request this response is for.
    pub in_response_to: Option<String>,

    /// The URL where this response was sent.
    pub destination: Option<String>,

    /// The consent obtained for this response.
    pub consent: Option<String>,

    /// The status of the response.
    pub status: Status,

    /// The assertions in this response.
    pub assertions: Vec<Assertion>,

    /// Encrypted assertions in this response.
    pub encrypted_assertions: Vec<EncryptedAssertion>,

    /// Whether the response carried an enveloped signature when read.
    pub signed: bool,

    /// Base64 certificate from the signature's `KeyInfo`, when read.
    pub signature_certificate: Option<String>,
}

impl Response {
    /// Creates a response with the given status.
    #[must_use]
    pub fn new(issuer: impl Into<String>, status: Status, issue_instant: DateTime<Utc>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: SAML_VERSION.to_string(),
            issue_instant,
            issuer: issuer.into(),
            in_response_to: None,
            destination: None,
            consent: None,
            status,
            assertions: Vec::new(),
            encrypted_assertions: Vec::new(),
            signed: false,
            signature_certificate: None,
        }
    }

    /// Sets the request ID this response is for.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the consent URI.
    #[must_use]
    pub fn with_consent(mut self, consent: impl Into<String>) -> Self {
        self.consent = Some(consent.into());
        self
    }

    /// Adds an assertion to this response.
    #[must_use]
    pub fn with_assertion(mut self, assertion: Assertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Gets the first assertion if present.
    #[must_use]
    pub fn first_assertion(&self) -> Option<&Assertion> {
        self.assertions.first()
    }
}

impl SamlObject for Response {
    fn to_element(&self) -> Element {
        let mut element = samlp("Response")
            .declare_namespace(prefixes::SAML2P, SAMLP_NS)
            .declare_namespace(prefixes::SAML2, SAML_NS)
            .with_attribute("ID", self.id.as_str())
            .with_attribute("Version", self.version.as_str())
            .with_attribute("IssueInstant", format_instant(self.issue_instant))
            .with_optional_attribute("Destination", self.destination.as_deref())
            .with_optional_attribute("Consent", self.consent.as_deref())
            .with_optional_attribute("InResponseTo", self.in_response_to.as_deref())
            .with_child(issuer(&self.issuer))
            .with_child(self.status.to_element());
        for assertion in &self.assertions {
            element.push_child(assertion.to_element());
        }
        for encrypted in &self.encrypted_assertions {
            element.push_child(encrypted.to_element());
        }
        element
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAMLP_NS, "Response")?;
        let status = element
            .find_child(SAMLP_NS, "Status")
            .ok_or_else(|| EngineError::validation("Response is missing Status"))
            .and_then(Status::from_element)?;
        Ok(Self {
            id: required_attribute(element, "ID")?.to_string(),
            version: required_attribute(element, "Version")?.to_string(),
            issue_instant: parse_instant(required_attribute(element, "IssueInstant")?)?,
            issuer: issuer_of(element).unwrap_or_default(),
            in_response_to: element.attribute("InResponseTo").map(str::to_string),
            destination: element.attribute("Destination").map(str::to_string),
            consent: element.attribute("Consent").map(str::to_string),
            status,
            assertions: element
                .find_children(SAML_NS, "Assertion")
                .map(Assertion::from_element)
                .collect::<EngineResult<_>>()?,
            encrypted_assertions: element
                .find_children(SAML_NS, "EncryptedAssertion")
                .map(EncryptedAssertion::from_element)
                .collect::<EngineResult<_>>()?,
            signed: element.find_child(XMLDSIG_NS, "Signature").is_some(),
            signature_certificate: signature_certificate(element),
        })
    }
}

/// Encrypted assertion.
///
/// Carries an assertion sealed under a named symmetric key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedAssertion {
    /// The encrypted data.
    pub encrypted_data: EncryptedData,
}

/// `xenc:EncryptedData` contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedData {
    /// Block encryption algorithm URI.
    pub encryption_method: String,

    /// Name of the key the data was sealed with.
    pub key_name: Option<String>,

    /// Base64 of nonce, ciphertext and tag.
    pub cipher_value: String,
}

impl EncryptedAssertion {
    /// Creates an AES-256-GCM encrypted assertion.
    #[must_use]
    pub fn aes_gcm(key_name: impl Into<String>, cipher_value: impl Into<String>) -> Self {
        Self {
            encrypted_data: EncryptedData {
                encryption_method: encryption_algorithms::AES256_GCM.to_string(),
                key_name: Some(key_name.into()),
                cipher_value: cipher_value.into(),
            },
        }
    }
}

impl SamlObject for EncryptedAssertion {
    fn to_element(&self) -> Element {
        let data = &self.encrypted_data;
        let encrypted_data = xenc("EncryptedData")
            .declare_namespace(prefixes::XENC, XMLENC_NS)
            .with_attribute("Type", encryption_algorithms::TYPE_ELEMENT)
            .with_child(
                xenc("EncryptionMethod").with_attribute("Algorithm", data.encryption_method.as_str()),
            )
            .with_optional_child(data.key_name.as_ref().map(|key_name| {
                ds("KeyInfo")
                    .declare_namespace(prefixes::DS, XMLDSIG_NS)
                    .with_child(ds("KeyName").with_text(key_name.as_str()))
            }))
            .with_child(
                xenc("CipherData")
                    .with_child(xenc("CipherValue").with_text(data.cipher_value.as_str())),
            );
        saml("EncryptedAssertion").with_child(encrypted_data)
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "EncryptedAssertion")?;
        let data = element
            .find_child(XMLENC_NS, "EncryptedData")
            .ok_or_else(|| EngineError::validation("EncryptedAssertion is missing EncryptedData"))?;
        let encryption_method = data
            .find_child(XMLENC_NS, "EncryptionMethod")
            .ok_or_else(|| EngineError::validation("EncryptedData is missing EncryptionMethod"))
            .and_then(|method| required_attribute(method, "Algorithm"))?
            .to_string();
        let key_name = data
            .find_child(XMLDSIG_NS, "KeyInfo")
            .and_then(|key_info| key_info.child_text(XMLDSIG_NS, "KeyName"));
        let cipher_value = data
            .find_child(XMLENC_NS, "CipherData")
            .and_then(|cipher| cipher.child_text(XMLENC_NS, "CipherValue"))
            .ok_or_else(|| EngineError::validation("EncryptedData is missing CipherValue"))?;
        Ok(Self {
            encrypted_data: EncryptedData {
                encryption_method,
                key_name,
                cipher_value,
            },
        })
    }
}
