//! Responses between the cryptographic and the semantic stage.

use std::fmt;

use eidas_crypto::Certificate;

use crate::types::Response;

/// Stage a received response has reached.
///
/// Stages are passed strictly in declaration order; a failed transition
/// ends processing of the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResponseValidationState {
    /// Bytes accepted for processing.
    Received,
    /// Grammar check passed.
    SchemaValid,
    /// Response signature, decryption and assertion signatures passed.
    SignatureValidAndDecrypted,
    /// Core schema suite passed.
    CoreSchemaValid,
    /// Protocol suite passed.
    SuiteValid,
    /// Assertion rules passed.
    SemanticallyValid,
}

impl ResponseValidationState {
    /// Returns the state name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Received => "received",
            Self::SchemaValid => "schema_valid",
            Self::SignatureValidAndDecrypted => "signature_valid_and_decrypted",
            Self::CoreSchemaValid => "core_schema_valid",
            Self::SuiteValid => "suite_valid",
            Self::SemanticallyValid => "semantically_valid",
        }
    }
}

impl fmt::Display for ResponseValidationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A response that passed schema, signature and suite validation but not
/// yet the assertion rules.
///
/// It can be logged and correlated with the request it answers. The only
/// way to read attributes out of it is
/// [`ProtocolEngine::validate_unmarshalled_response`](super::ProtocolEngine::validate_unmarshalled_response),
/// which consumes it.
#[derive(Debug, Clone)]
pub struct CorrelatedResponse {
    response: Response,
    country: Option<String>,
}

impl CorrelatedResponse {
    pub(crate) fn new(response: Response) -> Self {
        let country = response
            .signature_certificate
            .as_deref()
            .and_then(|encoded| Certificate::from_base64(encoded).ok())
            .and_then(|certificate| certificate.country());
        Self { response, country }
    }

    /// Response ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.response.id
    }

    /// ID of the request this response answers.
    #[must_use]
    pub fn in_response_to(&self) -> Option<&str> {
        self.response.in_response_to.as_deref()
    }

    /// Entity ID of the responding node.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.response.issuer
    }

    /// Country of the certificate that signed the response.
    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// True if the response carries a success status.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response.is_success()
    }

    pub(crate) fn into_response(self) -> Response {
        self.response
    }
}
