//! Engine error types.
//!
//! Every public operation of the engine fails with [`EngineError`]. Errors
//! raised by collaborators (XML reader, signature library, certificate
//! parser) are converted where they occur and kept only as the error source,
//! so callers never match on a collaborator's native error type.

use std::fmt;

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Boxed collaborator error retained as context.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// A hardened parser or serializer could not be configured.
    ConfigurationError,
    /// Input is not well-formed XML.
    MalformedXml,
    /// A DOM could not be written out.
    SerializationError,
    /// Schema, suite or semantic rule failure.
    MessageValidationError,
    /// The message signature is missing or does not verify.
    InvalidSignature,
    /// An assertion signature does not verify.
    InvalidAssertionSignature,
    /// An encrypted assertion could not be decrypted.
    DecryptionError,
    /// Missing argument or violated internal post-condition.
    InternalError,
}

impl ErrorCode {
    /// Returns the code as it appears in logs and error responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ConfigurationError => "CONFIGURATION_ERROR",
            Self::MalformedXml => "MALFORMED_XML",
            Self::SerializationError => "SERIALIZATION_ERROR",
            Self::MessageValidationError => "MESSAGE_VALIDATION_ERROR",
            Self::InvalidSignature => "INVALID_SIGNATURE",
            Self::InvalidAssertionSignature => "INVALID_ASSERTION_SIGNATURE",
            Self::DecryptionError => "DECRYPTION_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A hardened parser, serializer or engine component could not be built.
    #[error("configuration error: {message}")]
    Configuration {
        /// What could not be configured.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// Input is not well-formed (or uses a forbidden construct).
    #[error("malformed XML: {message}")]
    MalformedXml {
        /// Parser diagnostic.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// Writing a DOM to bytes failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Writer diagnostic.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// A validation stage rejected the message.
    #[error("{code}: {message}")]
    Validation {
        /// Machine-readable code.
        code: ErrorCode,
        /// Which rule failed.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },

    /// A required argument was absent or an internal invariant was violated.
    #[error("{code}: {message}")]
    Internal {
        /// Machine-readable code.
        code: ErrorCode,
        /// Description of the violation.
        message: String,
        /// Underlying cause.
        #[source]
        source: Option<BoxError>,
    },
}

impl EngineError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a malformed-XML error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedXml {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a validation error with the generic message-validation code.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::validation_with_code(ErrorCode::MessageValidationError, message)
    }

    /// Creates a validation error with a specific code.
    pub fn validation_with_code(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            code: ErrorCode::InternalError,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches an underlying cause.
    #[must_use]
    pub fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        let cause = Some(cause.into());
        match &mut self {
            Self::Configuration { source, .. }
            | Self::MalformedXml { source, .. }
            | Self::Serialization { source, .. }
            | Self::Validation { source, .. }
            | Self::Internal { source, .. } => *source = cause,
        }
        self
    }

    /// Returns the machine-readable code.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Configuration { .. } => ErrorCode::ConfigurationError,
            Self::MalformedXml { .. } => ErrorCode::MalformedXml,
            Self::Serialization { .. } => ErrorCode::SerializationError,
            Self::Validation { code, .. } | Self::Internal { code, .. } => *code,
        }
    }

    /// Returns the human-readable message without the code prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Configuration { message, .. }
            | Self::MalformedXml { message, .. }
            | Self::Serialization { message, .. }
            | Self::Validation { message, .. }
            | Self::Internal { message, .. } => message,
        }
    }

    /// Returns true for validation failures.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Re-raises any non-validation error as a validation error with `code`,
    /// keeping the original as the source. Validation errors pass through.
    #[must_use]
    pub fn into_validation(self, code: ErrorCode) -> Self {
        if self.is_validation() {
            return self;
        }
        let message = self.message().to_string();
        Self::validation_with_code(code, message).with_source(self)
    }

    /// Returns the SAML status code an error response for this error carries.
    ///
    /// Maps errors to status codes as defined in SAML 2.0 Core section 3.2.2.2.
    #[must_use]
    pub const fn status_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } | Self::MalformedXml { .. } => {
                "urn:oasis:names:tc:SAML:2.0:status:Requester"
            }
            _ => "urn:oasis:names:tc:SAML:2.0:status:Responder",
        }
    }
}

impl From<quick_xml::Error> for EngineError {
    fn from(err: quick_xml::Error) -> Self {
        Self::malformed(err.to_string()).with_source(err)
    }
}

impl From<base64::DecodeError> for EngineError {
    fn from(err: base64::DecodeError) -> Self {
        Self::validation(format!("base64 decode error: {err}")).with_source(err)
    }
}

impl From<eidas_crypto::CertificateError> for EngineError {
    fn from(err: eidas_crypto::CertificateError) -> Self {
        Self::validation_with_code(ErrorCode::InvalidSignature, err.to_string()).with_source(err)
    }
}
