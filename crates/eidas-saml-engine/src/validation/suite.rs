//! Named validator suites.
//!
//! A suite is a set of structural or business rules applied to a parsed
//! message. Suites are registered under an ID once at startup; the engine
//! resolves the IDs it needs when it is built and never mutates the
//! registry afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::types::{AuthnContextComparison, AuthnRequest, Response, SAML_VERSION};

/// ID of the SAML core schema suite.
pub const CORE_SCHEMA_VALIDATOR_ID: &str = "saml2-core-schema-validator";

/// ID of the eIDAS request suite.
pub const REQUEST_VALIDATOR_ID: &str = "eidas-request-validator";

/// ID of the eIDAS response suite.
pub const RESPONSE_VALIDATOR_ID: &str = "eidas-response-validator";

/// A parsed message handed to a suite.
#[derive(Debug, Clone, Copy)]
pub enum SamlMessage<'a> {
    /// An authentication request.
    Request(&'a AuthnRequest),
    /// A response.
    Response(&'a Response),
}

impl SamlMessage<'_> {
    /// Element name, for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Request(_) => "AuthnRequest",
            Self::Response(_) => "Response",
        }
    }
}

/// A named set of validation rules.
pub trait ValidatorSuite: Send + Sync {
    /// Registry ID.
    fn id(&self) -> &str;

    /// Applies the rules.
    ///
    /// # Errors
    ///
    /// Fails with a validation error naming the first broken rule.
    fn validate(&self, message: SamlMessage<'_>) -> EngineResult<()>;
}

/// Immutable map from suite ID to suite.
#[derive(Clone)]
pub struct ValidatorRegistry {
    suites: HashMap<String, Arc<dyn ValidatorSuite>>,
}

impl ValidatorRegistry {
    /// An empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            suites: HashMap::new(),
        }
    }

    /// Registers a suite under its own ID, replacing any previous one.
    #[must_use]
    pub fn with_suite(mut self, suite: Arc<dyn ValidatorSuite>) -> Self {
        self.suites.insert(suite.id().to_string(), suite);
        self
    }

    /// Looks up a suite.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown ID.
    pub fn get(&self, id: &str) -> EngineResult<Arc<dyn ValidatorSuite>> {
        self.suites
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::configuration(format!("unknown validator suite {id}")))
    }

    /// Registered IDs, sorted.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<_> = self.suites.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for ValidatorRegistry {
    /// The three built-in suites.
    fn default() -> Self {
        Self::empty()
            .with_suite(Arc::new(CoreSchemaSuite))
            .with_suite(Arc::new(EidasRequestSuite))
            .with_suite(Arc::new(EidasResponseSuite))
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorRegistry")
            .field("suites", &self.ids())
            .finish()
    }
}

/// Required identifiers and parts of the SAML core schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoreSchemaSuite;

impl ValidatorSuite for CoreSchemaSuite {
    fn id(&self) -> &str {
        CORE_SCHEMA_VALIDATOR_ID
    }

    fn validate(&self, message: SamlMessage<'_>) -> EngineResult<()> {
        match message {
            SamlMessage::Request(request) => {
                require(!request.id.is_empty(), "AuthnRequest ID is required")?;
                require(!request.issuer.trim().is_empty(), "AuthnRequest Issuer is required")?;
                require(request.version == SAML_VERSION, "AuthnRequest Version must be 2.0")
            }
            SamlMessage::Response(response) => {
                require(!response.id.is_empty(), "Response ID is required")?;
                require(!response.issuer.trim().is_empty(), "Response Issuer is required")?;
                require(response.version == SAML_VERSION, "Response Version must be 2.0")?;
                require(
                    !response.status.status_code.value.trim().is_empty(),
                    "StatusCode Value is required",
                )?;
                for assertion in &response.assertions {
                    require(!assertion.id.is_empty(), "Assertion ID is required")?;
                    require(!assertion.issuer.trim().is_empty(), "Assertion Issuer is required")?;
                    require(assertion.version == SAML_VERSION, "Assertion Version must be 2.0")?;
                    if let Some(statement) = &assertion.attribute_statement {
                        require(
                            statement.attributes.iter().all(|attribute| !attribute.name.is_empty()),
                            "Attribute Name is required",
                        )?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// eIDAS rules for authentication requests.
#[derive(Debug, Clone, Copy, Default)]
pub struct EidasRequestSuite;

impl ValidatorSuite for EidasRequestSuite {
    fn id(&self) -> &str {
        REQUEST_VALIDATOR_ID
    }

    fn validate(&self, message: SamlMessage<'_>) -> EngineResult<()> {
        let SamlMessage::Request(request) = message else {
            return Err(EngineError::validation(format!(
                "{REQUEST_VALIDATOR_ID} cannot validate a {}",
                message.kind()
            )));
        };

        require(
            request.destination.as_deref().is_some_and(|d| !d.trim().is_empty()),
            "Destination is required",
        )?;
        require(
            !request.requested_attributes().is_empty(),
            "at least one RequestedAttribute is required",
        )?;
        require(request.force_authn, "ForceAuthn must be true")?;
        require(!request.is_passive, "IsPassive must not be true")?;

        let context = request
            .requested_authn_context
            .as_ref()
            .ok_or_else(|| EngineError::validation("RequestedAuthnContext is required"))?;
        require(
            context.comparison == AuthnContextComparison::Minimum,
            "RequestedAuthnContext comparison must be minimum",
        )?;
        require(
            !context.authn_context_class_refs.is_empty(),
            "a level of assurance is required",
        )
    }
}

/// eIDAS rules for responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct EidasResponseSuite;

impl ValidatorSuite for EidasResponseSuite {
    fn id(&self) -> &str {
        RESPONSE_VALIDATOR_ID
    }

    fn validate(&self, message: SamlMessage<'_>) -> EngineResult<()> {
        let SamlMessage::Response(response) = message else {
            return Err(EngineError::validation(format!(
                "{RESPONSE_VALIDATOR_ID} cannot validate a {}",
                message.kind()
            )));
        };

        require(
            response.in_response_to.as_deref().is_some_and(|id| !id.is_empty()),
            "InResponseTo is required",
        )?;
        let assertion_count = response.assertions.len() + response.encrypted_assertions.len();
        if response.is_success() {
            require(assertion_count > 0, "a success response must carry an assertion")
        } else {
            require(assertion_count == 0, "a failure response must not carry assertions")
        }
    }
}

fn require(condition: bool, message: &str) -> EngineResult<()> {
    if condition {
        Ok(())
    } else {
        Err(EngineError::validation(message))
    }
}
