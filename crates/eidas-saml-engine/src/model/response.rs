//! Semantic authentication response and status.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::types::{status_codes, Status};

/// Attribute values keyed by attribute name URI.
pub type AttributeMap = BTreeMap<String, Vec<String>>;

/// Outcome of a protocol exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseStatus {
    status_code: String,
    sub_status_code: Option<String>,
    status_message: Option<String>,
    failure: bool,
}

impl ResponseStatus {
    /// Builds a status; failure is derived from the code.
    #[must_use]
    pub fn new(
        status_code: impl Into<String>,
        sub_status_code: Option<String>,
        status_message: Option<String>,
    ) -> Self {
        let status_code = status_code.into();
        Self {
            failure: status_code != status_codes::SUCCESS,
            status_code,
            sub_status_code,
            status_message,
        }
    }

    /// The success status.
    #[must_use]
    pub fn success() -> Self {
        Self::new(status_codes::SUCCESS, None, None)
    }

    /// A failure status with a message.
    #[must_use]
    pub fn failure(
        status_code: impl Into<String>,
        sub_status_code: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(status_code, sub_status_code, Some(message.into()))
    }

    /// Top-level status code URI.
    #[must_use]
    pub fn status_code(&self) -> &str {
        &self.status_code
    }

    /// Second-level status code URI.
    #[must_use]
    pub fn sub_status_code(&self) -> Option<&str> {
        self.sub_status_code.as_deref()
    }

    /// Human-readable message.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    /// True unless the top-level code is success.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.failure
    }
}

impl From<&Status> for ResponseStatus {
    fn from(status: &Status) -> Self {
        Self::new(
            status.status_code.value.as_str(),
            status.status_code.sub_status_value().map(str::to_string),
            status.status_message.clone(),
        )
    }
}

/// An eIDAS authentication response as the caller sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResponse {
    id: String,
    in_response_to: String,
    issuer: String,
    status: ResponseStatus,
    attributes: AttributeMap,
    subject: Option<String>,
    subject_name_id_format: Option<String>,
    level_of_assurance: Option<String>,
    ip_address: Option<String>,
    ip_address_required: bool,
    audience_restriction: Option<String>,
    country: Option<String>,
    not_before: Option<DateTime<Utc>>,
    not_on_or_after: Option<DateTime<Utc>>,
}

impl AuthenticationResponse {
    /// Starts a response to the request with the given ID.
    #[must_use]
    pub fn builder(
        issuer: impl Into<String>,
        in_response_to: impl Into<String>,
    ) -> AuthenticationResponseBuilder {
        AuthenticationResponseBuilder::new(issuer, in_response_to)
    }

    /// Response ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// ID of the request being answered.
    #[must_use]
    pub fn in_response_to(&self) -> &str {
        &self.in_response_to
    }

    /// Entity ID of the responding node.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Outcome.
    #[must_use]
    pub const fn status(&self) -> &ResponseStatus {
        &self.status
    }

    /// Shorthand for `status().is_failure()`.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        self.status.is_failure()
    }

    /// Attribute values about the citizen.
    #[must_use]
    pub const fn attributes(&self) -> &AttributeMap {
        &self.attributes
    }

    /// Subject name ID value.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Subject name ID format URI.
    #[must_use]
    pub fn subject_name_id_format(&self) -> Option<&str> {
        self.subject_name_id_format.as_deref()
    }

    /// Level of assurance the citizen was authenticated at.
    #[must_use]
    pub fn level_of_assurance(&self) -> Option<&str> {
        self.level_of_assurance.as_deref()
    }

    /// Address the assertion is bound to.
    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    /// Whether generating this response requires a user agent address.
    #[must_use]
    pub const fn ip_address_required(&self) -> bool {
        self.ip_address_required
    }

    /// Audience the assertion was restricted to.
    #[must_use]
    pub fn audience_restriction(&self) -> Option<&str> {
        self.audience_restriction.as_deref()
    }

    /// Country of the responding node, from its signing certificate.
    #[must_use]
    pub fn country(&self) -> Option<&str> {
        self.country.as_deref()
    }

    /// Start of the assertion validity window.
    #[must_use]
    pub const fn not_before(&self) -> Option<DateTime<Utc>> {
        self.not_before
    }

    /// End of the assertion validity window.
    #[must_use]
    pub const fn not_on_or_after(&self) -> Option<DateTime<Utc>> {
        self.not_on_or_after
    }
}

/// Builder for [`AuthenticationResponse`].
#[derive(Debug, Clone)]
pub struct AuthenticationResponseBuilder {
    response: AuthenticationResponse,
}

impl AuthenticationResponseBuilder {
    /// Creates a success response with a generated ID.
    #[must_use]
    pub fn new(issuer: impl Into<String>, in_response_to: impl Into<String>) -> Self {
        Self {
            response: AuthenticationResponse {
                id: format!("_id{}", uuid::Uuid::new_v4()),
                in_response_to: in_response_to.into(),
                issuer: issuer.into(),
                status: ResponseStatus::success(),
                attributes: AttributeMap::new(),
                subject: None,
                subject_name_id_format: None,
                level_of_assurance: None,
                ip_address: None,
                ip_address_required: false,
                audience_restriction: None,
                country: None,
                not_before: None,
                not_on_or_after: None,
            },
        }
    }

    /// Overrides the generated ID.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.response.id = id.into();
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn status(mut self, status: ResponseStatus) -> Self {
        self.response.status = status;
        self
    }

    /// Adds values for an attribute.
    #[must_use]
    pub fn attribute(mut self, name: impl Into<String>, values: Vec<String>) -> Self {
        self.response
            .attributes
            .entry(name.into())
            .or_default()
            .extend(values);
        self
    }

    /// Replaces all attributes.
    #[must_use]
    pub fn attributes(mut self, attributes: AttributeMap) -> Self {
        self.response.attributes = attributes;
        self
    }

    /// Sets the subject name ID.
    #[must_use]
    pub fn subject(mut self, value: impl Into<String>, format: Option<String>) -> Self {
        self.response.subject = Some(value.into());
        self.response.subject_name_id_format = format;
        self
    }

    /// Sets the level of assurance URI.
    #[must_use]
    pub fn level_of_assurance(mut self, uri: impl Into<String>) -> Self {
        self.response.level_of_assurance = Some(uri.into());
        self
    }

    /// Sets the bound user agent address.
    #[must_use]
    pub fn ip_address(mut self, address: impl Into<String>) -> Self {
        self.response.ip_address = Some(address.into());
        self
    }

    /// Requires an address when the response is generated.
    #[must_use]
    pub const fn ip_address_required(mut self, required: bool) -> Self {
        self.response.ip_address_required = required;
        self
    }

    /// Sets the audience restriction.
    #[must_use]
    pub fn audience_restriction(mut self, audience: impl Into<String>) -> Self {
        self.response.audience_restriction = Some(audience.into());
        self
    }

    /// Sets the responding country.
    #[must_use]
    pub fn country(mut self, country: Option<String>) -> Self {
        self.response.country = country;
        self
    }

    /// Sets the validity window.
    #[must_use]
    pub const fn validity(
        mut self,
        not_before: Option<DateTime<Utc>>,
        not_on_or_after: Option<DateTime<Utc>>,
    ) -> Self {
        self.response.not_before = not_before;
        self.response.not_on_or_after = not_on_or_after;
        self
    }

    /// Finishes the response.
    #[must_use]
    pub fn build(self) -> AuthenticationResponse {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{natural_person, sub_status_codes, StatusCode};

    #[test]
    fn failure_is_derived_from_code() {
        assert!(!ResponseStatus::success().is_failure());
        let status = ResponseStatus::failure(
            status_codes::RESPONDER,
            Some(sub_status_codes::AUTHN_FAILED.to_string()),
            "cancelled",
        );
        assert!(status.is_failure());
        assert_eq!(status.sub_status_code(), Some(sub_status_codes::AUTHN_FAILED));
    }

    #[test]
    fn status_projection_passes_sub_code_through() {
        let status = Status {
            status_code: StatusCode::new(status_codes::REQUESTER)
                .with_sub_status(StatusCode::new(sub_status_codes::REQUEST_DENIED)),
            status_message: None,
        };
        let projected = ResponseStatus::from(&status);
        assert!(projected.is_failure());
        assert_eq!(projected.sub_status_code(), Some(sub_status_codes::REQUEST_DENIED));
        assert_eq!(projected.status_message(), None);
    }

    #[test]
    fn attribute_values_accumulate() {
        let response = AuthenticationResponse::builder("https://proxy.example.eu", "_req1")
            .attribute(natural_person::CURRENT_GIVEN_NAME, vec!["Jan".to_string()])
            .attribute(natural_person::CURRENT_GIVEN_NAME, vec!["Petr".to_string()])
            .build();
        assert_eq!(
            response.attributes()[natural_person::CURRENT_GIVEN_NAME],
            vec!["Jan".to_string(), "Petr".to_string()]
        );
        assert!(!response.is_failure());
    }
}
