//! Semantic authentication request.

use eidas_crypto::Certificate;

use crate::types::{LevelOfAssurance, NameIdFormat, RequestedAttribute, SamlBinding, SpType};

/// An eIDAS authentication request as the caller sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    id: String,
    issuer: String,
    destination: Option<String>,
    assertion_consumer_service_url: Option<String>,
    binding: SamlBinding,
    provider_name: Option<String>,
    sp_type: Option<SpType>,
    citizen_country_code: Option<String>,
    origin_country_code: Option<String>,
    level_of_assurance: Option<String>,
    name_id_format: Option<String>,
    requested_attributes: Vec<RequestedAttribute>,
    signing_certificate: Option<Certificate>,
}

impl AuthenticationRequest {
    /// Starts a request with a fresh ID.
    #[must_use]
    pub fn builder(issuer: impl Into<String>) -> AuthenticationRequestBuilder {
        AuthenticationRequestBuilder::new(issuer)
    }

    /// Request ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Entity ID of the requesting connector.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// URL the request is sent to.
    #[must_use]
    pub fn destination(&self) -> Option<&str> {
        self.destination.as_deref()
    }

    /// URL the response is delivered to.
    #[must_use]
    pub fn assertion_consumer_service_url(&self) -> Option<&str> {
        self.assertion_consumer_service_url.as_deref()
    }

    /// Binding for the response.
    #[must_use]
    pub const fn binding(&self) -> SamlBinding {
        self.binding
    }

    /// Human-readable requester name.
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Requester sector.
    #[must_use]
    pub const fn sp_type(&self) -> Option<SpType> {
        self.sp_type
    }

    /// Country of the citizen being authenticated.
    #[must_use]
    pub fn citizen_country_code(&self) -> Option<&str> {
        self.citizen_country_code.as_deref()
    }

    /// Country of the requesting node, from its signing certificate.
    #[must_use]
    pub fn origin_country_code(&self) -> Option<&str> {
        self.origin_country_code.as_deref()
    }

    /// Requested level of assurance URI.
    #[must_use]
    pub fn level_of_assurance(&self) -> Option<&str> {
        self.level_of_assurance.as_deref()
    }

    /// Requested name ID format URI.
    #[must_use]
    pub fn name_id_format(&self) -> Option<&str> {
        self.name_id_format.as_deref()
    }

    /// Requested attributes in request order.
    #[must_use]
    pub fn requested_attributes(&self) -> &[RequestedAttribute] {
        &self.requested_attributes
    }

    /// Certificate that signed the request, when it was received signed.
    #[must_use]
    pub fn signing_certificate(&self) -> Option<&Certificate> {
        self.signing_certificate.as_ref()
    }

    /// Friendly name the request gave an attribute, if any.
    #[must_use]
    pub fn friendly_name_of(&self, name: &str) -> Option<&str> {
        self.requested_attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .and_then(|attribute| attribute.friendly_name.as_deref())
    }
}

/// Builder for [`AuthenticationRequest`].
#[derive(Debug, Clone)]
pub struct AuthenticationRequestBuilder {
    request: AuthenticationRequest,
}

impl AuthenticationRequestBuilder {
    /// Creates a builder with a generated ID and HTTP-POST binding.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            request: AuthenticationRequest {
                id: format!("_id{}", uuid::Uuid::new_v4()),
                issuer: issuer.into(),
                destination: None,
                assertion_consumer_service_url: None,
                binding: SamlBinding::HttpPost,
                provider_name: None,
                sp_type: None,
                citizen_country_code: None,
                origin_country_code: None,
                level_of_assurance: None,
                name_id_format: None,
                requested_attributes: Vec::new(),
                signing_certificate: None,
            },
        }
    }

    /// Overrides the generated ID.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.request.id = id.into();
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn destination(mut self, url: impl Into<String>) -> Self {
        self.request.destination = Some(url.into());
        self
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn assertion_consumer_service_url(mut self, url: impl Into<String>) -> Self {
        self.request.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the response binding.
    #[must_use]
    pub const fn binding(mut self, binding: SamlBinding) -> Self {
        self.request.binding = binding;
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.request.provider_name = Some(name.into());
        self
    }

    /// Sets the requester sector.
    #[must_use]
    pub const fn sp_type(mut self, sp_type: SpType) -> Self {
        self.request.sp_type = Some(sp_type);
        self
    }

    /// Sets the citizen country code.
    #[must_use]
    pub fn citizen_country_code(mut self, code: impl Into<String>) -> Self {
        self.request.citizen_country_code = Some(code.into());
        self
    }

    /// Sets the origin country code.
    #[must_use]
    pub fn origin_country_code(mut self, code: impl Into<String>) -> Self {
        self.request.origin_country_code = Some(code.into());
        self
    }

    /// Sets the level of assurance.
    #[must_use]
    pub fn level_of_assurance(self, level: LevelOfAssurance) -> Self {
        self.level_of_assurance_uri(level.uri())
    }

    /// Sets the level of assurance from a raw URI.
    #[must_use]
    pub fn level_of_assurance_uri(mut self, uri: impl Into<String>) -> Self {
        self.request.level_of_assurance = Some(uri.into());
        self
    }

    /// Sets the requested name ID format.
    #[must_use]
    pub fn name_id_format(self, format: NameIdFormat) -> Self {
        self.name_id_format_uri(format.uri())
    }

    /// Sets the requested name ID format from a raw URI.
    #[must_use]
    pub fn name_id_format_uri(mut self, uri: impl Into<String>) -> Self {
        self.request.name_id_format = Some(uri.into());
        self
    }

    /// Adds a requested attribute.
    #[must_use]
    pub fn requested_attribute(mut self, attribute: RequestedAttribute) -> Self {
        self.request.requested_attributes.push(attribute);
        self
    }

    /// Records the certificate that signed the request.
    #[must_use]
    pub fn signing_certificate(mut self, certificate: Certificate) -> Self {
        self.request.signing_certificate = Some(certificate);
        self
    }

    /// Finishes the request.
    #[must_use]
    pub fn build(self) -> AuthenticationRequest {
        self.request
    }
}
