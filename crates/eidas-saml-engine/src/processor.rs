//! Mapping between the semantic model and SAML protocol objects.
//!
//! The engine never builds protocol objects itself: a [`ProtocolProcessor`]
//! turns [`AuthenticationRequest`]/[`AuthenticationResponse`] values into
//! [`AuthnRequest`]/[`Response`] objects and back, supplies the business
//! sanity rules, names the validator suites to run and maps issuers to the
//! certificates trusted to sign for them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use eidas_crypto::Certificate;

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::model::{AttributeMap, AuthenticationRequest, AuthenticationResponse};
use crate::types::{
    attribute_name_formats, natural_person, status_codes, Assertion, Attribute, AttributeStatement,
    AuthnRequest, AuthnStatement, Conditions, Extensions, LevelOfAssurance, NameId, NameIdFormat,
    NameIdPolicy, RequestedAuthnContext, Response, Status, Subject, SubjectConfirmation,
    SubjectConfirmationData,
};
use crate::validation::{
    extract_response_status, extract_verified_assertion, find_attribute_statement, REQUEST_VALIDATOR_ID,
    RESPONSE_VALIDATOR_ID,
};

/// Inputs the semantic checks of a received response need.
#[derive(Debug, Clone, Copy)]
pub struct ResponseValidationParams<'a> {
    /// Check bearer confirmation addresses against `user_ip`.
    pub ip_validation: bool,
    /// Address of the user agent that delivered the response.
    pub user_ip: Option<&'a str>,
    /// Clock skew tolerance in milliseconds.
    pub skew_millis: u64,
    /// Current time.
    pub now: DateTime<Utc>,
    /// Audience the assertion must be restricted to, if any.
    pub audience_restriction: Option<&'a str>,
}

/// Maps between the semantic model and protocol objects.
pub trait ProtocolProcessor: Send + Sync {
    /// Builds the protocol request for `request`, issued by `service_issuer`.
    ///
    /// # Errors
    ///
    /// Fails if the request cannot be expressed.
    fn marshall_request(
        &self,
        request: &AuthenticationRequest,
        service_issuer: &str,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> EngineResult<AuthnRequest>;

    /// Reads the semantic request out of a protocol request.
    ///
    /// # Errors
    ///
    /// Fails if the embedded signing certificate cannot be read.
    fn unmarshall_request(
        &self,
        citizen_country_code: Option<&str>,
        request: &AuthnRequest,
        origin_country_code: Option<&str>,
    ) -> EngineResult<AuthenticationRequest>;

    /// Builds a success response carrying one assertion.
    ///
    /// # Errors
    ///
    /// Fails if a required value (IP address, subject) is missing.
    fn marshall_response(
        &self,
        request: &AuthenticationRequest,
        response: &AuthenticationResponse,
        ip_address: Option<&str>,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> EngineResult<Response>;

    /// Builds a failure response without assertions.
    ///
    /// # Errors
    ///
    /// Fails if the response cannot be expressed.
    fn marshall_error_response(
        &self,
        request: &AuthenticationRequest,
        response: &AuthenticationResponse,
        ip_address: Option<&str>,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> EngineResult<Response>;

    /// Reads the semantic view of a failure response.
    ///
    /// # Errors
    ///
    /// Fails if the response cannot be read.
    fn unmarshall_error_response(&self, response: &Response) -> EngineResult<AuthenticationResponse>;

    /// Applies the semantic rules to a received response and reads it.
    ///
    /// # Errors
    ///
    /// Fails with a validation error if a rule is broken.
    fn unmarshall_response(
        &self,
        response: &Response,
        params: &ResponseValidationParams<'_>,
    ) -> EngineResult<AuthenticationResponse>;

    /// Business rules for requests.
    ///
    /// # Errors
    ///
    /// Fails with a validation error naming the broken rule.
    fn check_request_sanity(&self, request: &AuthenticationRequest) -> EngineResult<()>;

    /// Business rules for responses about to be generated.
    ///
    /// # Errors
    ///
    /// Fails with a validation error naming the broken rule.
    fn check_response_sanity(&self, response: &AuthenticationResponse) -> EngineResult<()>;

    /// Suite run on received requests.
    fn request_validator_id(&self) -> &str;

    /// Suite run on received responses.
    fn response_validator_id(&self) -> &str;

    /// Certificate trusted to sign requests from `issuer`.
    fn request_signature_certificate(&self, issuer: &str) -> Option<Certificate>;

    /// Certificate trusted to sign responses and assertions from `issuer`.
    fn response_signature_certificate(&self, issuer: &str) -> Option<Certificate>;
}

/// eIDAS mapping with a fixed issuer → certificate table.
#[derive(Debug, Clone, Default)]
pub struct EidasProtocolProcessor {
    trusted_issuers: HashMap<String, Certificate>,
}

impl EidasProtocolProcessor {
    /// Creates a processor with no issuer certificates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trusts `certificate` for messages issued by `issuer`.
    #[must_use]
    pub fn with_trusted_issuer(mut self, issuer: impl Into<String>, certificate: Certificate) -> Self {
        self.trusted_issuers.insert(issuer.into(), certificate);
        self
    }

    fn name_id_format(
        request: &AuthenticationRequest,
        response: &AuthenticationResponse,
        config: &EngineConfig,
    ) -> String {
        response
            .subject_name_id_format()
            .or_else(|| request.name_id_format())
            .or(config.default_name_id_format.as_deref())
            .unwrap_or(NameIdFormat::Unspecified.uri())
            .to_string()
    }

    fn subject_value(response: &AuthenticationResponse) -> EngineResult<String> {
        response
            .subject()
            .map(str::to_string)
            .or_else(|| {
                response
                    .attributes()
                    .get(natural_person::PERSON_IDENTIFIER)
                    .and_then(|values| values.first().cloned())
            })
            .ok_or_else(|| EngineError::validation("Response has no subject and no PersonIdentifier"))
    }

    fn country_of(response: &Response) -> Option<String> {
        response
            .signature_certificate
            .as_deref()
            .and_then(|encoded| Certificate::from_base64(encoded).ok())
            .and_then(|certificate| certificate.country())
    }

    fn response_shell(
        request: &AuthenticationRequest,
        response: &AuthenticationResponse,
        status: Status,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> Response {
        let mut shell = Response::new(response.issuer(), status, now)
            .in_response_to(request.id())
            .with_consent(config.consent_authn_response.as_str());
        if !response.id().is_empty() {
            shell.id = response.id().to_string();
        }
        if let Some(url) = request.assertion_consumer_service_url() {
            shell = shell.with_destination(url);
        }
        shell
    }
}

impl ProtocolProcessor for EidasProtocolProcessor {
    fn marshall_request(
        &self,
        request: &AuthenticationRequest,
        service_issuer: &str,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> EngineResult<AuthnRequest> {
        let mut authn_request = AuthnRequest::new(request.id(), service_issuer, now)
            .with_binding(request.binding())
            .with_consent(config.consent_authn_request.as_str())
            .force_authn(true)
            .with_extensions(Extensions {
                sp_type: request.sp_type(),
                requested_attributes: request.requested_attributes().to_vec(),
            });

        if let Some(destination) = request.destination() {
            authn_request = authn_request.with_destination(destination);
        }
        if let Some(url) = request.assertion_consumer_service_url() {
            authn_request = authn_request.with_acs_url(url);
        }
        if let Some(name) = request.provider_name() {
            authn_request = authn_request.with_provider_name(name);
        }
        if let Some(format) = request
            .name_id_format()
            .or(config.default_name_id_format.as_deref())
        {
            authn_request = authn_request.with_name_id_policy(NameIdPolicy {
                format: Some(format.to_string()),
                allow_create: true,
            });
        }
        if let Some(level) = request.level_of_assurance() {
            authn_request = authn_request.with_authn_context(RequestedAuthnContext::minimum(level));
        }

        tracing::debug!(id = %authn_request.id, issuer = service_issuer, "request marshalled");
        Ok(authn_request)
    }

    fn unmarshall_request(
        &self,
        citizen_country_code: Option<&str>,
        request: &AuthnRequest,
        origin_country_code: Option<&str>,
    ) -> EngineResult<AuthenticationRequest> {
        let mut builder = AuthenticationRequest::builder(request.issuer.as_str()).id(request.id.as_str());

        if let Some(destination) = &request.destination {
            builder = builder.destination(destination.as_str());
        }
        if let Some(url) = &request.assertion_consumer_service_url {
            builder = builder.assertion_consumer_service_url(url.as_str());
        }
        if let Some(binding) = request.parsed_binding() {
            builder = builder.binding(binding);
        }
        if let Some(name) = &request.provider_name {
            builder = builder.provider_name(name.as_str());
        }
        if let Some(sp_type) = request.extensions.as_ref().and_then(|extensions| extensions.sp_type) {
            builder = builder.sp_type(sp_type);
        }
        if let Some(code) = citizen_country_code {
            builder = builder.citizen_country_code(code);
        }
        if let Some(code) = origin_country_code {
            builder = builder.origin_country_code(code);
        }
        if let Some(level) = request
            .requested_authn_context
            .as_ref()
            .and_then(|context| context.authn_context_class_refs.first())
        {
            builder = builder.level_of_assurance_uri(level.as_str());
        }
        if let Some(format) = request.name_id_policy.as_ref().and_then(|policy| policy.format.as_ref()) {
            builder = builder.name_id_format_uri(format.as_str());
        }
        for attribute in request.requested_attributes() {
            builder = builder.requested_attribute(attribute.clone());
        }
        if let Some(encoded) = &request.signature_certificate {
            builder = builder.signing_certificate(Certificate::from_base64(encoded)?);
        }

        Ok(builder.build())
    }

    fn marshall_response(
        &self,
        request: &AuthenticationRequest,
        response: &AuthenticationResponse,
        ip_address: Option<&str>,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> EngineResult<Response> {
        let ip_address = ip_address.filter(|ip| !ip.trim().is_empty());
        if response.ip_address_required() && ip_address.is_none() {
            return Err(EngineError::validation("IP address is required"));
        }

        let validity = config.assertion_validity();
        let conditions = Conditions::valid_for(now, validity)
            .with_audience(request.issuer())
            .one_time_use();

        let mut confirmation_data = SubjectConfirmationData::for_request(
            request.id(),
            request.assertion_consumer_service_url().unwrap_or_default(),
        );
        if let Some(not_on_or_after) = conditions.not_on_or_after {
            confirmation_data = confirmation_data.expires_at(not_on_or_after);
        }
        if let Some(ip) = ip_address {
            confirmation_data = confirmation_data.with_address(ip);
        }
        let subject = Subject::new(
            NameId::new(Self::subject_value(response)?).format(Self::name_id_format(request, response, config)),
        )
        .with_confirmation(SubjectConfirmation::bearer().with_data(confirmation_data));

        let level = response
            .level_of_assurance()
            .or_else(|| request.level_of_assurance())
            .unwrap_or(LevelOfAssurance::Low.uri());
        let mut authn_statement = AuthnStatement::new(now, level);
        if let Some(ip) = ip_address {
            authn_statement = authn_statement.with_locality(ip);
        }

        let mut attribute_statement = AttributeStatement::new();
        for (name, values) in response.attributes() {
            let mut attribute =
                Attribute::new(name.as_str(), values.clone()).with_format(attribute_name_formats::URI);
            if let Some(friendly_name) = request.friendly_name_of(name) {
                attribute = attribute.with_friendly_name(friendly_name);
            }
            attribute_statement = attribute_statement.with_attribute(attribute);
        }

        let assertion = Assertion::issued_at(response.issuer(), now)
            .with_subject(subject)
            .with_conditions(conditions)
            .with_authn_statement(authn_statement)
            .with_attribute_statement(attribute_statement);

        let saml_response = Self::response_shell(request, response, Status::success(), config, now)
            .with_assertion(assertion);
        tracing::debug!(id = %saml_response.id, in_response_to = request.id(), "response marshalled");
        Ok(saml_response)
    }

    fn marshall_error_response(
        &self,
        request: &AuthenticationRequest,
        response: &AuthenticationResponse,
        _ip_address: Option<&str>,
        config: &EngineConfig,
        now: DateTime<Utc>,
    ) -> EngineResult<Response> {
        let status = response.status();
        let code = if status.status_code().trim().is_empty() {
            status_codes::RESPONDER
        } else {
            status.status_code()
        };
        let status = Status::failure(
            code,
            status.sub_status_code().map(str::to_string),
            status.status_message().map(str::to_string),
        );

        let saml_response = Self::response_shell(request, response, status, config, now);
        tracing::debug!(id = %saml_response.id, in_response_to = request.id(), "error response marshalled");
        Ok(saml_response)
    }

    fn unmarshall_error_response(&self, response: &Response) -> EngineResult<AuthenticationResponse> {
        Ok(AuthenticationResponse::builder(
            response.issuer.as_str(),
            response.in_response_to.as_deref().unwrap_or_default(),
        )
        .id(response.id.as_str())
        .status(extract_response_status(response))
        .country(Self::country_of(response))
        .build())
    }

    fn unmarshall_response(
        &self,
        response: &Response,
        params: &ResponseValidationParams<'_>,
    ) -> EngineResult<AuthenticationResponse> {
        let status = extract_response_status(response);
        if status.is_failure() {
            tracing::debug!(id = %response.id, code = status.status_code(), "failure response, no assertion checked");
            return self.unmarshall_error_response(response);
        }

        let assertion = extract_verified_assertion(
            response,
            params.ip_validation,
            params.user_ip,
            params.skew_millis,
            params.now,
            params.audience_restriction,
        )?;

        let attributes: AttributeMap = find_attribute_statement(&assertion)?
            .attributes
            .iter()
            .map(|attribute| (attribute.name.clone(), attribute.values.clone()))
            .collect();

        let mut builder = AuthenticationResponse::builder(
            response.issuer.as_str(),
            response.in_response_to.as_deref().unwrap_or_default(),
        )
        .id(response.id.as_str())
        .status(status)
        .attributes(attributes)
        .country(Self::country_of(response));

        if let Some(name_id) = assertion.subject.as_ref().and_then(|subject| subject.name_id.as_ref()) {
            builder = builder.subject(name_id.value.as_str(), name_id.format.clone());
        }
        if let Some(level) = assertion
            .authn_statement
            .as_ref()
            .and_then(|statement| statement.authn_context.authn_context_class_ref.as_deref())
        {
            builder = builder.level_of_assurance(level);
        }
        if let Some(address) = assertion
            .bearer_confirmations()
            .find_map(|confirmation| confirmation.subject_confirmation_data.as_ref()?.address.as_deref())
        {
            builder = builder.ip_address(address);
        }
        if let Some(conditions) = &assertion.conditions {
            if let Some(audience) = conditions
                .audience_restrictions
                .iter()
                .flat_map(|restriction| restriction.audiences.iter())
                .next()
            {
                builder = builder.audience_restriction(audience.as_str());
            }
            builder = builder.validity(conditions.not_before, conditions.not_on_or_after);
        }

        Ok(builder.build())
    }

    fn check_request_sanity(&self, request: &AuthenticationRequest) -> EngineResult<()> {
        if request.id().trim().is_empty() {
            return Err(EngineError::validation("Request ID is missing."));
        }
        if request.issuer().trim().is_empty() {
            return Err(EngineError::validation("Request issuer is missing."));
        }
        if request.requested_attributes().is_empty() {
            return Err(EngineError::validation("No requested attributes in request."));
        }
        let level = request
            .level_of_assurance()
            .ok_or_else(|| EngineError::validation("Level of assurance is missing."))?;
        if LevelOfAssurance::from_uri(level).is_none() {
            return Err(EngineError::validation(format!(
                "Level of assurance {level} is not an eIDAS level."
            )));
        }
        for (label, code) in [
            ("citizen", request.citizen_country_code()),
            ("origin", request.origin_country_code()),
        ] {
            if let Some(code) = code {
                if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
                    return Err(EngineError::validation(format!(
                        "Invalid {label} country code {code}."
                    )));
                }
            }
        }
        Ok(())
    }

    fn check_response_sanity(&self, response: &AuthenticationResponse) -> EngineResult<()> {
        if response.attributes().is_empty() {
            tracing::warn!(in_response_to = response.in_response_to(), "No attribute values in response.");
            return Err(EngineError::validation("No attribute values in response."));
        }
        Ok(())
    }

    fn request_validator_id(&self) -> &str {
        REQUEST_VALIDATOR_ID
    }

    fn response_validator_id(&self) -> &str {
        RESPONSE_VALIDATOR_ID
    }

    fn request_signature_certificate(&self, issuer: &str) -> Option<Certificate> {
        self.trusted_issuers.get(issuer).cloned()
    }

    fn response_signature_certificate(&self, issuer: &str) -> Option<Certificate> {
        self.trusted_issuers.get(issuer).cloned()
    }
}
