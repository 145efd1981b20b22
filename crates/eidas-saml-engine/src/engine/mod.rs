//! The protocol engine.
//!
//! [`ProtocolEngine`] is the single entry point for producing and consuming
//! eIDAS messages. Generation maps, signs and serializes; consumption runs
//! the stages in a fixed order and stops at the first failure:
//!
//! 1. schema (raw bytes)
//! 2. signature, decryption and assertion signatures (if enabled)
//! 3. core schema suite
//! 4. protocol suite
//! 5. assertion rules (responses only, via [`CorrelatedResponse`])
//!
//! The engine holds no mutable state. One instance can be shared across
//! threads behind an `Arc`.

mod builder;
mod correlated;

pub use builder::ProtocolEngineBuilder;
pub use correlated::{CorrelatedResponse, ResponseValidationState};

use std::sync::Arc;

use eidas_crypto::Certificate;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::encryption::{Decrypter, Encrypter};
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::model::{AuthenticationRequest, AuthenticationResponse, BinaryMessage, RequestMessage, ResponseMessage};
use crate::processor::{ProtocolProcessor, ResponseValidationParams};
use crate::schema::SchemaValidator;
use crate::signature::Signer;
use crate::types::{issuer_of, AuthnRequest, Response, SamlObject, SAML_NS, XMLDSIG_NS};
use crate::validation::{SamlMessage, ValidatorSuite};
use crate::xml::{Element, Node, SecureXmlProcessor};

/// eIDAS protocol engine.
pub struct ProtocolEngine {
    config: EngineConfig,
    signer: Arc<dyn Signer>,
    processor: Arc<dyn ProtocolProcessor>,
    schema_validator: Arc<dyn SchemaValidator>,
    core_suite: Arc<dyn ValidatorSuite>,
    request_suite: Arc<dyn ValidatorSuite>,
    response_suite: Arc<dyn ValidatorSuite>,
    clock: Arc<dyn Clock>,
    encrypter: Option<Arc<dyn Encrypter>>,
    decrypter: Option<Arc<dyn Decrypter>>,
}

impl std::fmt::Debug for ProtocolEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolEngine")
            .field("config", &self.config)
            .field("core_suite", &self.core_suite.id())
            .field("request_suite", &self.request_suite.id())
            .field("response_suite", &self.response_suite.id())
            .field("encrypts", &self.encrypter.is_some())
            .field("decrypts", &self.decrypter.is_some())
            .finish_non_exhaustive()
    }
}

impl ProtocolEngine {
    /// Starts building an engine for `config`.
    #[must_use]
    pub fn builder(config: EngineConfig) -> ProtocolEngineBuilder {
        ProtocolEngineBuilder::new(config)
    }

    /// The configuration the engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Generates a signed authentication request.
    ///
    /// The returned request is read back from the protocol object that was
    /// signed, so it matches what the receiving node will see.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL_ERROR` if `request` is `None` or signing fails.
    pub fn generate_request_message(
        &self,
        request: Option<&AuthenticationRequest>,
        service_issuer: &str,
    ) -> EngineResult<RequestMessage> {
        let request = request.ok_or_else(|| EngineError::internal("Request is null."))?;

        let authn_request =
            self.processor
                .marshall_request(request, service_issuer, &self.config, self.clock.now())?;
        let updated = self.processor.unmarshall_request(
            request.citizen_country_code(),
            &authn_request,
            request.origin_country_code(),
        )?;

        let bytes = self
            .signer
            .sign(authn_request.to_element())
            .and_then(|signed| SecureXmlProcessor::shared().serialize(&signed, false))
            .map_err(internal)?;

        tracing::info!(id = updated.id(), "request generated");
        Ok(BinaryMessage::new(updated, bytes))
    }

    /// Generates a signed success response to `request`.
    ///
    /// With `sign_assertion`, every assertion is signed before the response
    /// is encrypted and signed. A failure on any assertion fails the call.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the request or response breaks a
    /// sanity rule, and `INTERNAL_ERROR` if signing, encryption or
    /// serialization fails.
    pub fn generate_response_message(
        &self,
        request: &AuthenticationRequest,
        response: &AuthenticationResponse,
        sign_assertion: bool,
        ip_address: Option<&str>,
    ) -> EngineResult<ResponseMessage> {
        self.processor.check_request_sanity(request)?;
        self.processor.check_response_sanity(response)?;

        let saml_response =
            self.processor
                .marshall_response(request, response, ip_address, &self.config, self.clock.now())?;

        let mut element = saml_response.to_element();
        if sign_assertion {
            self.sign_assertions(&mut element).map_err(internal)?;
        }
        let bytes = self.seal(element).map_err(internal)?;

        tracing::info!(id = %saml_response.id, "response generated");
        Ok(BinaryMessage::new(response.clone(), bytes))
    }

    /// Generates a signed failure response to `request` from the status of
    /// `response`. No assertion is produced.
    ///
    /// # Errors
    ///
    /// Returns `INTERNAL_ERROR` if signing or serialization fails.
    pub fn generate_response_error_message(
        &self,
        request: &AuthenticationRequest,
        response: &AuthenticationResponse,
        ip_address: Option<&str>,
    ) -> EngineResult<ResponseMessage> {
        let saml_response = self.processor.marshall_error_response(
            request,
            response,
            ip_address,
            &self.config,
            self.clock.now(),
        )?;
        let error_response = self.processor.unmarshall_error_response(&saml_response)?;

        let bytes = self.seal(saml_response.to_element()).map_err(internal)?;

        tracing::info!(
            id = %saml_response.id,
            status = error_response.status().status_code(),
            "error response generated"
        );
        Ok(BinaryMessage::new(error_response, bytes))
    }

    /// Parses and validates a received request up to the protocol suite.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the bytes are empty or any stage fails.
    /// Signature failures carry `INVALID_SIGNATURE`.
    pub fn unmarshall_request(&self, bytes: &[u8]) -> EngineResult<AuthnRequest> {
        if bytes.is_empty() {
            return Err(EngineError::validation("Saml request bytes are null."));
        }

        let root = self.schema_validator.validate(bytes)?.into_root()?;
        let mut request = AuthnRequest::from_element(&root)?;
        tracing::debug!(id = %request.id, "request schema valid");

        if self.config.validate_signature {
            if !request.signed {
                return Err(crate::signature::invalid("No signature"));
            }
            if request.issuer.trim().is_empty() {
                return Err(EngineError::validation("The issuer cannot be null"));
            }
            let trusted = self.processor.request_signature_certificate(&request.issuer);
            let certificate = self.validate_signature(&root, trusted.as_ref())?;
            tracing::debug!(
                id = %request.id,
                country = certificate.country().as_deref().unwrap_or("unknown"),
                "request signature valid"
            );
        } else {
            tracing::warn!(id = %request.id, "request accepted without signature validation");
            request.signature_certificate = None;
        }

        self.core_suite.validate(SamlMessage::Request(&request))?;
        self.request_suite.validate(SamlMessage::Request(&request))?;
        Ok(request)
    }

    /// Parses, validates and maps a received request.
    ///
    /// The origin country is read from the certificate that signed the
    /// request.
    ///
    /// # Errors
    ///
    /// See [`ProtocolEngine::unmarshall_request`]; also fails if the request
    /// breaks a sanity rule.
    pub fn unmarshall_request_and_validate(
        &self,
        bytes: &[u8],
        citizen_country_code: Option<&str>,
    ) -> EngineResult<AuthenticationRequest> {
        let request = self.unmarshall_request(bytes)?;
        let origin_country_code = request
            .signature_certificate
            .as_deref()
            .map(Certificate::from_base64)
            .transpose()?
            .and_then(|certificate| certificate.country());

        let authentication_request =
            self.processor
                .unmarshall_request(citizen_country_code, &request, origin_country_code.as_deref())?;
        self.processor.check_request_sanity(&authentication_request)?;

        tracing::info!(
            id = authentication_request.id(),
            issuer = authentication_request.issuer(),
            origin = origin_country_code.as_deref().unwrap_or("unknown"),
            "request accepted"
        );
        Ok(authentication_request)
    }

    /// Parses and validates a received response up to the protocol suite.
    ///
    /// The result is not trusted yet: pass it to
    /// [`ProtocolEngine::validate_unmarshalled_response`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if the bytes are empty or any stage fails.
    /// Response signature failures carry `INVALID_SIGNATURE`, assertion
    /// signature failures `INVALID_ASSERTION_SIGNATURE` and decryption
    /// failures `DECRYPTION_ERROR`.
    pub fn unmarshall_response(&self, bytes: &[u8]) -> EngineResult<CorrelatedResponse> {
        if bytes.is_empty() {
            return Err(EngineError::validation("Saml response bytes are null."));
        }
        trace_state(None, ResponseValidationState::Received);

        let mut root = self.schema_validator.validate(bytes)?.into_root()?;
        let id = root.attribute("ID").unwrap_or_default().to_string();
        trace_state(Some(&id), ResponseValidationState::SchemaValid);

        if self.config.validate_signature {
            if root.find_child(XMLDSIG_NS, "Signature").is_none() {
                return Err(crate::signature::invalid("No signature"));
            }
            let certificate = self.validate_signature(&root, None)?;
            tracing::debug!(
                id = %id,
                country = certificate.country().as_deref().unwrap_or("unknown"),
                "response signature valid"
            );

            if let Some(decrypter) = &self.decrypter {
                root = decrypter.decrypt_assertions(root)?;
            }
            self.validate_assertion_signatures(&root)?;
            trace_state(Some(&id), ResponseValidationState::SignatureValidAndDecrypted);
        } else {
            tracing::warn!(id = %id, "response accepted without signature validation");
        }

        let mut response = Response::from_element(&root)?;
        if !self.config.validate_signature {
            response.signature_certificate = None;
        }

        self.core_suite.validate(SamlMessage::Response(&response))?;
        trace_state(Some(&id), ResponseValidationState::CoreSchemaValid);
        self.response_suite.validate(SamlMessage::Response(&response))?;
        trace_state(Some(&id), ResponseValidationState::SuiteValid);

        let correlated = CorrelatedResponse::new(response);
        tracing::info!(
            id = correlated.id(),
            in_response_to = correlated.in_response_to().unwrap_or_default(),
            issuer = correlated.issuer(),
            "response received"
        );
        Ok(correlated)
    }

    /// Applies the assertion rules to a correlated response and maps it.
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the first broken rule.
    pub fn validate_unmarshalled_response(
        &self,
        response: CorrelatedResponse,
        user_ip: Option<&str>,
        skew_millis: u64,
        audience_restriction: Option<&str>,
    ) -> EngineResult<AuthenticationResponse> {
        let params = ResponseValidationParams {
            ip_validation: self.config.ip_validation,
            user_ip,
            skew_millis,
            now: self.clock.now(),
            audience_restriction,
        };
        let response = response.into_response();
        let authentication_response = self.processor.unmarshall_response(&response, &params)?;
        trace_state(Some(&response.id), ResponseValidationState::SemanticallyValid);
        Ok(authentication_response)
    }

    /// [`ProtocolEngine::unmarshall_response`] followed by
    /// [`ProtocolEngine::validate_unmarshalled_response`].
    ///
    /// # Errors
    ///
    /// Fails at the first stage that rejects the response.
    pub fn unmarshall_response_and_validate(
        &self,
        bytes: &[u8],
        user_ip: Option<&str>,
        skew_millis: u64,
        audience_restriction: Option<&str>,
    ) -> EngineResult<AuthenticationResponse> {
        let correlated = self.unmarshall_response(bytes)?;
        self.validate_unmarshalled_response(correlated, user_ip, skew_millis, audience_restriction)
    }

    fn sign_assertions(&self, response: &mut Element) -> EngineResult<()> {
        for node in response.children_mut() {
            if let Node::Element(child) = node {
                if child.is(SAML_NS, "Assertion") {
                    *child = self.signer.sign(child.clone())?;
                }
            }
        }
        Ok(())
    }

    /// Encrypts assertions if configured, signs and serializes.
    fn seal(&self, mut response: Element) -> EngineResult<Vec<u8>> {
        if let Some(encrypter) = &self.encrypter {
            response = encrypter.encrypt_assertions(response)?;
        }
        let signed = self.signer.sign(response)?;
        SecureXmlProcessor::shared().serialize(&signed, false)
    }

    fn validate_signature(&self, element: &Element, trusted: Option<&Certificate>) -> EngineResult<Certificate> {
        self.signer
            .validate_signature(element, trusted.map(std::slice::from_ref))
            .map_err(|e| e.into_validation(ErrorCode::InvalidSignature))
    }

    /// Assertions are trusted on the key of the node that issued the
    /// enclosing response.
    fn validate_assertion_signatures(&self, response: &Element) -> EngineResult<()> {
        let issuer = issuer_of(response).unwrap_or_default();
        let trusted = self.processor.response_signature_certificate(&issuer);
        for assertion in response.find_children(SAML_NS, "Assertion") {
            if assertion.find_child(XMLDSIG_NS, "Signature").is_none() {
                continue;
            }
            self.signer
                .validate_signature(assertion, trusted.as_ref().map(std::slice::from_ref))
                .map_err(|e| {
                    EngineError::validation_with_code(
                        ErrorCode::InvalidAssertionSignature,
                        e.message().to_string(),
                    )
                    .with_source(e)
                })?;
        }
        Ok(())
    }
}

fn trace_state(id: Option<&str>, state: ResponseValidationState) {
    tracing::debug!(id = id.unwrap_or_default(), %state, "response validation state");
}

fn internal(err: EngineError) -> EngineError {
    EngineError::internal(err.message().to_string()).with_source(err)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    use super::*;
    use crate::clock::FixedClock;
    use crate::encryption::AesGcmAssertionCipher;
    use crate::model::ResponseStatus;
    use crate::processor::EidasProtocolProcessor;
    use crate::testing::{init_tracing, signer, Node as Identity};
    use crate::types::{
        attribute_name_formats, natural_person, status_codes, LevelOfAssurance, RequestedAttribute,
    };

    const CONNECTOR: &str = "https://connector.example.eu/metadata";
    const PROXY: &str = "https://proxy.example.eu/metadata";
    const KEY: [u8; 32] = [7; 32];

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()
    }

    struct Federation {
        connector: Identity,
        proxy: Identity,
    }

    impl Federation {
        fn new() -> Self {
            init_tracing();
            Self {
                connector: Identity::generate("CA"),
                proxy: Identity::generate("CB"),
            }
        }

        fn connector(&self, at: DateTime<Utc>) -> ProtocolEngineBuilder {
            self.connector_with(EngineConfig::new("connector"), at)
        }

        fn connector_with(&self, config: EngineConfig, at: DateTime<Utc>) -> ProtocolEngineBuilder {
            ProtocolEngine::builder(config)
                .signer(signer(&self.connector, vec![self.proxy.certificate.clone()]))
                .processor(
                    EidasProtocolProcessor::new().with_trusted_issuer(PROXY, self.proxy.certificate.clone()),
                )
                .clock(FixedClock(at))
        }

        fn proxy(&self, config: EngineConfig) -> ProtocolEngineBuilder {
            ProtocolEngine::builder(config)
                .signer(signer(&self.proxy, vec![self.connector.certificate.clone()]))
                .processor(
                    EidasProtocolProcessor::new()
                        .with_trusted_issuer(CONNECTOR, self.connector.certificate.clone()),
                )
                .clock(FixedClock(now()))
        }
    }

    fn request() -> AuthenticationRequest {
        AuthenticationRequest::builder(CONNECTOR)
            .destination("https://proxy.example.eu/sso")
            .assertion_consumer_service_url("https://connector.example.eu/acs")
            .provider_name("Demo SP")
            .level_of_assurance(LevelOfAssurance::Substantial)
            .requested_attribute(RequestedAttribute {
                name: natural_person::PERSON_IDENTIFIER.to_string(),
                friendly_name: Some("PersonIdentifier".to_string()),
                name_format: Some(attribute_name_formats::URI.to_string()),
                is_required: true,
            })
            .build()
    }

    fn response(in_response_to: &str) -> AuthenticationResponse {
        AuthenticationResponse::builder(PROXY, in_response_to)
            .attribute(natural_person::PERSON_IDENTIFIER, vec!["CA/CB/12345".to_string()])
            .build()
    }

    fn replace(bytes: &[u8], from: &str, to: &str) -> Vec<u8> {
        String::from_utf8(bytes.to_vec()).unwrap().replacen(from, to, 1).into_bytes()
    }

    #[test]
    fn request_reaches_proxy_with_origin_from_certificate() {
        let federation = Federation::new();
        let connector = federation.connector(now()).build().unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let message = connector.generate_request_message(Some(&request()), CONNECTOR).unwrap();
        let received = proxy
            .unmarshall_request_and_validate(message.bytes(), Some("CB"))
            .unwrap();

        assert_eq!(received.id(), message.message().id());
        assert_eq!(received.requested_attributes(), message.message().requested_attributes());
        assert_eq!(received.origin_country_code(), Some("CA"));
        assert_eq!(received.citizen_country_code(), Some("CB"));
        assert_eq!(received.signing_certificate(), Some(&federation.connector.certificate));
    }

    #[test]
    fn absent_request_is_internal_error() {
        let federation = Federation::new();
        let connector = federation.connector(now()).build().unwrap();
        let err = connector.generate_request_message(None, CONNECTOR).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InternalError);
    }

    #[test]
    fn empty_bytes_are_rejected() {
        let federation = Federation::new();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();
        let err = proxy.unmarshall_request(&[]).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(err.message(), "Saml request bytes are null.");
        assert!(proxy.unmarshall_response(&[]).unwrap_err().is_validation());
    }

    #[test]
    fn tampered_request_fails_at_signature() {
        let federation = Federation::new();
        let connector = federation.connector(now()).build().unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let message = connector.generate_request_message(Some(&request()), CONNECTOR).unwrap();
        let tampered = replace(message.bytes(), "Demo SP", "Demo SQ");

        let err = proxy.unmarshall_request(&tampered).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSignature);
    }

    #[test]
    fn request_from_unknown_node_is_rejected() {
        let federation = Federation::new();
        let stranger = Identity::generate("CZ");
        let impostor = ProtocolEngine::builder(EngineConfig::new("impostor"))
            .signer(signer(&stranger, Vec::new()))
            .processor(EidasProtocolProcessor::new())
            .clock(FixedClock(now()))
            .build()
            .unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let message = impostor.generate_request_message(Some(&request()), CONNECTOR).unwrap();
        let err = proxy.unmarshall_request(message.bytes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSignature);
    }

    #[test]
    fn response_round_trip_with_signed_assertion() {
        let federation = Federation::new();
        let connector = federation.connector(now() + TimeDelta::seconds(5)).build().unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let sent = connector.generate_request_message(Some(&request()), CONNECTOR).unwrap();
        let received = proxy.unmarshall_request_and_validate(sent.bytes(), None).unwrap();
        let message = proxy
            .generate_response_message(&received, &response(received.id()), true, Some("10.0.0.1"))
            .unwrap();

        let correlated = connector.unmarshall_response(message.bytes()).unwrap();
        assert_eq!(correlated.in_response_to(), Some(sent.message().id()));
        assert_eq!(correlated.country(), Some("CB"));

        let result = connector
            .validate_unmarshalled_response(correlated, Some("10.0.0.1"), 0, Some(CONNECTOR))
            .unwrap();
        assert_eq!(
            result.attributes().get(natural_person::PERSON_IDENTIFIER),
            Some(&vec!["CA/CB/12345".to_string()])
        );
        assert_eq!(result.country(), Some("CB"));
        assert_eq!(result.level_of_assurance(), Some(LevelOfAssurance::Substantial.uri()));
    }

    #[test]
    fn response_without_attributes_is_not_generated() {
        let federation = Federation::new();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();
        let empty = AuthenticationResponse::builder(PROXY, "_req").build();
        let err = proxy
            .generate_response_message(&request(), &empty, false, None)
            .unwrap_err();
        assert_eq!(err.message(), "No attribute values in response.");
    }

    #[test]
    fn expired_assertion_is_rejected() {
        let federation = Federation::new();
        let connector = federation.connector(now() + TimeDelta::seconds(301)).build().unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let request = request();
        let message = proxy
            .generate_response_message(&request, &response(request.id()), false, Some("10.0.0.1"))
            .unwrap();
        let err = connector
            .unmarshall_response_and_validate(message.bytes(), Some("10.0.0.1"), 0, Some(CONNECTOR))
            .unwrap_err();
        assert!(err.message().starts_with("Token date expired"), "{err}");

        let accepted = connector
            .unmarshall_response_and_validate(message.bytes(), Some("10.0.0.1"), 2_000, Some(CONNECTOR))
            .unwrap();
        assert!(!accepted.is_failure());
    }

    #[test]
    fn wrong_audience_is_rejected() {
        let federation = Federation::new();
        let connector = federation.connector(now()).build().unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let request = request();
        let message = proxy
            .generate_response_message(&request, &response(request.id()), false, Some("10.0.0.1"))
            .unwrap();
        let err = connector
            .unmarshall_response_and_validate(message.bytes(), None, 0, Some("https://other.example.eu"))
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn bearer_ip_is_checked_when_enabled() {
        let federation = Federation::new();
        let mut config = EngineConfig::new("connector");
        config.ip_validation = true;
        let connector = ProtocolEngine::builder(config)
            .signer(signer(&federation.connector, vec![federation.proxy.certificate.clone()]))
            .processor(EidasProtocolProcessor::new())
            .clock(FixedClock(now()))
            .build()
            .unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let request = request();
        let message = proxy
            .generate_response_message(&request, &response(request.id()), false, Some("10.0.0.1"))
            .unwrap();
        let err = connector
            .unmarshall_response_and_validate(message.bytes(), Some("10.0.0.2"), 0, None)
            .unwrap_err();
        assert_eq!(
            err.message(),
            "IPs doesn't match : token_ip (10.0.0.1) browser_ip (10.0.0.2)"
        );
    }

    #[test]
    fn assertion_signed_by_untrusted_issuer_key_is_rejected() {
        let federation = Federation::new();
        let stranger = Identity::generate("CZ");
        let connector = ProtocolEngine::builder(EngineConfig::new("connector"))
            .signer(signer(&federation.connector, vec![federation.proxy.certificate.clone()]))
            .processor(EidasProtocolProcessor::new().with_trusted_issuer(PROXY, stranger.certificate))
            .clock(FixedClock(now()))
            .build()
            .unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let request = request();
        let message = proxy
            .generate_response_message(&request, &response(request.id()), true, None)
            .unwrap();
        let err = connector.unmarshall_response(message.bytes()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidAssertionSignature);
    }

    #[test]
    fn failure_response_carries_status_only() {
        let federation = Federation::new();
        let connector = federation.connector(now()).build().unwrap();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();

        let request = request();
        let failed = AuthenticationResponse::builder(PROXY, request.id())
            .status(ResponseStatus::failure(
                status_codes::REQUESTER,
                None,
                "Citizen consent not given.",
            ))
            .build();
        let message = proxy
            .generate_response_error_message(&request, &failed, None)
            .unwrap();
        assert!(message.message().is_failure());

        let result = connector
            .unmarshall_response_and_validate(message.bytes(), None, 0, Some(CONNECTOR))
            .unwrap();
        assert!(result.is_failure());
        assert!(result.attributes().is_empty());
        assert_eq!(result.status().status_message(), Some("Citizen consent not given."));
    }

    #[test]
    fn encrypted_assertions_need_a_decrypter() {
        let federation = Federation::new();
        let mut config = EngineConfig::new("proxy");
        config.response_encryption_mandatory = true;
        let proxy = federation
            .proxy(config)
            .encrypter(AesGcmAssertionCipher::new("connector-2026", &KEY).unwrap())
            .build()
            .unwrap();

        let request = request();
        let message = proxy
            .generate_response_message(&request, &response(request.id()), true, Some("10.0.0.1"))
            .unwrap();
        let text = String::from_utf8(message.bytes().to_vec()).unwrap();
        assert!(!text.contains("CA/CB/12345"));
        assert!(text.contains("EncryptedAssertion"));

        let connector = federation
            .connector(now())
            .decrypter(AesGcmAssertionCipher::new("connector-2026", &KEY).unwrap())
            .build()
            .unwrap();
        let result = connector
            .unmarshall_response_and_validate(message.bytes(), Some("10.0.0.1"), 0, Some(CONNECTOR))
            .unwrap();
        assert_eq!(result.attributes().len(), 1);

        let blind = federation.connector(now()).build().unwrap();
        let err = blind
            .unmarshall_response_and_validate(message.bytes(), Some("10.0.0.1"), 0, Some(CONNECTOR))
            .unwrap_err();
        assert!(err.message().starts_with("Assertion is null"));
    }

    #[test]
    fn builder_requires_collaborators() {
        let err = ProtocolEngine::builder(EngineConfig::new("bare")).build().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);

        let federation = Federation::new();
        let mut config = EngineConfig::new("proxy");
        config.response_encryption_mandatory = true;
        let err = federation.proxy(config).build().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);

        let mut config = EngineConfig::new("proxy");
        config.signature_algorithm = eidas_crypto::SignatureAlgorithm::Es512;
        let err = federation.proxy(config).build().unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
    }

    #[test]
    fn unknown_suite_fails_build() {
        let federation = Federation::new();
        let err = federation
            .connector(now())
            .registry(crate::validation::ValidatorRegistry::empty())
            .build()
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigurationError);
    }

    #[test]
    fn unsigned_request_is_rejected_when_signatures_are_checked() {
        let federation = Federation::new();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();
        let authn_request = EidasProtocolProcessor::new()
            .marshall_request(&request(), CONNECTOR, &EngineConfig::new("connector"), now())
            .unwrap();
        let bytes = SecureXmlProcessor::shared()
            .serialize(&authn_request.to_element(), false)
            .unwrap();

        let err = proxy.unmarshall_request(&bytes).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidSignature);
        assert_eq!(err.message(), "No signature");

        let mut config = EngineConfig::new("proxy");
        config.validate_signature = false;
        let lenient = federation.proxy(config).build().unwrap();
        let request = lenient.unmarshall_request(&bytes).unwrap();
        assert_eq!(request.issuer, CONNECTOR);
    }

    fn lenient_connector(federation: &Federation) -> ProtocolEngine {
        let mut config = EngineConfig::new("connector");
        config.validate_signature = false;
        federation
            .connector_with(config, now())
            .decrypter(AesGcmAssertionCipher::new("connector-2026", &KEY).unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn unverified_response_still_passes_structural_and_semantic_rules() {
        let federation = Federation::new();
        let proxy = federation.proxy(EngineConfig::new("proxy")).build().unwrap();
        let connector = lenient_connector(&federation);

        let request = request();
        let message = proxy
            .generate_response_message(&request, &response(request.id()), true, Some("10.0.0.1"))
            .unwrap();

        let correlated = connector.unmarshall_response(message.bytes()).unwrap();
        assert_eq!(correlated.country(), None);
        let result = connector
            .validate_unmarshalled_response(correlated, Some("10.0.0.1"), 0, Some(CONNECTOR))
            .unwrap();
        assert_eq!(result.attributes().len(), 1);

        let altered = String::from_utf8(message.bytes().to_vec())
            .unwrap()
            .replace("CA/CB/12345", "CA/CB/99999");
        let result = connector
            .unmarshall_response_and_validate(altered.as_bytes(), Some("10.0.0.1"), 0, Some(CONNECTOR))
            .unwrap();
        assert_eq!(
            result.attributes().get(natural_person::PERSON_IDENTIFIER),
            Some(&vec!["CA/CB/99999".to_string()])
        );

        let err = connector
            .unmarshall_response_and_validate(message.bytes(), None, 0, Some("https://other.example.eu"))
            .unwrap_err();
        assert!(err.is_validation());

        let wrong_version = replace(message.bytes(), "Version=\"2.0\"", "Version=\"1.0\"");
        let err = connector.unmarshall_response(&wrong_version).unwrap_err();
        assert!(err.is_validation(), "{err}");
    }

    #[test]
    fn unverified_encrypted_response_has_no_assertion() {
        let federation = Federation::new();
        let mut config = EngineConfig::new("proxy");
        config.response_encryption_mandatory = true;
        let proxy = federation
            .proxy(config)
            .encrypter(AesGcmAssertionCipher::new("connector-2026", &KEY).unwrap())
            .build()
            .unwrap();
        let connector = lenient_connector(&federation);

        let request = request();
        let message = proxy
            .generate_response_message(&request, &response(request.id()), false, Some("10.0.0.1"))
            .unwrap();

        let correlated = connector.unmarshall_response(message.bytes()).unwrap();
        let err = connector
            .validate_unmarshalled_response(correlated, Some("10.0.0.1"), 0, Some(CONNECTOR))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::MessageValidationError);
        assert_eq!(
            err.message(),
            "Assertion is null, empty or the response is encrypted and decryption is not active."
        );
    }

    #[test]
    fn optional_encryption_leaves_assertions_in_clear() {
        let federation = Federation::new();
        let proxy = federation
            .proxy(EngineConfig::new("proxy"))
            .encrypter(AesGcmAssertionCipher::new("connector-2026", &KEY).unwrap())
            .build()
            .unwrap();
        assert!(format!("{proxy:?}").contains("encrypts: false"));

        let request = request();
        let message = proxy
            .generate_response_message(&request, &response(request.id()), false, None)
            .unwrap();
        let text = String::from_utf8(message.bytes().to_vec()).unwrap();
        assert!(text.contains("CA/CB/12345"));
        assert!(!text.contains("EncryptedAssertion"));
    }

    #[test]
    fn assertion_signature_is_checked_against_response_issuer() {
        const OTHER: &str = "https://other.example.eu/metadata";
        let federation = Federation::new();
        let stranger = Identity::generate("CZ");

        let request = request();
        let mut saml = EidasProtocolProcessor::new()
            .marshall_response(
                &request,
                &response(request.id()),
                Some("10.0.0.1"),
                &EngineConfig::new("proxy"),
                now(),
            )
            .unwrap();
        saml.assertions[0].issuer = OTHER.to_string();

        let proxy_signer = signer(&federation.proxy, Vec::new());
        let mut element = saml.to_element();
        for node in element.children_mut() {
            if let Node::Element(child) = node {
                if child.is(SAML_NS, "Assertion") {
                    *child = proxy_signer.sign(child.clone()).unwrap();
                }
            }
        }
        let bytes = SecureXmlProcessor::shared()
            .serialize(&proxy_signer.sign(element).unwrap(), false)
            .unwrap();

        let connector = ProtocolEngine::builder(EngineConfig::new("connector"))
            .signer(signer(&federation.connector, vec![federation.proxy.certificate.clone()]))
            .processor(
                EidasProtocolProcessor::new()
                    .with_trusted_issuer(PROXY, federation.proxy.certificate.clone())
                    .with_trusted_issuer(OTHER, stranger.certificate),
            )
            .clock(FixedClock(now()))
            .build()
            .unwrap();

        let correlated = connector.unmarshall_response(&bytes).unwrap();
        assert_eq!(correlated.issuer(), PROXY);
    }
}
