//! Response exchange: proxy answers a received request, connector consumes.

use chrono::TimeDelta;
use eidas_saml_engine::types::{natural_person, status_codes, LevelOfAssurance};
use eidas_saml_engine::{
    AuthenticationRequest, EngineConfig, ErrorCode, ProtocolEngine, ResponseMessage, ResponseStatus,
};

use crate::common::{corrupt, now, request, response_to, Federation, CONNECTOR, PROXY, USER_IP};

/// Sends a request from the connector and returns it as the proxy sees it.
fn received_request(federation: &Federation) -> anyhow::Result<AuthenticationRequest> {
    let message = federation
        .connector()?
        .generate_request_message(Some(&request()), CONNECTOR)?;
    Ok(federation
        .proxy()?
        .unmarshall_request_and_validate(message.bytes(), None)?)
}

fn respond(proxy: &ProtocolEngine, request: &AuthenticationRequest) -> anyhow::Result<ResponseMessage> {
    Ok(proxy.generate_response_message(request, &response_to(request), true, Some(USER_IP))?)
}

#[test]
fn encrypted_response_with_signed_assertions() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let request = received_request(&federation)?;

    let mut config = EngineConfig::new("proxy-cb");
    config.response_encryption_mandatory = true;
    let proxy = federation.proxy_builder(config)?.build()?;
    let message = respond(&proxy, &request)?;

    let text = std::str::from_utf8(message.bytes())?;
    assert!(text.contains("EncryptedAssertion"));
    assert!(!text.contains("Garcia"));

    let result = federation.connector()?.unmarshall_response_and_validate(
        message.bytes(),
        Some(USER_IP),
        0,
        Some(CONNECTOR),
    )?;
    assert!(!result.is_failure());
    assert_eq!(result.in_response_to(), request.id());
    assert_eq!(result.issuer(), PROXY);
    assert_eq!(result.country(), Some("CB"));
    assert_eq!(result.level_of_assurance(), Some(LevelOfAssurance::Substantial.uri()));
    assert_eq!(
        result.attributes().get(natural_person::CURRENT_FAMILY_NAME),
        Some(&vec!["Garcia".to_string()])
    );
    assert_eq!(result.subject(), Some("CB/CA/0123456789"));
    Ok(())
}

#[test]
fn correlated_response_is_available_before_semantic_rejection() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let request = received_request(&federation)?;
    let message = respond(&federation.proxy()?, &request)?;

    let late = federation.connector_at(now() + TimeDelta::hours(1))?;
    let correlated = late.unmarshall_response(message.bytes())?;
    assert_eq!(correlated.in_response_to(), Some(request.id()));
    assert_eq!(correlated.issuer(), PROXY);
    assert_eq!(correlated.country(), Some("CB"));

    let err = late
        .validate_unmarshalled_response(correlated, Some(USER_IP), 0, Some(CONNECTOR))
        .expect_err("expired assertion must be rejected");
    assert!(err.message().starts_with("Token date expired"), "{err}");
    Ok(())
}

#[test]
fn validity_window_is_half_open() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let request = received_request(&federation)?;
    let message = respond(&federation.proxy()?, &request)?;

    let at_not_before = federation.connector_at(now())?;
    assert!(at_not_before
        .unmarshall_response_and_validate(message.bytes(), None, 0, Some(CONNECTOR))
        .is_ok());

    let at_not_on_or_after = federation.connector_at(now() + TimeDelta::seconds(300))?;
    let err = at_not_on_or_after
        .unmarshall_response_and_validate(message.bytes(), None, 0, Some(CONNECTOR))
        .expect_err("NotOnOrAfter is exclusive");
    assert!(err.message().starts_with("Token date expired"), "{err}");
    Ok(())
}

#[test]
fn skew_tolerates_an_early_clock() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let request = received_request(&federation)?;
    let message = respond(&federation.proxy()?, &request)?;

    let early = federation.connector_at(now() - TimeDelta::milliseconds(800))?;
    let err = early
        .unmarshall_response_and_validate(message.bytes(), None, 0, Some(CONNECTOR))
        .expect_err("assertion is not valid yet");
    assert_eq!(err.message(), "Current time is before NotBefore condition");

    assert!(early
        .unmarshall_response_and_validate(message.bytes(), None, 1_000, Some(CONNECTOR))
        .is_ok());
    Ok(())
}

#[test]
fn audience_must_match() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let request = received_request(&federation)?;
    let message = respond(&federation.proxy()?, &request)?;
    let connector = federation.connector()?;

    let err = connector
        .unmarshall_response_and_validate(message.bytes(), None, 0, Some("https://other.example.eu"))
        .expect_err("assertion is for another audience");
    assert_eq!(err.code(), ErrorCode::MessageValidationError);

    let result = connector.unmarshall_response_and_validate(message.bytes(), None, 0, Some(CONNECTOR))?;
    assert_eq!(result.audience_restriction(), Some(CONNECTOR));
    Ok(())
}

#[test]
fn bearer_ip_must_match_when_enabled() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let request = received_request(&federation)?;
    let message = respond(&federation.proxy()?, &request)?;

    let mut config = EngineConfig::new("connector-ca");
    config.ip_validation = true;
    let connector = federation.connector_builder(config, now())?.build()?;

    let result = connector.unmarshall_response_and_validate(message.bytes(), Some(USER_IP), 0, None)?;
    assert_eq!(result.ip_address(), Some(USER_IP));

    let err = connector
        .unmarshall_response_and_validate(message.bytes(), Some("192.0.2.11"), 0, None)
        .expect_err("different browser address");
    assert_eq!(
        err.message(),
        "IPs doesn't match : token_ip (192.0.2.10) browser_ip (192.0.2.11)"
    );
    Ok(())
}

#[test]
fn failure_response_grants_nothing() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let request = received_request(&federation)?;

    let refused = eidas_saml_engine::AuthenticationResponse::builder(PROXY, request.id())
        .status(ResponseStatus::failure(
            status_codes::REQUESTER,
            Some("urn:oasis:names:tc:SAML:2.0:status:RequestDenied".to_string()),
            "Citizen consent not given.",
        ))
        .build();
    let message = federation
        .proxy()?
        .generate_response_error_message(&request, &refused, Some(USER_IP))?;

    let result = federation.connector()?.unmarshall_response_and_validate(
        message.bytes(),
        Some(USER_IP),
        0,
        Some(CONNECTOR),
    )?;
    assert!(result.is_failure());
    assert!(result.attributes().is_empty());
    assert_eq!(result.status().status_code(), status_codes::REQUESTER);
    assert_eq!(
        result.status().sub_status_code(),
        Some("urn:oasis:names:tc:SAML:2.0:status:RequestDenied")
    );
    Ok(())
}

#[test]
fn corrupted_response_fails_at_signature_stage() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let request = received_request(&federation)?;
    let message = respond(&federation.proxy()?, &request)?;

    let corrupted = corrupt(message.bytes(), "Garcia");
    let err = federation
        .connector()?
        .unmarshall_response(&corrupted)
        .expect_err("corrupted response must be rejected");
    assert_eq!(err.code(), ErrorCode::InvalidSignature);
    Ok(())
}
