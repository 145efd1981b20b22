//! Authentication request exchange: connector generates, proxy receives.

use eidas_saml_engine::types::{natural_person, LevelOfAssurance};
use eidas_saml_engine::ErrorCode;

use crate::common::{corrupt, request, Federation, CONNECTOR};

#[test]
fn request_round_trip_preserves_protocol_fields() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let connector = federation.connector()?;
    let proxy = federation.proxy()?;

    let original = request();
    let message = connector.generate_request_message(Some(&original), CONNECTOR)?;
    let text = std::str::from_utf8(message.bytes())?;
    assert!(text.starts_with("<?xml"));
    assert!(text.contains("SignatureValue"));

    let received = proxy.unmarshall_request_and_validate(message.bytes(), Some("CB"))?;
    let sent = message.message();

    assert_eq!(received.id(), sent.id());
    assert_eq!(received.issuer(), CONNECTOR);
    assert_eq!(received.destination(), sent.destination());
    assert_eq!(received.assertion_consumer_service_url(), sent.assertion_consumer_service_url());
    assert_eq!(received.provider_name(), Some("Tax portal"));
    assert_eq!(received.level_of_assurance(), Some(LevelOfAssurance::Substantial.uri()));
    assert_eq!(received.requested_attributes(), original.requested_attributes());
    assert_eq!(received.friendly_name_of(natural_person::CURRENT_FAMILY_NAME), Some("FamilyName"));
    assert_eq!(received.citizen_country_code(), Some("CB"));
    assert_eq!(received.origin_country_code(), Some("CA"));
    assert_eq!(received.signing_certificate(), Some(&federation.connector.certificate));
    Ok(())
}

#[test]
fn generated_request_matches_what_was_asked() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let connector = federation.connector()?;

    let original = request();
    let message = connector.generate_request_message(Some(&original), CONNECTOR)?;
    assert_eq!(message.message(), &original);
    Ok(())
}

#[test]
fn corrupted_request_fails_at_signature_stage() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let connector = federation.connector()?;
    let proxy = federation.proxy()?;

    let message = connector.generate_request_message(Some(&request()), CONNECTOR)?;
    let corrupted = corrupt(message.bytes(), "Tax portal");

    let err = proxy
        .unmarshall_request_and_validate(&corrupted, Some("CB"))
        .expect_err("corrupted request must be rejected");
    assert_eq!(err.code(), ErrorCode::InvalidSignature);
    Ok(())
}

#[test]
fn request_from_untrusted_node_is_rejected() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let outsider = Federation::new()?;
    let proxy = federation.proxy()?;

    let message = outsider
        .connector()?
        .generate_request_message(Some(&request()), CONNECTOR)?;

    let err = proxy
        .unmarshall_request(message.bytes())
        .expect_err("request signed by an unknown key must be rejected");
    assert_eq!(err.code(), ErrorCode::InvalidSignature);
    Ok(())
}

#[test]
fn malformed_citizen_country_is_rejected() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let message = federation
        .connector()?
        .generate_request_message(Some(&request()), CONNECTOR)?;

    let err = federation
        .proxy()?
        .unmarshall_request_and_validate(message.bytes(), Some("cb"))
        .expect_err("lower-case country code must be rejected");
    assert_eq!(err.code(), ErrorCode::MessageValidationError);
    assert_eq!(err.message(), "Invalid citizen country code cb.");
    Ok(())
}
