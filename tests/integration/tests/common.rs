//! Common test utilities and fixtures.

use chrono::{DateTime, TimeZone, Utc};
use eidas_crypto::{Certificate, SignatureAlgorithm};
use eidas_saml_engine::types::{attribute_name_formats, natural_person, LevelOfAssurance, RequestedAttribute};
use eidas_saml_engine::{
    AesGcmAssertionCipher, AuthenticationRequest, AuthenticationResponse, EidasProtocolProcessor,
    EngineConfig, FixedClock, ProtocolEngine, ProtocolEngineBuilder, XmlSigner,
};

pub const CONNECTOR: &str = "https://connector.ca.example.eu/metadata";
pub const PROXY: &str = "https://proxy.cb.example.eu/metadata";
pub const ACS_URL: &str = "https://connector.ca.example.eu/ColleagueResponse";
pub const SSO_URL: &str = "https://proxy.cb.example.eu/ColleagueRequest";
pub const USER_IP: &str = "192.0.2.10";
pub const KEY_NAME: &str = "connector-ca-2026";
pub const KEY: [u8; 32] = [0x5a; 32];

/// Fixed instant both nodes agree on unless a test moves one clock.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap()
}

/// Initializes tracing once for the whole test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("eidas_saml_engine=debug")
        .with_test_writer()
        .try_init();
}

/// A node identity: P-384 key and self-signed certificate for `country`.
pub struct Identity {
    pub certificate: Certificate,
    pub private_key: Vec<u8>,
}

impl Identity {
    pub fn generate(country: &str) -> anyhow::Result<Self> {
        let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384)?;
        let mut params = rcgen::CertificateParams::new(vec![format!("node.{country}.example.eu")])?;
        params.distinguished_name.push(rcgen::DnType::CountryName, country);
        params
            .distinguished_name
            .push(rcgen::DnType::CommonName, format!("{country} eIDAS node"));
        let certificate = params.self_signed(&key_pair)?;

        Ok(Self {
            certificate: Certificate::from_der(certificate.der().as_ref())?,
            private_key: key_pair.serialize_der(),
        })
    }

    pub fn signer(&self, trusted: Vec<Certificate>) -> anyhow::Result<XmlSigner> {
        Ok(XmlSigner::from_pkcs8(
            &self.private_key,
            SignatureAlgorithm::Es384,
            self.certificate.clone(),
            trusted,
        )?)
    }
}

/// A connector in country CA and a proxy service in country CB that trust
/// each other.
pub struct Federation {
    pub connector: Identity,
    pub proxy: Identity,
}

impl Federation {
    pub fn new() -> anyhow::Result<Self> {
        init_tracing();
        Ok(Self {
            connector: Identity::generate("CA")?,
            proxy: Identity::generate("CB")?,
        })
    }

    pub fn connector_builder(&self, config: EngineConfig, at: DateTime<Utc>) -> anyhow::Result<ProtocolEngineBuilder> {
        Ok(ProtocolEngine::builder(config)
            .signer(self.connector.signer(vec![self.proxy.certificate.clone()])?)
            .processor(EidasProtocolProcessor::new().with_trusted_issuer(PROXY, self.proxy.certificate.clone()))
            .decrypter(AesGcmAssertionCipher::new(KEY_NAME, &KEY)?)
            .clock(FixedClock(at)))
    }

    pub fn proxy_builder(&self, config: EngineConfig) -> anyhow::Result<ProtocolEngineBuilder> {
        Ok(ProtocolEngine::builder(config)
            .signer(self.proxy.signer(vec![self.connector.certificate.clone()])?)
            .processor(
                EidasProtocolProcessor::new().with_trusted_issuer(CONNECTOR, self.connector.certificate.clone()),
            )
            .encrypter(AesGcmAssertionCipher::new(KEY_NAME, &KEY)?)
            .clock(FixedClock(now())))
    }

    /// Connector engine with default configuration, clock at `at`.
    pub fn connector_at(&self, at: DateTime<Utc>) -> anyhow::Result<ProtocolEngine> {
        Ok(self.connector_builder(EngineConfig::new("connector-ca"), at)?.build()?)
    }

    pub fn connector(&self) -> anyhow::Result<ProtocolEngine> {
        self.connector_at(now())
    }

    pub fn proxy(&self) -> anyhow::Result<ProtocolEngine> {
        Ok(self.proxy_builder(EngineConfig::new("proxy-cb"))?.build()?)
    }
}

/// A request for the person identifier and family name at substantial LoA.
pub fn request() -> AuthenticationRequest {
    AuthenticationRequest::builder(CONNECTOR)
        .destination(SSO_URL)
        .assertion_consumer_service_url(ACS_URL)
        .provider_name("Tax portal")
        .level_of_assurance(LevelOfAssurance::Substantial)
        .requested_attribute(RequestedAttribute {
            name: natural_person::PERSON_IDENTIFIER.to_string(),
            friendly_name: Some("PersonIdentifier".to_string()),
            name_format: Some(attribute_name_formats::URI.to_string()),
            is_required: true,
        })
        .requested_attribute(RequestedAttribute {
            name: natural_person::CURRENT_FAMILY_NAME.to_string(),
            friendly_name: Some("FamilyName".to_string()),
            name_format: Some(attribute_name_formats::URI.to_string()),
            is_required: false,
        })
        .build()
}

/// Attributes the proxy releases for `request`.
pub fn response_to(request: &AuthenticationRequest) -> AuthenticationResponse {
    AuthenticationResponse::builder(PROXY, request.id())
        .attribute(natural_person::PERSON_IDENTIFIER, vec!["CB/CA/0123456789".to_string()])
        .attribute(natural_person::CURRENT_FAMILY_NAME, vec!["Garcia".to_string()])
        .level_of_assurance(LevelOfAssurance::Substantial.uri())
        .build()
}

/// Flips one byte inside the first occurrence of `needle`.
pub fn corrupt(bytes: &[u8], needle: &str) -> Vec<u8> {
    let mut corrupted = bytes.to_vec();
    let position = bytes
        .windows(needle.len())
        .position(|window| window == needle.as_bytes())
        .expect("needle present in message");
    corrupted[position] ^= 0x01;
    corrupted
}
