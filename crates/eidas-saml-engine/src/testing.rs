//! Shared test fixtures.

use eidas_crypto::{Certificate, SignatureAlgorithm};

use crate::signature::XmlSigner;

/// A generated node identity: P-384 key and self-signed certificate.
pub(crate) struct Node {
    pub certificate: Certificate,
    pub private_key: Vec<u8>,
}

impl Node {
    pub fn generate(country: &str) -> Self {
        let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384).expect("keygen");
        let mut params =
            rcgen::CertificateParams::new(vec!["node.eidas.test".to_string()]).expect("params");
        params.distinguished_name.push(rcgen::DnType::CountryName, country);
        params.distinguished_name.push(rcgen::DnType::CommonName, format!("{country} eIDAS node"));
        let cert = params.self_signed(&key_pair).expect("self-signed");

        Self {
            certificate: Certificate::from_der(cert.der().as_ref()).expect("certificate"),
            private_key: key_pair.serialize_der(),
        }
    }
}

pub(crate) fn signer(node: &Node, trusted: Vec<Certificate>) -> XmlSigner {
    XmlSigner::from_pkcs8(
        &node.private_key,
        SignatureAlgorithm::Es384,
        node.certificate.clone(),
        trusted,
    )
    .expect("signer")
}

/// Installs a test subscriber once; `RUST_LOG` overrides the default filter.
pub(crate) fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("eidas_saml_engine=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
