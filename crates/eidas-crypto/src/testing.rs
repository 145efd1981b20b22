//! Shared test fixtures.

use crate::certificate::Certificate;

/// Generates a self-signed ECDSA P-384 certificate with the given country
/// and returns it with the PKCS#8 private key.
pub(crate) fn self_signed(country: &str) -> (Certificate, Vec<u8>) {
    let key_pair = rcgen::KeyPair::generate_for(&rcgen::PKCS_ECDSA_P384_SHA384).expect("keygen");
    let mut params = rcgen::CertificateParams::new(vec!["node.eidas.test".to_string()]).expect("params");
    params.distinguished_name.push(rcgen::DnType::CountryName, country);
    params.distinguished_name.push(rcgen::DnType::CommonName, "eIDAS test node");
    let cert = params.self_signed(&key_pair).expect("self-signed");

    let certificate = Certificate::from_der(cert.der().as_ref()).expect("certificate");
    (certificate, key_pair.serialize_der())
}
