//! Assertion encryption.
//!
//! Assertions in a response are sealed one by one with AES-256-GCM under a
//! named key. The key name travels in `ds:KeyInfo/ds:KeyName` so the
//! receiving node can pick the matching key.

use std::collections::HashMap;
use std::fmt;

use base64::Engine;

use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::types::{encryption_algorithms, EncryptedAssertion, SamlObject, SAML_NS};
use crate::xml::{Element, Node, SecureXmlProcessor};

/// Replaces the assertions of a response element with encrypted ones.
pub trait Encrypter: Send + Sync {
    /// Encrypts every `saml2:Assertion` child of `response`.
    ///
    /// # Errors
    ///
    /// Fails if an assertion cannot be serialized or sealed.
    fn encrypt_assertions(&self, response: Element) -> EngineResult<Element>;
}

/// Restores the assertions of a response element.
pub trait Decrypter: Send + Sync {
    /// Decrypts every `saml2:EncryptedAssertion` child of `response`.
    ///
    /// # Errors
    ///
    /// Fails with `DECRYPTION_ERROR` if no matching key is configured or the
    /// ciphertext does not authenticate.
    fn decrypt_assertions(&self, response: Element) -> EngineResult<Element>;
}

/// AES-256-GCM assertion cipher holding named keys.
#[derive(Clone, Default)]
pub struct AesGcmAssertionCipher {
    encryption_key: Option<String>,
    keys: HashMap<String, Vec<u8>>,
}

impl AesGcmAssertionCipher {
    /// Creates a cipher that encrypts and decrypts with one named key.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless the key is 32 bytes.
    pub fn new(key_name: impl Into<String>, key: &[u8]) -> EngineResult<Self> {
        let key_name = key_name.into();
        Self::default()
            .with_decryption_key(key_name.clone(), key)
            .map(|cipher| Self {
                encryption_key: Some(key_name),
                ..cipher
            })
    }

    /// Adds a key accepted for decryption only.
    ///
    /// # Errors
    ///
    /// Returns a configuration error unless the key is 32 bytes.
    pub fn with_decryption_key(mut self, key_name: impl Into<String>, key: &[u8]) -> EngineResult<Self> {
        if key.len() != eidas_crypto::AES_256_KEY_LEN {
            return Err(EngineError::configuration(format!(
                "assertion key must be {} bytes, got {}",
                eidas_crypto::AES_256_KEY_LEN,
                key.len()
            )));
        }
        self.keys.insert(key_name.into(), key.to_vec());
        Ok(self)
    }

    /// Name of the key new assertions are sealed under.
    #[must_use]
    pub fn encryption_key_name(&self) -> Option<&str> {
        self.encryption_key.as_deref()
    }

    fn encrypt(&self, assertion: &Element) -> EngineResult<Element> {
        let key_name = self
            .encryption_key
            .as_deref()
            .ok_or_else(|| EngineError::configuration("no assertion encryption key configured"))?;
        let key = self
            .keys
            .get(key_name)
            .ok_or_else(|| EngineError::configuration(format!("unknown encryption key {key_name}")))?;

        let plaintext = SecureXmlProcessor::shared().serialize(assertion, true)?;
        let sealed = eidas_crypto::seal(key, &plaintext)
            .map_err(|e| EngineError::internal(e.to_string()).with_source(e))?;

        let cipher_value = base64::engine::general_purpose::STANDARD.encode(sealed);
        Ok(EncryptedAssertion::aes_gcm(key_name, cipher_value).to_element())
    }

    fn decrypt(&self, encrypted: &Element) -> EngineResult<Element> {
        let data = EncryptedAssertion::from_element(encrypted)?.encrypted_data;
        if data.encryption_method != encryption_algorithms::AES256_GCM {
            return Err(decryption_error(format!(
                "unsupported encryption method {}",
                data.encryption_method
            )));
        }

        let key = match data.key_name.as_deref() {
            Some(name) => self.keys.get(name),
            None if self.keys.len() == 1 => self.keys.values().next(),
            None => None,
        }
        .ok_or_else(|| {
            decryption_error(format!(
                "no decryption key named {}",
                data.key_name.as_deref().unwrap_or("<none>")
            ))
        })?;

        let sealed = base64::engine::general_purpose::STANDARD
            .decode(data.cipher_value.trim())
            .map_err(|e| decryption_error(e.to_string()).with_source(e))?;
        let plaintext =
            eidas_crypto::open(key, &sealed).map_err(|e| decryption_error(e.to_string()).with_source(e))?;

        let assertion = SecureXmlProcessor::shared()
            .parse(&plaintext)
            .map_err(|e| e.into_validation(ErrorCode::DecryptionError))?
            .into_root()?;
        if !assertion.is(SAML_NS, "Assertion") {
            return Err(decryption_error(format!(
                "decrypted element is {}, expected Assertion",
                assertion.name()
            )));
        }
        Ok(assertion)
    }
}

impl Encrypter for AesGcmAssertionCipher {
    fn encrypt_assertions(&self, mut response: Element) -> EngineResult<Element> {
        let mut count = 0_usize;
        for node in response.children_mut() {
            if let Node::Element(child) = node {
                if child.is(SAML_NS, "Assertion") {
                    *child = self.encrypt(child)?;
                    count += 1;
                }
            }
        }
        tracing::debug!(count, key = self.encryption_key.as_deref(), "assertions encrypted");
        Ok(response)
    }
}

impl Decrypter for AesGcmAssertionCipher {
    fn decrypt_assertions(&self, mut response: Element) -> EngineResult<Element> {
        let mut count = 0_usize;
        for node in response.children_mut() {
            if let Node::Element(child) = node {
                if child.is(SAML_NS, "EncryptedAssertion") {
                    *child = self.decrypt(child)?;
                    count += 1;
                }
            }
        }
        tracing::debug!(count, "assertions decrypted");
        Ok(response)
    }
}

impl fmt::Debug for AesGcmAssertionCipher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.keys.keys().collect();
        names.sort();
        f.debug_struct("AesGcmAssertionCipher")
            .field("encryption_key", &self.encryption_key)
            .field("keys", &names)
            .finish()
    }
}

fn decryption_error(message: impl Into<String>) -> EngineError {
    EngineError::validation_with_code(ErrorCode::DecryptionError, message)
}
