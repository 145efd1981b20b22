//! Engine configuration.
//!
//! Loaded once from a TOML document, from `EIDAS_ENGINE_*` environment
//! variables, or built in code. The engine copies it at build time and
//! never changes it afterwards.

use std::path::Path;

use chrono::TimeDelta;
use eidas_crypto::SignatureAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::types::consent;

/// Environment variable prefix for [`EngineConfig::from_env`].
pub const ENV_PREFIX: &str = "EIDAS_ENGINE_";

/// Protocol engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Name of this engine instance, used in logs.
    pub instance_name: String,

    /// Verify signatures, decrypt assertions and check assertion signatures
    /// on received messages.
    #[serde(default = "default_true")]
    pub validate_signature: bool,

    /// Require bearer confirmation addresses to match the user IP.
    #[serde(default)]
    pub ip_validation: bool,

    /// Encrypt the assertions of generated responses.
    #[serde(default)]
    pub response_encryption_mandatory: bool,

    /// Validity of generated assertions in seconds.
    #[serde(default = "default_assertion_validity_secs")]
    pub assertion_validity_secs: u64,

    /// Consent URI placed on generated requests.
    #[serde(default = "default_consent_request")]
    pub consent_authn_request: String,

    /// Consent URI placed on generated responses.
    #[serde(default = "default_consent_response")]
    pub consent_authn_response: String,

    /// Name ID format used when a request names none.
    #[serde(default)]
    pub default_name_id_format: Option<String>,

    /// Signature algorithm for generated messages.
    #[serde(default = "default_signature_algorithm")]
    pub signature_algorithm: SignatureAlgorithm,
}

const fn default_true() -> bool {
    true
}

const fn default_assertion_validity_secs() -> u64 {
    300
}

fn default_consent_request() -> String {
    consent::UNSPECIFIED.to_string()
}

fn default_consent_response() -> String {
    consent::OBTAINED.to_string()
}

const fn default_signature_algorithm() -> SignatureAlgorithm {
    SignatureAlgorithm::Es384
}

impl EngineConfig {
    /// Creates a configuration with defaults for everything but the name.
    #[must_use]
    pub fn new(instance_name: impl Into<String>) -> Self {
        Self {
            instance_name: instance_name.into(),
            validate_signature: default_true(),
            ip_validation: false,
            response_encryption_mandatory: false,
            assertion_validity_secs: default_assertion_validity_secs(),
            consent_authn_request: default_consent_request(),
            consent_authn_response: default_consent_response(),
            default_name_id_format: None,
            signature_algorithm: default_signature_algorithm(),
        }
    }

    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the document does not parse.
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        toml::from_str(content).map_err(|e| {
            EngineError::configuration(format!("failed to parse engine config: {e}")).with_source(e)
        })
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> EngineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::configuration(format!("failed to read {}: {e}", path.display())).with_source(e)
        })?;
        Self::from_toml_str(&content)
    }

    /// Loads configuration from `EIDAS_ENGINE_*` environment variables.
    ///
    /// `EIDAS_ENGINE_INSTANCE_NAME` is required; everything else falls back
    /// to its default.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the instance name is missing or a
    /// value does not parse.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which receives the full
    /// variable name.
    ///
    /// # Errors
    ///
    /// See [`EngineConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> EngineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        let instance_name = var("INSTANCE_NAME").ok_or_else(|| {
            EngineError::configuration(format!("{ENV_PREFIX}INSTANCE_NAME is required"))
        })?;
        let mut config = Self::new(instance_name);

        if let Some(value) = var("VALIDATE_SIGNATURE") {
            config.validate_signature = parse_flag("VALIDATE_SIGNATURE", &value)?;
        }
        if let Some(value) = var("IP_VALIDATION") {
            config.ip_validation = parse_flag("IP_VALIDATION", &value)?;
        }
        if let Some(value) = var("RESPONSE_ENCRYPTION_MANDATORY") {
            config.response_encryption_mandatory = parse_flag("RESPONSE_ENCRYPTION_MANDATORY", &value)?;
        }
        if let Some(value) = var("ASSERTION_VALIDITY_SECS") {
            config.assertion_validity_secs = value.trim().parse().map_err(|e| {
                EngineError::configuration(format!(
                    "{ENV_PREFIX}ASSERTION_VALIDITY_SECS is not a number: {value}"
                ))
                .with_source(e)
            })?;
        }
        if let Some(value) = var("CONSENT_AUTHN_REQUEST") {
            config.consent_authn_request = value;
        }
        if let Some(value) = var("CONSENT_AUTHN_RESPONSE") {
            config.consent_authn_response = value;
        }
        config.default_name_id_format = var("DEFAULT_NAME_ID_FORMAT");
        if let Some(value) = var("SIGNATURE_ALGORITHM") {
            config.signature_algorithm = SignatureAlgorithm::from_name(value.trim())
                .map_err(|e| EngineError::configuration(e.to_string()).with_source(e))?;
        }

        Ok(config)
    }

    /// Assertion validity as a duration.
    #[must_use]
    pub fn assertion_validity(&self) -> TimeDelta {
        i64::try_from(self.assertion_validity_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }
}

fn parse_flag(name: &str, value: &str) -> EngineResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(EngineError::configuration(format!(
            "{ENV_PREFIX}{name} is not a boolean: {value}"
        ))),
    }
}
