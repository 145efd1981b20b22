//! Engine assembly.

use std::sync::Arc;

use super::ProtocolEngine;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::encryption::{Decrypter, Encrypter};
use crate::error::{EngineError, EngineResult};
use crate::processor::ProtocolProcessor;
use crate::schema::{SamlSchemaValidator, SchemaValidator};
use crate::signature::Signer;
use crate::validation::{ValidatorRegistry, CORE_SCHEMA_VALIDATOR_ID};

/// Builder for [`ProtocolEngine`].
///
/// The signer and the protocol processor have no default. The schema
/// validator, suite registry and clock default to the built-in ones.
pub struct ProtocolEngineBuilder {
    config: EngineConfig,
    signer: Option<Arc<dyn Signer>>,
    processor: Option<Arc<dyn ProtocolProcessor>>,
    schema_validator: Arc<dyn SchemaValidator>,
    registry: ValidatorRegistry,
    clock: Arc<dyn Clock>,
    encrypter: Option<Arc<dyn Encrypter>>,
    decrypter: Option<Arc<dyn Decrypter>>,
}

impl ProtocolEngineBuilder {
    pub(crate) fn new(config: EngineConfig) -> Self {
        Self {
            config,
            signer: None,
            processor: None,
            schema_validator: Arc::new(SamlSchemaValidator::new()),
            registry: ValidatorRegistry::default(),
            clock: Arc::new(SystemClock),
            encrypter: None,
            decrypter: None,
        }
    }

    /// Sets the signer.
    #[must_use]
    pub fn signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Sets the protocol processor.
    #[must_use]
    pub fn processor(mut self, processor: impl ProtocolProcessor + 'static) -> Self {
        self.processor = Some(Arc::new(processor));
        self
    }

    /// Replaces the schema validator.
    #[must_use]
    pub fn schema_validator(mut self, validator: impl SchemaValidator + 'static) -> Self {
        self.schema_validator = Arc::new(validator);
        self
    }

    /// Replaces the validator suite registry.
    #[must_use]
    pub fn registry(mut self, registry: ValidatorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the clock.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Sets the assertion encrypter.
    #[must_use]
    pub fn encrypter(mut self, encrypter: impl Encrypter + 'static) -> Self {
        self.encrypter = Some(Arc::new(encrypter));
        self
    }

    /// Sets the assertion decrypter.
    #[must_use]
    pub fn decrypter(mut self, decrypter: impl Decrypter + 'static) -> Self {
        self.decrypter = Some(Arc::new(decrypter));
        self
    }

    /// Builds the engine.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the signer or processor is missing,
    /// the signer's algorithm is not the configured one, a suite the
    /// processor names is not registered, or encryption is mandatory
    /// without an encrypter.
    pub fn build(self) -> EngineResult<ProtocolEngine> {
        let signer = self
            .signer
            .ok_or_else(|| EngineError::configuration("engine has no signer"))?;
        if signer.algorithm() != self.config.signature_algorithm {
            return Err(EngineError::configuration(format!(
                "signer uses {} but {} is configured",
                signer.algorithm(),
                self.config.signature_algorithm
            )));
        }
        let processor = self
            .processor
            .ok_or_else(|| EngineError::configuration("engine has no protocol processor"))?;

        let encrypter = if self.config.response_encryption_mandatory {
            Some(self.encrypter.ok_or_else(|| {
                EngineError::configuration("response encryption is mandatory but no encrypter is configured")
            })?)
        } else if self.encrypter.is_some() {
            tracing::warn!(
                instance = %self.config.instance_name,
                "encrypter ignored: response encryption is not mandatory, assertions are sent in clear"
            );
            None
        } else {
            None
        };

        let core_suite = self.registry.get(CORE_SCHEMA_VALIDATOR_ID)?;
        let request_suite = self.registry.get(processor.request_validator_id())?;
        let response_suite = self.registry.get(processor.response_validator_id())?;

        if self.config.validate_signature {
            tracing::info!(instance = %self.config.instance_name, "protocol engine built");
        } else {
            tracing::warn!(
                instance = %self.config.instance_name,
                "signature validation is disabled; received messages are not authenticated"
            );
        }

        Ok(ProtocolEngine {
            config: self.config,
            signer,
            processor,
            schema_validator: self.schema_validator,
            core_suite,
            request_suite,
            response_suite,
            clock: self.clock,
            encrypter,
            decrypter: self.decrypter,
        })
    }
}
