//! Hardened SAML 2.0 protocol engine for eIDAS nodes.
//!
//! This crate produces and consumes eIDAS authentication requests and
//! responses:
//!
//! - **Generation** - map a semantic request or response to SAML, sign it
//!   (and its assertions), encrypt assertions, serialize
//! - **Consumption** - schema check, signature and decryption, core and
//!   eIDAS validator suites, then assertion rules (audience, one-time use,
//!   validity window, bearer IP)
//! - **Hardened XML** - no DOCTYPE, no entities, pooled parsers and
//!   serializers shared across threads
//!
//! # Architecture
//!
//! - [`engine`] - [`ProtocolEngine`], the single entry point
//! - [`processor`] - mapping between [`model`] and [`types`]
//! - [`signature`] - enveloped XML-DSig signing and validation
//! - [`encryption`] - AES-256-GCM assertion encryption
//! - [`schema`] and [`validation`] - grammar, suites and assertion rules
//! - [`xml`] - the hardened parser, serializer and DOM
//! - [`config`], [`clock`] and [`error`] - ambient concerns
//!
//! # Example
//!
//! ```rust,ignore
//! use eidas_saml_engine::{EidasProtocolProcessor, EngineConfig, ProtocolEngine, XmlSigner};
//!
//! let engine = ProtocolEngine::builder(EngineConfig::from_env()?)
//!     .signer(XmlSigner::from_pkcs8(&key, algorithm, certificate, trusted)?)
//!     .processor(EidasProtocolProcessor::new().with_trusted_issuer(proxy, proxy_certificate))
//!     .build()?;
//!
//! let message = engine.generate_request_message(Some(&request), connector)?;
//! ```
//!
//! # Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [eIDAS SAML Message Format](https://ec.europa.eu/digital-building-blocks/sites/display/DIGITAL/eIDAS+eID+Profile)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod clock;
pub mod config;
pub mod encryption;
pub mod engine;
pub mod error;
pub mod model;
pub mod processor;
pub mod schema;
pub mod signature;
pub mod types;
pub mod validation;
pub mod xml;

#[cfg(test)]
mod testing;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::EngineConfig;
pub use encryption::{AesGcmAssertionCipher, Decrypter, Encrypter};
pub use engine::{CorrelatedResponse, ProtocolEngine, ProtocolEngineBuilder, ResponseValidationState};
pub use error::{EngineError, EngineResult, ErrorCode};
pub use model::{
    AttributeMap, AuthenticationRequest, AuthenticationResponse, BinaryMessage, RequestMessage,
    ResponseMessage, ResponseStatus,
};
pub use processor::{EidasProtocolProcessor, ProtocolProcessor, ResponseValidationParams};
pub use schema::{SamlSchemaValidator, SchemaValidator};
pub use signature::{Signer, XmlSigner};
pub use validation::{ValidatorRegistry, ValidatorSuite};
pub use xml::SecureXmlProcessor;
