//! Hardened XML processing.
//!
//! - [`dom`] - owned document model shared by parsing and marshalling
//! - [`SecureXmlProcessor`] - pooled parse/serialize entry point
//! - [`ParserFactory`] / [`XmlFeature`] - the hardened parser profile
//! - [`ResourcePool`] - the lock-free pool behind the processor

pub mod dom;
mod features;
mod parser;
mod pool;
mod processor;
mod serializer;

pub use dom::{Attribute, Document, Element, Node};
pub use features::{ParserFactory, XmlFeature, DEFAULT_MAX_DEPTH};
pub use parser::XmlParser;
pub use pool::{Pooled, ResourcePool};
pub use processor::SecureXmlProcessor;
pub use serializer::XmlSerializer;
