//! Pooled, hardened parse/serialize entry point.

use std::io::Read;
use std::sync::OnceLock;

use super::dom::{Document, Element};
use super::features::{ParserFactory, XmlFeature};
use super::parser::XmlParser;
use super::pool::ResourcePool;
use super::serializer::XmlSerializer;
use crate::error::{EngineError, EngineResult};

/// Hardened XML processor backed by three lock-free pools: factories,
/// parsers and serializers.
///
/// Parsers and serializers are not shared between concurrent callers. Each
/// call borrows one instance exclusively and returns it when done, whether
/// the call succeeded or not.
#[derive(Debug)]
pub struct SecureXmlProcessor {
    factories: ResourcePool<ParserFactory>,
    parsers: ResourcePool<XmlParser>,
    serializers: ResourcePool<XmlSerializer>,
}

impl Default for SecureXmlProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureXmlProcessor {
    /// Creates a processor with unbounded pools.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: ResourcePool::new("xml-factories"),
            parsers: ResourcePool::new("xml-parsers"),
            serializers: ResourcePool::new("xml-serializers"),
        }
    }

    /// Creates a processor whose pools keep at most `max_idle` idle instances each.
    #[must_use]
    pub fn with_max_idle(max_idle: usize) -> Self {
        Self {
            factories: ResourcePool::with_max_idle("xml-factories", max_idle),
            parsers: ResourcePool::with_max_idle("xml-parsers", max_idle),
            serializers: ResourcePool::with_max_idle("xml-serializers", max_idle),
        }
    }

    /// Process-wide processor, built on first use.
    pub fn shared() -> &'static Self {
        static SHARED: OnceLock<SecureXmlProcessor> = OnceLock::new();
        SHARED.get_or_init(Self::new)
    }

    /// Applies the full hardened feature set to `factory`.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the factory refuses any feature.
    pub fn configure(factory: &mut ParserFactory) -> EngineResult<()> {
        for feature in XmlFeature::ALL {
            factory.set_feature(feature, feature.hardened_value())?;
        }
        if !factory.is_hardened() {
            return Err(EngineError::configuration("parser factory did not accept the hardened profile"));
        }
        Ok(())
    }

    /// Parses bytes.
    ///
    /// # Errors
    ///
    /// Returns `MalformedXml` for ill-formed or forbidden input and
    /// `Configuration` if no hardened parser could be built.
    pub fn parse(&self, bytes: &[u8]) -> EngineResult<Document> {
        let mut parser = self.parsers.acquire_with(|| self.manufacture_parser())?;
        parser.parse(bytes)
    }

    /// Parses text.
    ///
    /// # Errors
    ///
    /// See [`SecureXmlProcessor::parse`].
    pub fn parse_str(&self, text: &str) -> EngineResult<Document> {
        self.parse(text.as_bytes())
    }

    /// Reads a stream to the end and parses it.
    ///
    /// # Errors
    ///
    /// Returns `MalformedXml` if reading fails, otherwise see
    /// [`SecureXmlProcessor::parse`].
    pub fn parse_reader<R: Read>(&self, mut reader: R) -> EngineResult<Document> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| EngineError::malformed(format!("failed to read XML input: {e}")).with_source(e))?;
        self.parse(&bytes)
    }

    /// Serializes an element as a UTF-8 document.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if writing fails.
    pub fn serialize(&self, element: &Element, omit_declaration: bool) -> EngineResult<Vec<u8>> {
        let mut serializer = self.serializers.acquire_with(|| Ok(XmlSerializer::new()))?;
        serializer.serialize(element, omit_declaration)
    }

    /// Serializes a document.
    ///
    /// # Errors
    ///
    /// Returns `MalformedXml` for an empty document, otherwise see
    /// [`SecureXmlProcessor::serialize`].
    pub fn serialize_document(&self, document: &Document, omit_declaration: bool) -> EngineResult<Vec<u8>> {
        self.serialize(document.require_root()?, omit_declaration)
    }

    /// Returns an empty document from a hardened builder.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if no hardened factory could be obtained.
    pub fn new_document(&self) -> EngineResult<Document> {
        let _factory = self.factories.acquire_with(Self::manufacture_factory)?;
        Ok(Document::default())
    }

    /// Idle parsers.
    #[must_use]
    pub fn available_parsers(&self) -> usize {
        self.parsers.available()
    }

    /// Idle serializers.
    #[must_use]
    pub fn available_serializers(&self) -> usize {
        self.serializers.available()
    }

    /// Idle factories.
    #[must_use]
    pub fn available_factories(&self) -> usize {
        self.factories.available()
    }

    fn manufacture_parser(&self) -> EngineResult<XmlParser> {
        let factory = self.factories.acquire_with(Self::manufacture_factory)?;
        factory.new_parser()
    }

    fn manufacture_factory() -> EngineResult<ParserFactory> {
        let mut factory = ParserFactory::new();
        Self::configure(&mut factory)?;
        tracing::debug!("created hardened XML parser factory");
        Ok(factory)
    }
}
