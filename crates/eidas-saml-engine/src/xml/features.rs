//! Hardened parser configuration.
//!
//! A [`ParserFactory`] only hands out parsers once every [`XmlFeature`] has
//! been set to its hardened value. Requesting any other value is refused
//! with a configuration error instead of being silently ignored.

use std::collections::BTreeMap;

use super::parser::XmlParser;
use crate::error::{EngineError, EngineResult};

/// Maximum element nesting accepted by hardened parsers.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Parser features governed by the hardened profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum XmlFeature {
    /// Secure processing limits.
    SecureProcessing,
    /// Reject documents carrying a DOCTYPE declaration.
    DisallowDoctype,
    /// Fetch external DTDs.
    LoadExternalDtd,
    /// Resolve external general entities.
    ExternalGeneralEntities,
    /// Resolve external parameter entities.
    ExternalParameterEntities,
    /// Process `xi:include` directives.
    XInclude,
    /// Expand entity references into their replacement text.
    ExpandEntityReferences,
    /// Resolve element and attribute prefixes to namespace URIs.
    NamespaceAware,
    /// Drop comments from the parsed tree.
    IgnoreComments,
}

impl XmlFeature {
    /// Every governed feature.
    pub const ALL: [Self; 9] = [
        Self::SecureProcessing,
        Self::DisallowDoctype,
        Self::LoadExternalDtd,
        Self::ExternalGeneralEntities,
        Self::ExternalParameterEntities,
        Self::XInclude,
        Self::ExpandEntityReferences,
        Self::NamespaceAware,
        Self::IgnoreComments,
    ];

    /// The value the hardened profile requires.
    #[must_use]
    pub const fn hardened_value(self) -> bool {
        match self {
            Self::SecureProcessing
            | Self::DisallowDoctype
            | Self::NamespaceAware
            | Self::IgnoreComments => true,
            Self::LoadExternalDtd
            | Self::ExternalGeneralEntities
            | Self::ExternalParameterEntities
            | Self::XInclude
            | Self::ExpandEntityReferences => false,
        }
    }

    /// Conventional feature identifier, as used by Xerces-style parsers.
    #[must_use]
    pub const fn uri(self) -> &'static str {
        match self {
            Self::SecureProcessing => "http://javax.xml.XMLConstants/feature/secure-processing",
            Self::DisallowDoctype => "http://apache.org/xml/features/disallow-doctype-decl",
            Self::LoadExternalDtd => "http://apache.org/xml/features/nonvalidating/load-external-dtd",
            Self::ExternalGeneralEntities => "http://xml.org/sax/features/external-general-entities",
            Self::ExternalParameterEntities => "http://xml.org/sax/features/external-parameter-entities",
            Self::XInclude => "http://apache.org/xml/features/xinclude",
            Self::ExpandEntityReferences => "urn:eidas:xml:features/expand-entity-references",
            Self::NamespaceAware => "http://xml.org/sax/features/namespaces",
            Self::IgnoreComments => "urn:eidas:xml:features/ignore-comments",
        }
    }

    /// Resolves a feature identifier.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|feature| feature.uri() == uri)
    }
}

/// Builds hardened [`XmlParser`] instances.
#[derive(Debug, Clone)]
pub struct ParserFactory {
    features: BTreeMap<XmlFeature, bool>,
    max_depth: usize,
}

impl Default for ParserFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ParserFactory {
    /// Creates an unconfigured factory. It refuses to build parsers until
    /// every feature has been set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            features: BTreeMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Sets a feature.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if `enabled` differs from the hardened value:
    /// the parser cannot operate in the weaker mode.
    pub fn set_feature(&mut self, feature: XmlFeature, enabled: bool) -> EngineResult<()> {
        if enabled != feature.hardened_value() {
            return Err(EngineError::configuration(format!(
                "feature {} cannot be set to {enabled}",
                feature.uri()
            )));
        }
        self.features.insert(feature, enabled);
        Ok(())
    }

    /// Sets a feature by identifier.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for unknown identifiers or insecure values.
    pub fn set_feature_by_uri(&mut self, uri: &str, enabled: bool) -> EngineResult<()> {
        let feature = XmlFeature::from_uri(uri)
            .ok_or_else(|| EngineError::configuration(format!("feature {uri} is not recognized")))?;
        self.set_feature(feature, enabled)
    }

    /// Current value of a feature, `None` if never set.
    #[must_use]
    pub fn feature(&self, feature: XmlFeature) -> Option<bool> {
        self.features.get(&feature).copied()
    }

    /// Caps element nesting depth.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` for a zero depth.
    pub fn set_max_depth(&mut self, max_depth: usize) -> EngineResult<()> {
        if max_depth == 0 {
            return Err(EngineError::configuration("maximum depth must be positive"));
        }
        self.max_depth = max_depth;
        Ok(())
    }

    /// Returns true once every feature carries its hardened value.
    #[must_use]
    pub fn is_hardened(&self) -> bool {
        XmlFeature::ALL
            .iter()
            .all(|feature| self.feature(*feature) == Some(feature.hardened_value()))
    }

    /// Builds a parser.
    ///
    /// # Errors
    ///
    /// Returns `Configuration` if the factory is not fully hardened.
    pub fn new_parser(&self) -> EngineResult<XmlParser> {
        if let Some(missing) = XmlFeature::ALL
            .iter()
            .find(|feature| self.feature(**feature) != Some(feature.hardened_value()))
        {
            return Err(EngineError::configuration(format!(
                "parser factory is not hardened: {} is not set",
                missing.uri()
            )));
        }
        Ok(XmlParser::new(self.max_depth))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hardened() -> ParserFactory {
        let mut factory = ParserFactory::new();
        for feature in XmlFeature::ALL {
            factory.set_feature(feature, feature.hardened_value()).expect("hardened value");
        }
        factory
    }

    #[test]
    fn unconfigured_factory_refuses_to_build() {
        let err = ParserFactory::new().new_parser().expect_err("unhardened");
        assert!(matches!(err, EngineError::Configuration { .. }));
    }

    #[test]
    fn hardened_factory_builds_parsers() {
        let factory = hardened();
        assert!(factory.is_hardened());
        assert!(factory.new_parser().is_ok());
    }

    #[test]
    fn insecure_values_are_refused() {
        let mut factory = hardened();
        for (feature, value) in [
            (XmlFeature::LoadExternalDtd, true),
            (XmlFeature::DisallowDoctype, false),
            (XmlFeature::XInclude, true),
            (XmlFeature::ExternalGeneralEntities, true),
        ] {
            let err = factory.set_feature(feature, value).expect_err("insecure");
            assert!(matches!(err, EngineError::Configuration { .. }));
        }
        assert!(factory.is_hardened());
    }

    #[test]
    fn unknown_feature_uri_is_refused() {
        let mut factory = ParserFactory::new();
        assert!(factory.set_feature_by_uri("urn:made-up", true).is_err());
        assert!(factory
            .set_feature_by_uri("http://apache.org/xml/features/disallow-doctype-decl", true)
            .is_ok());
    }

    #[test]
    fn zero_depth_is_refused() {
        assert!(ParserFactory::new().set_max_depth(0).is_err());
    }
}
