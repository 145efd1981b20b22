//! SAML 2.0 and eIDAS constants and URIs.
//!
//! Contains namespace URIs, name ID formats, status codes and the eIDAS
//! specific values (levels of assurance, SP types, attribute names).

/// SAML 2.0 assertion namespace URI.
pub const SAML_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

/// SAML 2.0 protocol namespace URI.
pub const SAMLP_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// XML Digital Signature namespace URI.
pub const XMLDSIG_NS: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Encryption namespace URI.
pub const XMLENC_NS: &str = "http://www.w3.org/2001/04/xmlenc#";

/// eIDAS SAML extensions namespace URI.
pub const EIDAS_NS: &str = "http://eidas.europa.eu/saml-extensions";

/// Format of an entity identifier, used on `Issuer`.
pub const ENTITY_FORMAT: &str = "urn:oasis:names:tc:SAML:2.0:nameid-format:entity";

/// The only protocol version the engine speaks.
pub const SAML_VERSION: &str = "2.0";

/// Prefixes used when marshalling.
pub mod prefixes {
    /// Assertion namespace prefix.
    pub const SAML2: &str = "saml2";
    /// Protocol namespace prefix.
    pub const SAML2P: &str = "saml2p";
    /// XML-DSig namespace prefix.
    pub const DS: &str = "ds";
    /// XML Encryption namespace prefix.
    pub const XENC: &str = "xenc";
    /// eIDAS extensions namespace prefix.
    pub const EIDAS: &str = "eidas";
}

// ============================================================================
// Binding URIs
// ============================================================================

/// SAML binding types accepted as `ProtocolBinding`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SamlBinding {
    /// HTTP POST binding.
    #[default]
    HttpPost,
    /// HTTP Redirect binding.
    HttpRedirect,
}

impl SamlBinding {
    /// Returns the URI for this binding.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::HttpPost => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST",
            Self::HttpRedirect => "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect",
        }
    }

    /// Parses a binding from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" => Some(Self::HttpPost),
            "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect" => Some(Self::HttpRedirect),
            _ => None,
        }
    }
}

// ============================================================================
// Name ID Formats
// ============================================================================

/// SAML Name ID formats used by eIDAS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NameIdFormat {
    /// Unspecified name ID format.
    #[default]
    Unspecified,
    /// Persistent identifier.
    Persistent,
    /// Transient identifier.
    Transient,
}

impl NameIdFormat {
    /// Returns the URI for this format.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Unspecified => "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified",
            Self::Persistent => "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent",
            Self::Transient => "urn:oasis:names:tc:SAML:2.0:nameid-format:transient",
        }
    }

    /// Parses a format from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified" => Some(Self::Unspecified),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:persistent" => Some(Self::Persistent),
            "urn:oasis:names:tc:SAML:2.0:nameid-format:transient" => Some(Self::Transient),
            _ => None,
        }
    }
}

// ============================================================================
// eIDAS Levels of Assurance
// ============================================================================

/// eIDAS level of assurance, carried as `AuthnContextClassRef`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LevelOfAssurance {
    /// Low.
    Low,
    /// Substantial.
    Substantial,
    /// High.
    High,
}

impl LevelOfAssurance {
    /// Returns the URI for this level.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::Low => "http://eidas.europa.eu/LoA/low",
            Self::Substantial => "http://eidas.europa.eu/LoA/substantial",
            Self::High => "http://eidas.europa.eu/LoA/high",
        }
    }

    /// Parses a level from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            "http://eidas.europa.eu/LoA/low" => Some(Self::Low),
            "http://eidas.europa.eu/LoA/substantial" => Some(Self::Substantial),
            "http://eidas.europa.eu/LoA/high" => Some(Self::High),
            _ => None,
        }
    }
}

/// eIDAS service provider sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpType {
    /// Public sector relying party.
    Public,
    /// Private sector relying party.
    Private,
}

impl SpType {
    /// Returns the wire value.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    /// Parses the wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Attribute name formats.
pub mod attribute_name_formats {
    /// URI reference name format (eIDAS default).
    pub const URI: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:uri";

    /// Unspecified name format.
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:attrname-format:unspecified";
}

/// eIDAS natural person attribute names.
pub mod natural_person {
    /// Unique person identifier.
    pub const PERSON_IDENTIFIER: &str = "http://eidas.europa.eu/attributes/naturalperson/PersonIdentifier";

    /// Current family name.
    pub const CURRENT_FAMILY_NAME: &str = "http://eidas.europa.eu/attributes/naturalperson/CurrentFamilyName";

    /// Current given name.
    pub const CURRENT_GIVEN_NAME: &str = "http://eidas.europa.eu/attributes/naturalperson/CurrentGivenName";

    /// Date of birth.
    pub const DATE_OF_BIRTH: &str = "http://eidas.europa.eu/attributes/naturalperson/DateOfBirth";
}

/// Consent URIs.
pub mod consent {
    /// Consent unspecified.
    pub const UNSPECIFIED: &str = "urn:oasis:names:tc:SAML:2.0:consent:unspecified";

    /// Consent obtained.
    pub const OBTAINED: &str = "urn:oasis:names:tc:SAML:2.0:consent:obtained";
}

/// Subject confirmation methods.
pub mod confirmation_methods {
    /// Bearer confirmation method URI.
    pub const BEARER: &str = "urn:oasis:names:tc:SAML:2.0:cm:bearer";
}

// ============================================================================
// Status Codes
// ============================================================================

/// Top-level SAML status codes.
pub mod status_codes {
    /// Success status code.
    pub const SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";

    /// Requester error status code.
    pub const REQUESTER: &str = "urn:oasis:names:tc:SAML:2.0:status:Requester";

    /// Responder error status code.
    pub const RESPONDER: &str = "urn:oasis:names:tc:SAML:2.0:status:Responder";
}

/// Second-level SAML status codes.
pub mod sub_status_codes {
    /// Authentication failed.
    pub const AUTHN_FAILED: &str = "urn:oasis:names:tc:SAML:2.0:status:AuthnFailed";

    /// Request denied.
    pub const REQUEST_DENIED: &str = "urn:oasis:names:tc:SAML:2.0:status:RequestDenied";
}

// ============================================================================
// Signature and Encryption Algorithms
// ============================================================================

/// Canonicalization algorithms.
pub mod canonicalization_algorithms {
    /// Exclusive C14N without comments.
    pub const EXCLUSIVE_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
}

/// Reference transforms.
pub mod transforms {
    /// Enveloped signature transform.
    pub const ENVELOPED_SIGNATURE: &str = "http://www.w3.org/2000/09/xmldsig#enveloped-signature";
}

/// XML Encryption identifiers.
pub mod encryption_algorithms {
    /// AES-256-GCM block encryption.
    pub const AES256_GCM: &str = "http://www.w3.org/2009/xmlenc11#aes256-gcm";

    /// `EncryptedData` type for an encrypted element.
    pub const TYPE_ELEMENT: &str = "http://www.w3.org/2001/04/xmlenc#Element";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_uri_roundtrip() {
        for binding in [SamlBinding::HttpPost, SamlBinding::HttpRedirect] {
            assert_eq!(SamlBinding::from_uri(binding.uri()), Some(binding));
        }
    }

    #[test]
    fn loa_is_ordered() {
        assert!(LevelOfAssurance::Low < LevelOfAssurance::Substantial);
        assert!(LevelOfAssurance::Substantial < LevelOfAssurance::High);
        assert_eq!(
            LevelOfAssurance::from_uri("http://eidas.europa.eu/LoA/high"),
            Some(LevelOfAssurance::High)
        );
        assert_eq!(LevelOfAssurance::from_uri("http://example.com/loa"), None);
    }

    #[test]
    fn sp_type_parses_wire_values() {
        assert_eq!(SpType::parse("public"), Some(SpType::Public));
        assert_eq!(SpType::parse("Public"), None);
    }

    #[test]
    fn name_id_format_roundtrip() {
        for format in [NameIdFormat::Unspecified, NameIdFormat::Persistent, NameIdFormat::Transient] {
            assert_eq!(NameIdFormat::from_uri(format.uri()), Some(format));
        }
    }
}
