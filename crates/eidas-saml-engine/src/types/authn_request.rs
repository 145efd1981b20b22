//! SAML AuthnRequest types.
//!
//! Authentication request sent by a connector to a proxy service, with the
//! eIDAS extensions for the SP type and the requested attributes.

use chrono::{DateTime, Utc};

use super::{
    eidas, expect, format_instant, issuer, issuer_of, optional_child, parse_boolean,
    parse_instant, prefixes, required_attribute, saml, samlp, signature_certificate, NameIdFormat,
    SamlBinding, SamlObject, SpType, EIDAS_NS, SAMLP_NS, SAML_NS, SAML_VERSION, XMLDSIG_NS,
};
use crate::error::{EngineError, EngineResult};
use crate::xml::Element;

/// SAML Authentication Request.
#[derive(Debug, Clone)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the connector issuing the request.
    pub issuer: String,

    /// The URL where the response should be sent.
    pub assertion_consumer_service_url: Option<String>,

    /// The URL the request is sent to.
    pub destination: Option<String>,

    /// Binding to use for the response.
    pub protocol_binding: Option<String>,

    /// Name ID policy constraints.
    pub name_id_policy: Option<NameIdPolicy>,

    /// Requested authentication context.
    pub requested_authn_context: Option<RequestedAuthnContext>,

    /// Whether the citizen must authenticate again.
    pub force_authn: bool,

    /// Whether the proxy service must not interact with the citizen.
    pub is_passive: bool,

    /// A human-readable name for the requester.
    pub provider_name: Option<String>,

    /// Consent obtained for this request.
    pub consent: Option<String>,

    /// eIDAS extensions.
    pub extensions: Option<Extensions>,

    /// Whether the request carried an enveloped signature when read.
    pub signed: bool,

    /// Base64 certificate from the signature's `KeyInfo`, when read.
    pub signature_certificate: Option<String>,
}

impl AuthnRequest {
    /// Creates a new authentication request.
    #[must_use]
    pub fn new(id: impl Into<String>, issuer: impl Into<String>, issue_instant: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            version: SAML_VERSION.to_string(),
            issue_instant,
            issuer: issuer.into(),
            assertion_consumer_service_url: None,
            destination: None,
            protocol_binding: None,
            name_id_policy: None,
            requested_authn_context: None,
            force_authn: false,
            is_passive: false,
            provider_name: None,
            consent: None,
            extensions: None,
            signed: false,
            signature_certificate: None,
        }
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Sets the protocol binding for the response.
    #[must_use]
    pub fn with_binding(mut self, binding: SamlBinding) -> Self {
        self.protocol_binding = Some(binding.uri().to_string());
        self
    }

    /// Sets the name ID policy.
    #[must_use]
    pub fn with_name_id_policy(mut self, policy: NameIdPolicy) -> Self {
        self.name_id_policy = Some(policy);
        self
    }

    /// Sets the requested authentication context.
    #[must_use]
    pub fn with_authn_context(mut self, context: RequestedAuthnContext) -> Self {
        self.requested_authn_context = Some(context);
        self
    }

    /// Sets force authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Sets the provider name.
    #[must_use]
    pub fn with_provider_name(mut self, name: impl Into<String>) -> Self {
        self.provider_name = Some(name.into());
        self
    }

    /// Sets the consent URI.
    #[must_use]
    pub fn with_consent(mut self, consent: impl Into<String>) -> Self {
        self.consent = Some(consent.into());
        self
    }

    /// Sets the eIDAS extensions.
    #[must_use]
    pub fn with_extensions(mut self, extensions: Extensions) -> Self {
        self.extensions = Some(extensions);
        self
    }

    /// Returns the parsed protocol binding.
    #[must_use]
    pub fn parsed_binding(&self) -> Option<SamlBinding> {
        self.protocol_binding.as_deref().and_then(SamlBinding::from_uri)
    }

    /// Requested attributes, empty when no extensions are present.
    #[must_use]
    pub fn requested_attributes(&self) -> &[RequestedAttribute] {
        self.extensions
            .as_ref()
            .map_or(&[], |extensions| extensions.requested_attributes.as_slice())
    }
}

impl SamlObject for AuthnRequest {
    fn to_element(&self) -> Element {
        samlp("AuthnRequest")
            .declare_namespace(prefixes::SAML2P, SAMLP_NS)
            .declare_namespace(prefixes::SAML2, SAML_NS)
            .declare_namespace(prefixes::EIDAS, EIDAS_NS)
            .with_attribute("ID", self.id.as_str())
            .with_attribute("Version", self.version.as_str())
            .with_attribute("IssueInstant", format_instant(self.issue_instant))
            .with_optional_attribute("Destination", self.destination.as_deref())
            .with_optional_attribute("Consent", self.consent.as_deref())
            .with_attribute("ForceAuthn", self.force_authn.to_string())
            .with_attribute("IsPassive", self.is_passive.to_string())
            .with_optional_attribute("ProtocolBinding", self.protocol_binding.as_deref())
            .with_optional_attribute(
                "AssertionConsumerServiceURL",
                self.assertion_consumer_service_url.as_deref(),
            )
            .with_optional_attribute("ProviderName", self.provider_name.as_deref())
            .with_child(issuer(&self.issuer))
            .with_optional_child(self.extensions.as_ref().map(SamlObject::to_element))
            .with_optional_child(self.name_id_policy.as_ref().map(SamlObject::to_element))
            .with_optional_child(self.requested_authn_context.as_ref().map(SamlObject::to_element))
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAMLP_NS, "AuthnRequest")?;
        let flag = |name: &str| {
            element
                .attribute(name)
                .map_or(Ok(false), parse_boolean)
        };
        Ok(Self {
            id: required_attribute(element, "ID")?.to_string(),
            version: required_attribute(element, "Version")?.to_string(),
            issue_instant: parse_instant(required_attribute(element, "IssueInstant")?)?,
            issuer: issuer_of(element).unwrap_or_default(),
            assertion_consumer_service_url: element
                .attribute("AssertionConsumerServiceURL")
                .map(str::to_string),
            destination: element.attribute("Destination").map(str::to_string),
            protocol_binding: element.attribute("ProtocolBinding").map(str::to_string),
            name_id_policy: optional_child(element, SAMLP_NS, "NameIDPolicy")?,
            requested_authn_context: optional_child(element, SAMLP_NS, "RequestedAuthnContext")?,
            force_authn: flag("ForceAuthn")?,
            is_passive: flag("IsPassive")?,
            provider_name: element.attribute("ProviderName").map(str::to_string),
            consent: element.attribute("Consent").map(str::to_string),
            extensions: optional_child(element, SAMLP_NS, "Extensions")?,
            signed: element.find_child(XMLDSIG_NS, "Signature").is_some(),
            signature_certificate: signature_certificate(element),
        })
    }
}

/// Name ID policy for authentication requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameIdPolicy {
    /// The requested name ID format.
    pub format: Option<String>,

    /// Whether a new identifier may be created for this request.
    pub allow_create: bool,
}

impl NameIdPolicy {
    /// Creates a policy requesting a specific format.
    #[must_use]
    pub fn with_format(format: NameIdFormat) -> Self {
        Self {
            format: Some(format.uri().to_string()),
            allow_create: true,
        }
    }
}

impl SamlObject for NameIdPolicy {
    fn to_element(&self) -> Element {
        samlp("NameIDPolicy")
            .with_attribute("AllowCreate", self.allow_create.to_string())
            .with_optional_attribute("Format", self.format.as_deref())
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAMLP_NS, "NameIDPolicy")?;
        Ok(Self {
            format: element.attribute("Format").map(str::to_string),
            allow_create: element
                .attribute("AllowCreate")
                .map_or(Ok(false), parse_boolean)?,
        })
    }
}

/// Requested authentication context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestedAuthnContext {
    /// Comparison method for the authentication context.
    pub comparison: AuthnContextComparison,

    /// Acceptable authentication context class references.
    pub authn_context_class_refs: Vec<String>,
}

impl RequestedAuthnContext {
    /// Creates a context requiring at least the given class reference.
    #[must_use]
    pub fn minimum(class_ref: impl Into<String>) -> Self {
        Self {
            comparison: AuthnContextComparison::Minimum,
            authn_context_class_refs: vec![class_ref.into()],
        }
    }
}

impl SamlObject for RequestedAuthnContext {
    fn to_element(&self) -> Element {
        let mut element =
            samlp("RequestedAuthnContext").with_attribute("Comparison", self.comparison.as_str());
        for class_ref in &self.authn_context_class_refs {
            element.push_child(saml("AuthnContextClassRef").with_text(class_ref.as_str()));
        }
        element
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAMLP_NS, "RequestedAuthnContext")?;
        let comparison = match element.attribute("Comparison") {
            None => AuthnContextComparison::default(),
            Some(value) => AuthnContextComparison::parse(value).ok_or_else(|| {
                EngineError::validation(format!("invalid authentication context comparison \"{value}\""))
            })?,
        };
        Ok(Self {
            comparison,
            authn_context_class_refs: element
                .find_children(SAML_NS, "AuthnContextClassRef")
                .map(|class_ref| class_ref.text().trim().to_string())
                .collect(),
        })
    }
}

/// Authentication context comparison methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AuthnContextComparison {
    /// Exact match required.
    #[default]
    Exact,
    /// Match must be at least as strong.
    Minimum,
    /// Match must be at most as strong.
    Maximum,
    /// Match must be stronger.
    Better,
}

impl AuthnContextComparison {
    /// Returns the string value for this comparison.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Better => "better",
        }
    }

    /// Parses the wire value.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "exact" => Some(Self::Exact),
            "minimum" => Some(Self::Minimum),
            "maximum" => Some(Self::Maximum),
            "better" => Some(Self::Better),
            _ => None,
        }
    }
}

/// eIDAS request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extensions {
    /// Sector of the requesting service provider.
    pub sp_type: Option<SpType>,

    /// Attributes the service provider asks for.
    pub requested_attributes: Vec<RequestedAttribute>,
}

impl SamlObject for Extensions {
    fn to_element(&self) -> Element {
        let mut requested = eidas("RequestedAttributes");
        for attribute in &self.requested_attributes {
            requested.push_child(attribute.to_element());
        }
        samlp("Extensions")
            .with_optional_child(
                self.sp_type
                    .map(|sp_type| eidas("SPType").with_text(sp_type.as_str())),
            )
            .with_child(requested)
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAMLP_NS, "Extensions")?;
        let sp_type = match element.child_text(EIDAS_NS, "SPType") {
            None => None,
            Some(value) => Some(SpType::parse(&value).ok_or_else(|| {
                EngineError::validation(format!("invalid SPType \"{value}\""))
            })?),
        };
        let requested_attributes = match element.find_child(EIDAS_NS, "RequestedAttributes") {
            None => Vec::new(),
            Some(requested) => requested
                .find_children(EIDAS_NS, "RequestedAttribute")
                .map(RequestedAttribute::from_element)
                .collect::<EngineResult<_>>()?,
        };
        Ok(Self {
            sp_type,
            requested_attributes,
        })
    }
}

/// An attribute requested through the eIDAS extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedAttribute {
    /// Attribute name URI.
    pub name: String,

    /// Human-readable name.
    pub friendly_name: Option<String>,

    /// Attribute name format.
    pub name_format: Option<String>,

    /// Whether the attribute is mandatory for the service provider.
    pub is_required: bool,
}

impl SamlObject for RequestedAttribute {
    fn to_element(&self) -> Element {
        eidas("RequestedAttribute")
            .with_optional_attribute("FriendlyName", self.friendly_name.as_deref())
            .with_attribute("Name", self.name.as_str())
            .with_optional_attribute("NameFormat", self.name_format.as_deref())
            .with_attribute("isRequired", self.is_required.to_string())
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, EIDAS_NS, "RequestedAttribute")?;
        Ok(Self {
            name: required_attribute(element, "Name")?.to_string(),
            friendly_name: element.attribute("FriendlyName").map(str::to_string),
            name_format: element.attribute("NameFormat").map(str::to_string),
            is_required: element
                .attribute("isRequired")
                .map_or(Ok(false), parse_boolean)?,
        })
    }
}
