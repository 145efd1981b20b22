//! SAML Assertion types.
//!
//! Assertions contain statements about a subject made by an issuer.

use chrono::{DateTime, Utc};

use super::{
    confirmation_methods, expect, format_instant, issuer, issuer_of, optional_child,
    optional_instant, optional_text, parse_instant, prefixes, required_attribute, saml, NameId,
    SamlObject, SAML_NS, SAML_VERSION, XMLDSIG_NS,
};
use crate::error::{EngineError, EngineResult};
use crate::xml::Element;

/// SAML Assertion.
///
/// A package of information that supplies one or more statements made
/// by a SAML authority (the issuer).
#[derive(Debug, Clone)]
pub struct Assertion {
    /// Unique identifier for this assertion.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this assertion was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the node that issued this assertion.
    pub issuer: String,

    /// The subject of this assertion.
    pub subject: Option<Subject>,

    /// Conditions that must be evaluated for the assertion to be valid.
    pub conditions: Option<Conditions>,

    /// Authentication statement describing how the subject authenticated.
    pub authn_statement: Option<AuthnStatement>,

    /// Attribute statement containing attributes about the subject.
    pub attribute_statement: Option<AttributeStatement>,

    /// Whether the assertion carried an enveloped signature when read.
    pub signed: bool,

    /// The element this assertion was read from.
    source: Option<Element>,
}

impl Assertion {
    /// Creates a new assertion issued now.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self::issued_at(issuer, Utc::now())
    }

    /// Creates a new assertion with an explicit issue instant.
    #[must_use]
    pub fn issued_at(issuer: impl Into<String>, issue_instant: DateTime<Utc>) -> Self {
        Self {
            id: format!("_id{}", uuid::Uuid::new_v4()),
            version: SAML_VERSION.to_string(),
            issue_instant,
            issuer: issuer.into(),
            subject: None,
            conditions: None,
            authn_statement: None,
            attribute_statement: None,
            signed: false,
            source: None,
        }
    }

    /// Sets the subject.
    #[must_use]
    pub fn with_subject(mut self, subject: Subject) -> Self {
        self.subject = Some(subject);
        self
    }

    /// Sets the conditions.
    #[must_use]
    pub fn with_conditions(mut self, conditions: Conditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    /// Sets the authentication statement.
    #[must_use]
    pub fn with_authn_statement(mut self, statement: AuthnStatement) -> Self {
        self.authn_statement = Some(statement);
        self
    }

    /// Sets the attribute statement.
    #[must_use]
    pub fn with_attribute_statement(mut self, statement: AttributeStatement) -> Self {
        self.attribute_statement = Some(statement);
        self
    }

    /// The element this assertion was read from, as received.
    ///
    /// Signature checks run against this element rather than a re-marshalled
    /// copy. Assertions built in code have no source.
    #[must_use]
    pub fn source(&self) -> Option<&Element> {
        self.source.as_ref()
    }

    /// Bearer confirmations of the subject.
    pub fn bearer_confirmations(&self) -> impl Iterator<Item = &SubjectConfirmation> {
        self.subject
            .iter()
            .flat_map(|subject| subject.subject_confirmations.iter())
            .filter(|confirmation| confirmation.method == confirmation_methods::BEARER)
    }
}

impl SamlObject for Assertion {
    fn to_element(&self) -> Element {
        saml("Assertion")
            .declare_namespace(prefixes::SAML2, SAML_NS)
            .with_attribute("ID", self.id.as_str())
            .with_attribute("Version", self.version.as_str())
            .with_attribute("IssueInstant", format_instant(self.issue_instant))
            .with_child(issuer(&self.issuer))
            .with_optional_child(self.subject.as_ref().map(SamlObject::to_element))
            .with_optional_child(self.conditions.as_ref().map(SamlObject::to_element))
            .with_optional_child(self.authn_statement.as_ref().map(SamlObject::to_element))
            .with_optional_child(self.attribute_statement.as_ref().map(SamlObject::to_element))
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "Assertion")?;
        Ok(Self {
            id: required_attribute(element, "ID")?.to_string(),
            version: required_attribute(element, "Version")?.to_string(),
            issue_instant: parse_instant(required_attribute(element, "IssueInstant")?)?,
            issuer: issuer_of(element)
                .ok_or_else(|| EngineError::validation("Assertion is missing Issuer"))?,
            subject: optional_child(element, SAML_NS, "Subject")?,
            conditions: optional_child(element, SAML_NS, "Conditions")?,
            authn_statement: optional_child(element, SAML_NS, "AuthnStatement")?,
            attribute_statement: optional_child(element, SAML_NS, "AttributeStatement")?,
            signed: element.find_child(XMLDSIG_NS, "Signature").is_some(),
            source: Some(element.clone()),
        })
    }
}

/// Subject of a SAML assertion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    /// The name identifier of the subject.
    pub name_id: Option<NameId>,

    /// Subject confirmations.
    pub subject_confirmations: Vec<SubjectConfirmation>,
}

impl Subject {
    /// Creates a new subject with the given name ID.
    #[must_use]
    pub fn new(name_id: NameId) -> Self {
        Self {
            name_id: Some(name_id),
            subject_confirmations: Vec::new(),
        }
    }

    /// Adds a subject confirmation.
    #[must_use]
    pub fn with_confirmation(mut self, confirmation: SubjectConfirmation) -> Self {
        self.subject_confirmations.push(confirmation);
        self
    }
}

impl SamlObject for Subject {
    fn to_element(&self) -> Element {
        let mut element = saml("Subject")
            .with_optional_child(self.name_id.as_ref().map(SamlObject::to_element));
        for confirmation in &self.subject_confirmations {
            element.push_child(confirmation.to_element());
        }
        element
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "Subject")?;
        Ok(Self {
            name_id: optional_child(element, SAML_NS, "NameID")?,
            subject_confirmations: element
                .find_children(SAML_NS, "SubjectConfirmation")
                .map(SubjectConfirmation::from_element)
                .collect::<EngineResult<_>>()?,
        })
    }
}

/// Subject confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectConfirmation {
    /// Confirmation method URI.
    pub method: String,

    /// Confirmation data.
    pub subject_confirmation_data: Option<SubjectConfirmationData>,
}

impl SubjectConfirmation {
    /// Creates a bearer subject confirmation.
    #[must_use]
    pub fn bearer() -> Self {
        Self {
            method: confirmation_methods::BEARER.to_string(),
            subject_confirmation_data: None,
        }
    }

    /// Sets the confirmation data.
    #[must_use]
    pub fn with_data(mut self, data: SubjectConfirmationData) -> Self {
        self.subject_confirmation_data = Some(data);
        self
    }

    /// Returns true for the bearer method.
    #[must_use]
    pub fn is_bearer(&self) -> bool {
        self.method == confirmation_methods::BEARER
    }
}

impl SamlObject for SubjectConfirmation {
    fn to_element(&self) -> Element {
        saml("SubjectConfirmation")
            .with_attribute("Method", self.method.as_str())
            .with_optional_child(
                self.subject_confirmation_data
                    .as_ref()
                    .map(SamlObject::to_element),
            )
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "SubjectConfirmation")?;
        Ok(Self {
            method: required_attribute(element, "Method")?.to_string(),
            subject_confirmation_data: optional_child(
                element,
                SAML_NS,
                "SubjectConfirmationData",
            )?,
        })
    }
}

/// Subject confirmation data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectConfirmationData {
    /// ID of the request this confirms.
    pub in_response_to: Option<String>,

    /// Time after which the subject can no longer be confirmed.
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Time before which the subject cannot be confirmed.
    pub not_before: Option<DateTime<Utc>>,

    /// URL of the consumer the assertion is delivered to.
    pub recipient: Option<String>,

    /// Network address of the citizen's user agent.
    pub address: Option<String>,
}

impl SubjectConfirmationData {
    /// Creates confirmation data for a response to a request.
    #[must_use]
    pub fn for_request(request_id: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self {
            in_response_to: Some(request_id.into()),
            recipient: Some(recipient.into()),
            ..Self::default()
        }
    }

    /// Sets the user agent address.
    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the expiry.
    #[must_use]
    pub fn expires_at(mut self, not_on_or_after: DateTime<Utc>) -> Self {
        self.not_on_or_after = Some(not_on_or_after);
        self
    }
}

impl SamlObject for SubjectConfirmationData {
    fn to_element(&self) -> Element {
        saml("SubjectConfirmationData")
            .with_optional_attribute("Address", self.address.as_deref())
            .with_optional_attribute("InResponseTo", self.in_response_to.as_deref())
            .with_optional_attribute("NotBefore", self.not_before.map(format_instant))
            .with_optional_attribute("NotOnOrAfter", self.not_on_or_after.map(format_instant))
            .with_optional_attribute("Recipient", self.recipient.as_deref())
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "SubjectConfirmationData")?;
        Ok(Self {
            in_response_to: element.attribute("InResponseTo").map(str::to_string),
            not_on_or_after: optional_instant(element, "NotOnOrAfter")?,
            not_before: optional_instant(element, "NotBefore")?,
            recipient: element.attribute("Recipient").map(str::to_string),
            address: element.attribute("Address").map(str::to_string),
        })
    }
}

/// Assertion conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conditions {
    /// Earliest time the assertion is valid.
    pub not_before: Option<DateTime<Utc>>,

    /// Time at which the assertion expires.
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Audience restrictions.
    pub audience_restrictions: Vec<AudienceRestriction>,

    /// Whether the assertion is for one-time use only.
    pub one_time_use: bool,
}

impl Conditions {
    /// Creates conditions valid from `not_before` for `validity`.
    #[must_use]
    pub fn valid_for(not_before: DateTime<Utc>, validity: chrono::Duration) -> Self {
        Self {
            not_before: Some(not_before),
            not_on_or_after: not_before.checked_add_signed(validity),
            audience_restrictions: Vec::new(),
            one_time_use: false,
        }
    }

    /// Adds an audience restriction.
    #[must_use]
    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.audience_restrictions.push(AudienceRestriction {
            audiences: vec![audience.into()],
        });
        self
    }

    /// Sets the one-time use flag.
    #[must_use]
    pub const fn one_time_use(mut self) -> Self {
        self.one_time_use = true;
        self
    }
}

impl SamlObject for Conditions {
    fn to_element(&self) -> Element {
        let mut element = saml("Conditions")
            .with_optional_attribute("NotBefore", self.not_before.map(format_instant))
            .with_optional_attribute("NotOnOrAfter", self.not_on_or_after.map(format_instant));
        for restriction in &self.audience_restrictions {
            element.push_child(restriction.to_element());
        }
        if self.one_time_use {
            element.push_child(saml("OneTimeUse"));
        }
        element
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "Conditions")?;
        Ok(Self {
            not_before: optional_instant(element, "NotBefore")?,
            not_on_or_after: optional_instant(element, "NotOnOrAfter")?,
            audience_restrictions: element
                .find_children(SAML_NS, "AudienceRestriction")
                .map(AudienceRestriction::from_element)
                .collect::<EngineResult<_>>()?,
            one_time_use: element.find_child(SAML_NS, "OneTimeUse").is_some(),
        })
    }
}

/// Audience restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudienceRestriction {
    /// Allowed audiences.
    pub audiences: Vec<String>,
}

impl SamlObject for AudienceRestriction {
    fn to_element(&self) -> Element {
        let mut element = saml("AudienceRestriction");
        for audience in &self.audiences {
            element.push_child(saml("Audience").with_text(audience.as_str()));
        }
        element
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "AudienceRestriction")?;
        Ok(Self {
            audiences: element
                .find_children(SAML_NS, "Audience")
                .map(|audience| audience.text().trim().to_string())
                .collect(),
        })
    }
}

/// Authentication statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthnStatement {
    /// Time of authentication.
    pub authn_instant: DateTime<Utc>,

    /// Session index.
    pub session_index: Option<String>,

    /// Authentication context.
    pub authn_context: AuthnContext,

    /// Subject locality.
    pub subject_locality: Option<SubjectLocality>,
}

impl AuthnStatement {
    /// Creates an authentication statement with a context class reference.
    #[must_use]
    pub fn new(authn_instant: DateTime<Utc>, class_ref: impl Into<String>) -> Self {
        Self {
            authn_instant,
            session_index: None,
            authn_context: AuthnContext {
                authn_context_class_ref: Some(class_ref.into()),
                authn_context_decl_ref: None,
            },
            subject_locality: None,
        }
    }

    /// Sets the subject locality address.
    #[must_use]
    pub fn with_locality(mut self, address: impl Into<String>) -> Self {
        self.subject_locality = Some(SubjectLocality {
            address: Some(address.into()),
            dns_name: None,
        });
        self
    }
}

impl SamlObject for AuthnStatement {
    fn to_element(&self) -> Element {
        let locality = self.subject_locality.as_ref().map(|locality| {
            saml("SubjectLocality")
                .with_optional_attribute("Address", locality.address.as_deref())
                .with_optional_attribute("DNSName", locality.dns_name.as_deref())
        });
        let context = saml("AuthnContext")
            .with_optional_child(
                self.authn_context
                    .authn_context_class_ref
                    .as_ref()
                    .map(|class_ref| saml("AuthnContextClassRef").with_text(class_ref.as_str())),
            )
            .with_optional_child(
                self.authn_context
                    .authn_context_decl_ref
                    .as_ref()
                    .map(|decl_ref| saml("AuthnContextDeclRef").with_text(decl_ref.as_str())),
            );
        saml("AuthnStatement")
            .with_attribute("AuthnInstant", format_instant(self.authn_instant))
            .with_optional_attribute("SessionIndex", self.session_index.as_deref())
            .with_optional_child(locality)
            .with_child(context)
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "AuthnStatement")?;
        let context = element
            .find_child(SAML_NS, "AuthnContext")
            .ok_or_else(|| EngineError::validation("AuthnStatement is missing AuthnContext"))?;
        Ok(Self {
            authn_instant: parse_instant(required_attribute(element, "AuthnInstant")?)?,
            session_index: element.attribute("SessionIndex").map(str::to_string),
            authn_context: AuthnContext {
                authn_context_class_ref: optional_text(context, SAML_NS, "AuthnContextClassRef"),
                authn_context_decl_ref: optional_text(context, SAML_NS, "AuthnContextDeclRef"),
            },
            subject_locality: element.find_child(SAML_NS, "SubjectLocality").map(|locality| {
                SubjectLocality {
                    address: locality.attribute("Address").map(str::to_string),
                    dns_name: locality.attribute("DNSName").map(str::to_string),
                }
            }),
        })
    }
}

/// Authentication context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthnContext {
    /// Context class reference; the level of assurance in eIDAS.
    pub authn_context_class_ref: Option<String>,

    /// Context declaration reference.
    pub authn_context_decl_ref: Option<String>,
}

/// Subject locality.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectLocality {
    /// IP address.
    pub address: Option<String>,

    /// DNS name.
    pub dns_name: Option<String>,
}

/// Attribute statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeStatement {
    /// Attributes.
    pub attributes: Vec<Attribute>,
}

impl AttributeStatement {
    /// Creates an empty attribute statement.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an attribute.
    #[must_use]
    pub fn with_attribute(mut self, attr: Attribute) -> Self {
        self.attributes.push(attr);
        self
    }
}

impl SamlObject for AttributeStatement {
    fn to_element(&self) -> Element {
        let mut element = saml("AttributeStatement");
        for attribute in &self.attributes {
            element.push_child(attribute.to_element());
        }
        element
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "AttributeStatement")?;
        Ok(Self {
            attributes: element
                .find_children(SAML_NS, "Attribute")
                .map(Attribute::from_element)
                .collect::<EngineResult<_>>()?,
        })
    }
}

/// SAML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute name, a URI for eIDAS attributes.
    pub name: String,

    /// Attribute name format.
    pub name_format: Option<String>,

    /// Human-readable name.
    pub friendly_name: Option<String>,

    /// Attribute values.
    pub values: Vec<String>,
}

impl Attribute {
    /// Creates an attribute with the given values.
    #[must_use]
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            name_format: None,
            friendly_name: None,
            values,
        }
    }

    /// Creates a single-valued attribute.
    #[must_use]
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, vec![value.into()])
    }

    /// Sets the friendly name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets the name format.
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.name_format = Some(format.into());
        self
    }
}

impl SamlObject for Attribute {
    fn to_element(&self) -> Element {
        let mut element = saml("Attribute")
            .with_optional_attribute("FriendlyName", self.friendly_name.as_deref())
            .with_attribute("Name", self.name.as_str())
            .with_optional_attribute("NameFormat", self.name_format.as_deref());
        for value in &self.values {
            element.push_child(saml("AttributeValue").with_text(value.as_str()));
        }
        element
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "Attribute")?;
        Ok(Self {
            name: required_attribute(element, "Name")?.to_string(),
            name_format: element.attribute("NameFormat").map(str::to_string),
            friendly_name: element.attribute("FriendlyName").map(str::to_string),
            values: element
                .find_children(SAML_NS, "AttributeValue")
                .map(|value| value.text().trim().to_string())
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::types::{natural_person, LevelOfAssurance, NameIdFormat};

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap()
    }

    fn sample() -> Assertion {
        let now = instant();
        Assertion::issued_at("https://proxy.example.eu", now)
            .with_subject(
                Subject::new(NameId::with_format("CZ/BE/12345", NameIdFormat::Persistent))
                    .with_confirmation(
                        SubjectConfirmation::bearer().with_data(
                            SubjectConfirmationData::for_request("_req1", "https://sp.example.eu/acs")
                                .with_address("192.0.2.10")
                                .expires_at(now + Duration::minutes(5)),
                        ),
                    ),
            )
            .with_conditions(
                Conditions::valid_for(now, Duration::minutes(5))
                    .with_audience("https://sp.example.eu")
                    .one_time_use(),
            )
            .with_authn_statement(AuthnStatement::new(now, LevelOfAssurance::High.uri()))
            .with_attribute_statement(
                AttributeStatement::new()
                    .with_attribute(
                        Attribute::single(natural_person::CURRENT_FAMILY_NAME, "Novak")
                            .with_friendly_name("FamilyName"),
                    )
                    .with_attribute(Attribute::new(
                        natural_person::CURRENT_GIVEN_NAME,
                        vec!["Jan".to_string(), "Petr".to_string()],
                    )),
            )
    }

    #[test]
    fn assertion_creation() {
        let assertion = sample();
        assert!(assertion.id.starts_with("_id"));
        assert_eq!(assertion.issuer, "https://proxy.example.eu");
        assert!(assertion.source().is_none());
        assert_eq!(assertion.bearer_confirmations().count(), 1);
    }

    #[test]
    fn assertion_survives_dom() {
        let assertion = sample();
        let element = assertion.to_element();
        let read = Assertion::from_element(&element).unwrap();

        assert_eq!(read.id, assertion.id);
        assert_eq!(read.issue_instant, assertion.issue_instant);
        assert_eq!(read.subject, assertion.subject);
        assert_eq!(read.conditions, assertion.conditions);
        assert_eq!(read.authn_statement, assertion.authn_statement);
        assert_eq!(read.attribute_statement, assertion.attribute_statement);
        assert!(!read.signed);
        assert_eq!(read.source(), Some(&element));
    }

    #[test]
    fn assertion_without_issuer_is_rejected() {
        let mut element = sample().to_element();
        element.remove_child(SAML_NS, "Issuer");
        let err = Assertion::from_element(&element).unwrap_err();
        assert!(err.message().contains("Issuer"));
    }

    #[test]
    fn conditions_window_overflow_leaves_expiry_unset() {
        let conditions = Conditions::valid_for(DateTime::<Utc>::MAX_UTC, Duration::minutes(1));
        assert!(conditions.not_on_or_after.is_none());
    }
}
