//! Grammar check for incoming protocol messages.
//!
//! Runs on the raw bytes before any object mapping: the bytes are parsed by
//! the hardened processor, then every known SAML element is checked against
//! a static table of required attributes, lexical forms and child sequence.

use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::types::{parse_boolean, parse_instant, SAMLP_NS, SAML_NS, SAML_VERSION, XMLDSIG_NS, XMLENC_NS};
use crate::xml::{Document, Element, SecureXmlProcessor};

/// Validates raw message bytes against the protocol grammar.
pub trait SchemaValidator: Send + Sync {
    /// Parses and validates `bytes`, returning the document.
    ///
    /// # Errors
    ///
    /// Fails with a validation error if the bytes are not well-formed or
    /// break the grammar. Parser failures are kept as the error source.
    fn validate(&self, bytes: &[u8]) -> EngineResult<Document>;
}

/// One position in an element's child sequence.
struct Particle {
    names: &'static [(&'static str, &'static str)],
    min: usize,
    max: Option<usize>,
}

const fn optional(names: &'static [(&'static str, &'static str)]) -> Particle {
    Particle {
        names,
        min: 0,
        max: Some(1),
    }
}

const fn required(names: &'static [(&'static str, &'static str)]) -> Particle {
    Particle {
        names,
        min: 1,
        max: Some(1),
    }
}

const fn any_number(names: &'static [(&'static str, &'static str)]) -> Particle {
    Particle {
        names,
        min: 0,
        max: None,
    }
}

const fn at_least_one(names: &'static [(&'static str, &'static str)]) -> Particle {
    Particle {
        names,
        min: 1,
        max: None,
    }
}

impl Particle {
    fn matches(&self, element: &Element) -> bool {
        self.names
            .iter()
            .any(|(namespace, local_name)| element.is(namespace, local_name))
    }

    fn describe(&self) -> String {
        self.names
            .iter()
            .map(|(_, local_name)| *local_name)
            .collect::<Vec<_>>()
            .join("|")
    }
}

struct Rule {
    namespace: &'static str,
    name: &'static str,
    versioned: bool,
    required_attributes: &'static [&'static str],
    date_times: &'static [&'static str],
    booleans: &'static [&'static str],
    children: &'static [Particle],
}

const ISSUER: &[(&str, &str)] = &[(SAML_NS, "Issuer")];
const SIGNATURE: &[(&str, &str)] = &[(XMLDSIG_NS, "Signature")];
const EXTENSIONS: &[(&str, &str)] = &[(SAMLP_NS, "Extensions")];
const SUBJECT: &[(&str, &str)] = &[(SAML_NS, "Subject")];
const CONDITIONS: &[(&str, &str)] = &[(SAML_NS, "Conditions")];
const IDENTIFIER: &[(&str, &str)] = &[
    (SAML_NS, "BaseID"),
    (SAML_NS, "NameID"),
    (SAML_NS, "EncryptedID"),
];

static RULES: &[Rule] = &[
    Rule {
        namespace: SAMLP_NS,
        name: "AuthnRequest",
        versioned: true,
        required_attributes: &["ID", "Version", "IssueInstant"],
        date_times: &["IssueInstant"],
        booleans: &["ForceAuthn", "IsPassive"],
        children: &[
            optional(ISSUER),
            optional(SIGNATURE),
            optional(EXTENSIONS),
            optional(SUBJECT),
            optional(&[(SAMLP_NS, "NameIDPolicy")]),
            optional(CONDITIONS),
            optional(&[(SAMLP_NS, "RequestedAuthnContext")]),
            optional(&[(SAMLP_NS, "Scoping")]),
        ],
    },
    Rule {
        namespace: SAMLP_NS,
        name: "Response",
        versioned: true,
        required_attributes: &["ID", "Version", "IssueInstant"],
        date_times: &["IssueInstant"],
        booleans: &[],
        children: &[
            optional(ISSUER),
            optional(SIGNATURE),
            optional(EXTENSIONS),
            required(&[(SAMLP_NS, "Status")]),
            any_number(&[(SAML_NS, "Assertion"), (SAML_NS, "EncryptedAssertion")]),
        ],
    },
    Rule {
        namespace: SAMLP_NS,
        name: "Status",
        versioned: false,
        required_attributes: &[],
        date_times: &[],
        booleans: &[],
        children: &[
            required(&[(SAMLP_NS, "StatusCode")]),
            optional(&[(SAMLP_NS, "StatusMessage")]),
            optional(&[(SAMLP_NS, "StatusDetail")]),
        ],
    },
    Rule {
        namespace: SAMLP_NS,
        name: "StatusCode",
        versioned: false,
        required_attributes: &["Value"],
        date_times: &[],
        booleans: &[],
        children: &[optional(&[(SAMLP_NS, "StatusCode")])],
    },
    Rule {
        namespace: SAMLP_NS,
        name: "NameIDPolicy",
        versioned: false,
        required_attributes: &[],
        date_times: &[],
        booleans: &["AllowCreate"],
        children: &[],
    },
    Rule {
        namespace: SAML_NS,
        name: "Assertion",
        versioned: true,
        required_attributes: &["ID", "Version", "IssueInstant"],
        date_times: &["IssueInstant"],
        booleans: &[],
        children: &[
            required(ISSUER),
            optional(SIGNATURE),
            optional(SUBJECT),
            optional(CONDITIONS),
            optional(&[(SAML_NS, "Advice")]),
            any_number(&[
                (SAML_NS, "Statement"),
                (SAML_NS, "AuthnStatement"),
                (SAML_NS, "AuthzDecisionStatement"),
                (SAML_NS, "AttributeStatement"),
            ]),
        ],
    },
    Rule {
        namespace: SAML_NS,
        name: "Subject",
        versioned: false,
        required_attributes: &[],
        date_times: &[],
        booleans: &[],
        children: &[
            optional(IDENTIFIER),
            any_number(&[(SAML_NS, "SubjectConfirmation")]),
        ],
    },
    Rule {
        namespace: SAML_NS,
        name: "SubjectConfirmation",
        versioned: false,
        required_attributes: &["Method"],
        date_times: &[],
        booleans: &[],
        children: &[
            optional(IDENTIFIER),
            optional(&[(SAML_NS, "SubjectConfirmationData")]),
        ],
    },
    Rule {
        namespace: SAML_NS,
        name: "SubjectConfirmationData",
        versioned: false,
        required_attributes: &[],
        date_times: &["NotBefore", "NotOnOrAfter"],
        booleans: &[],
        children: &[],
    },
    Rule {
        namespace: SAML_NS,
        name: "Conditions",
        versioned: false,
        required_attributes: &[],
        date_times: &["NotBefore", "NotOnOrAfter"],
        booleans: &[],
        children: &[any_number(&[
            (SAML_NS, "Condition"),
            (SAML_NS, "AudienceRestriction"),
            (SAML_NS, "OneTimeUse"),
            (SAML_NS, "ProxyRestriction"),
        ])],
    },
    Rule {
        namespace: SAML_NS,
        name: "AudienceRestriction",
        versioned: false,
        required_attributes: &[],
        date_times: &[],
        booleans: &[],
        children: &[at_least_one(&[(SAML_NS, "Audience")])],
    },
    Rule {
        namespace: SAML_NS,
        name: "AuthnStatement",
        versioned: false,
        required_attributes: &["AuthnInstant"],
        date_times: &["AuthnInstant", "SessionNotOnOrAfter"],
        booleans: &[],
        children: &[
            optional(&[(SAML_NS, "SubjectLocality")]),
            required(&[(SAML_NS, "AuthnContext")]),
        ],
    },
    Rule {
        namespace: SAML_NS,
        name: "AttributeStatement",
        versioned: false,
        required_attributes: &[],
        date_times: &[],
        booleans: &[],
        children: &[at_least_one(&[
            (SAML_NS, "Attribute"),
            (SAML_NS, "EncryptedAttribute"),
        ])],
    },
    Rule {
        namespace: SAML_NS,
        name: "Attribute",
        versioned: false,
        required_attributes: &["Name"],
        date_times: &[],
        booleans: &[],
        children: &[any_number(&[(SAML_NS, "AttributeValue")])],
    },
    Rule {
        namespace: SAML_NS,
        name: "EncryptedAssertion",
        versioned: false,
        required_attributes: &[],
        date_times: &[],
        booleans: &[],
        children: &[
            required(&[(XMLENC_NS, "EncryptedData")]),
            any_number(&[(XMLENC_NS, "EncryptedKey")]),
        ],
    },
];

/// Table-driven SAML 2.0 grammar check over the hardened parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SamlSchemaValidator;

impl SamlSchemaValidator {
    /// Creates the validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Checks an already parsed element tree.
    ///
    /// # Errors
    ///
    /// Fails with a validation error naming the first violation found.
    pub fn validate_element(&self, root: &Element) -> EngineResult<()> {
        if !(root.is(SAMLP_NS, "AuthnRequest") || root.is(SAMLP_NS, "Response")) {
            return Err(schema_error(format!(
                "unexpected root element {}",
                root.name()
            )));
        }
        check(root)
    }
}

impl SchemaValidator for SamlSchemaValidator {
    fn validate(&self, bytes: &[u8]) -> EngineResult<Document> {
        let document = SecureXmlProcessor::shared()
            .parse(bytes)
            .map_err(|e| e.into_validation(ErrorCode::MessageValidationError))?;
        let root = document
            .require_root()
            .map_err(|e| e.into_validation(ErrorCode::MessageValidationError))?;
        self.validate_element(root)?;
        Ok(document)
    }
}

fn check(element: &Element) -> EngineResult<()> {
    let rule = RULES
        .iter()
        .find(|rule| element.is(rule.namespace, rule.name));
    if let Some(rule) = rule {
        check_attributes(element, rule)?;
        check_children(element, rule)?;
    }
    element.child_elements().try_for_each(check)
}

fn check_attributes(element: &Element, rule: &Rule) -> EngineResult<()> {
    for name in rule.required_attributes {
        if element.attribute(name).map_or(true, |value| value.trim().is_empty()) {
            return Err(schema_error(format!(
                "{} is missing required attribute {name}",
                rule.name
            )));
        }
    }
    if rule.versioned && element.attribute("Version") != Some(SAML_VERSION) {
        return Err(schema_error(format!(
            "{} must have Version=\"{SAML_VERSION}\"",
            rule.name
        )));
    }
    for name in rule.date_times {
        if let Some(value) = element.attribute(name) {
            parse_instant(value).map_err(|e| {
                schema_error(format!("{}@{name} is not a valid dateTime", rule.name)).with_source(e)
            })?;
        }
    }
    for name in rule.booleans {
        if let Some(value) = element.attribute(name) {
            parse_boolean(value).map_err(|e| {
                schema_error(format!("{}@{name} is not a valid boolean", rule.name)).with_source(e)
            })?;
        }
    }
    Ok(())
}

fn check_children(element: &Element, rule: &Rule) -> EngineResult<()> {
    let mut slot = 0;
    let mut seen = 0;

    for child in element.child_elements() {
        let advance = rule.children[slot.min(rule.children.len())..]
            .iter()
            .position(|particle| particle.matches(child))
            .ok_or_else(|| {
                schema_error(format!(
                    "unexpected element {} in {}",
                    child.name(),
                    rule.name
                ))
            })?;
        if advance > 0 {
            for (offset, particle) in rule.children[slot..slot + advance].iter().enumerate() {
                check_minimum(rule, particle, if offset == 0 { seen } else { 0 })?;
            }
            slot += advance;
            seen = 0;
        }
        seen += 1;

        let particle = &rule.children[slot];
        if particle.max.is_some_and(|max| seen > max) {
            return Err(schema_error(format!(
                "too many {} elements in {}",
                particle.describe(),
                rule.name
            )));
        }
    }

    for (offset, particle) in rule.children.iter().skip(slot).enumerate() {
        check_minimum(rule, particle, if offset == 0 { seen } else { 0 })?;
    }
    Ok(())
}

fn check_minimum(rule: &Rule, particle: &Particle, seen: usize) -> EngineResult<()> {
    if seen < particle.min {
        return Err(schema_error(format!(
            "{} requires {} {} element(s)",
            rule.name,
            particle.min,
            particle.describe()
        )));
    }
    Ok(())
}

fn schema_error(message: String) -> EngineError {
    EngineError::validation(format!("schema validation failed: {message}"))
}
