//! SAML Name ID types.

use super::{expect, saml, NameIdFormat, SamlObject, SAML_NS};
use crate::error::EngineResult;
use crate::xml::Element;

/// SAML Name ID.
///
/// Represents the identifier of a subject in a SAML assertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameId {
    /// The actual identifier value.
    pub value: String,

    /// The format of the name identifier.
    pub format: Option<String>,

    /// The security or administrative domain that qualifies the name.
    pub name_qualifier: Option<String>,

    /// The service provider's entity ID that qualifies the name.
    pub sp_name_qualifier: Option<String>,
}

impl NameId {
    /// Creates a new name ID with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            format: None,
            name_qualifier: None,
            sp_name_qualifier: None,
        }
    }

    /// Creates a name ID in one of the well-known formats.
    #[must_use]
    pub fn with_format(value: impl Into<String>, format: NameIdFormat) -> Self {
        Self::new(value).format(format.uri())
    }

    /// Sets the format URI.
    #[must_use]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

impl SamlObject for NameId {
    fn to_element(&self) -> Element {
        saml("NameID")
            .with_optional_attribute("Format", self.format.as_deref())
            .with_optional_attribute("NameQualifier", self.name_qualifier.as_deref())
            .with_optional_attribute("SPNameQualifier", self.sp_name_qualifier.as_deref())
            .with_text(self.value.as_str())
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAML_NS, "NameID")?;
        Ok(Self {
            value: element.text().trim().to_string(),
            format: element.attribute("Format").map(str::to_string),
            name_qualifier: element.attribute("NameQualifier").map(str::to_string),
            sp_name_qualifier: element.attribute("SPNameQualifier").map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_id_persistent() {
        let name_id = NameId::with_format("CZ/CZ/7df3c1", NameIdFormat::Persistent);
        assert_eq!(name_id.value, "CZ/CZ/7df3c1");
        assert_eq!(
            name_id.format.as_deref(),
            Some("urn:oasis:names:tc:SAML:2.0:nameid-format:persistent")
        );
    }

    #[test]
    fn name_id_from_element_trims_value() {
        let element = saml("NameID")
            .with_attribute("Format", NameIdFormat::Transient.uri())
            .with_text("\n  abc  \n");
        let name_id = NameId::from_element(&element).unwrap();
        assert_eq!(name_id.value, "abc");
        assert_eq!(name_id.format.as_deref(), Some(NameIdFormat::Transient.uri()));
    }
}
