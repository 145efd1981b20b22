//! Helpers shared by the SAML object marshallers.

use chrono::{DateTime, SecondsFormat, Utc};

use super::constants::{prefixes, EIDAS_NS, ENTITY_FORMAT, SAMLP_NS, SAML_NS, XMLDSIG_NS, XMLENC_NS};
use crate::error::{EngineError, EngineResult};
use crate::xml::Element;

/// Conversion between a SAML object and its DOM form.
pub trait SamlObject: Sized {
    /// Builds the DOM element for this object.
    fn to_element(&self) -> Element;

    /// Reads the object from a DOM element.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the element is not the expected
    /// SAML construct or a required part is missing or malformed.
    fn from_element(element: &Element) -> EngineResult<Self>;
}

pub(crate) fn saml(local_name: &str) -> Element {
    Element::new(SAML_NS, &format!("{}:{local_name}", prefixes::SAML2))
}

pub(crate) fn samlp(local_name: &str) -> Element {
    Element::new(SAMLP_NS, &format!("{}:{local_name}", prefixes::SAML2P))
}

pub(crate) fn eidas(local_name: &str) -> Element {
    Element::new(EIDAS_NS, &format!("{}:{local_name}", prefixes::EIDAS))
}

pub(crate) fn ds(local_name: &str) -> Element {
    Element::new(XMLDSIG_NS, &format!("{}:{local_name}", prefixes::DS))
}

pub(crate) fn xenc(local_name: &str) -> Element {
    Element::new(XMLENC_NS, &format!("{}:{local_name}", prefixes::XENC))
}

pub(crate) fn issuer(value: &str) -> Element {
    saml("Issuer")
        .with_attribute("Format", ENTITY_FORMAT)
        .with_text(value)
}

pub(crate) fn issuer_of(element: &Element) -> Option<String> {
    optional_text(element, SAML_NS, "Issuer")
}

/// Base64 text of the certificate in an enveloped signature's `KeyInfo`.
pub(crate) fn signature_certificate(element: &Element) -> Option<String> {
    element
        .find_child(XMLDSIG_NS, "Signature")?
        .find_child(XMLDSIG_NS, "KeyInfo")?
        .find_child(XMLDSIG_NS, "X509Data")?
        .child_text(XMLDSIG_NS, "X509Certificate")
        .filter(|text| !text.is_empty())
}

/// Formats an instant as `xs:dateTime` in UTC with millisecond precision.
#[must_use]
pub fn format_instant(instant: DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an `xs:dateTime` value carrying a timezone.
///
/// # Errors
///
/// Returns a validation error if the value is not a valid timestamp.
pub fn parse_instant(value: &str) -> EngineResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map(|instant| instant.with_timezone(&Utc))
        .map_err(|e| EngineError::validation(format!("invalid dateTime \"{value}\"")).with_source(e))
}

/// Parses an `xs:boolean` value.
///
/// # Errors
///
/// Returns a validation error for anything but the four lexical forms.
pub fn parse_boolean(value: &str) -> EngineResult<bool> {
    match value.trim() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(EngineError::validation(format!("invalid boolean \"{other}\""))),
    }
}

pub(crate) fn expect(element: &Element, namespace: &str, local_name: &str) -> EngineResult<()> {
    if element.is(namespace, local_name) {
        Ok(())
    } else {
        Err(EngineError::validation(format!(
            "expected {local_name} but found {}",
            element.name()
        )))
    }
}

pub(crate) fn required_attribute<'a>(element: &'a Element, name: &str) -> EngineResult<&'a str> {
    element.attribute(name).ok_or_else(|| {
        EngineError::validation(format!(
            "{} is missing attribute {name}",
            element.local_name()
        ))
    })
}

pub(crate) fn optional_instant(element: &Element, name: &str) -> EngineResult<Option<DateTime<Utc>>> {
    element.attribute(name).map(parse_instant).transpose()
}

pub(crate) fn optional_text(element: &Element, namespace: &str, local_name: &str) -> Option<String> {
    element
        .child_text(namespace, local_name)
        .filter(|text| !text.is_empty())
}

pub(crate) fn optional_child<T: SamlObject>(
    element: &Element,
    namespace: &str,
    local_name: &str,
) -> EngineResult<Option<T>> {
    element
        .find_child(namespace, local_name)
        .map(T::from_element)
        .transpose()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn instants_use_utc_millis() {
        let instant = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        assert_eq!(format_instant(instant), "2026-10-16T09:30:00.000Z");
        assert_eq!(parse_instant("2026-10-16T11:30:00+02:00").unwrap(), instant);
    }

    #[test]
    fn rejects_bad_lexical_forms() {
        assert!(parse_instant("16/10/2026").is_err());
        assert!(parse_boolean("yes").is_err());
        assert!(parse_boolean(" 1 ").unwrap());
    }
}
