//! SAML Status types.
//!
//! Status information returned in SAML protocol responses.

use super::{expect, required_attribute, samlp, status_codes, SamlObject, SAMLP_NS};
use crate::error::{EngineError, EngineResult};
use crate::xml::Element;

/// SAML protocol status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    /// The status code.
    pub status_code: StatusCode,

    /// Optional status message.
    pub status_message: Option<String>,
}

impl Status {
    /// Creates a success status.
    #[must_use]
    pub fn success() -> Self {
        Self {
            status_code: StatusCode::success(),
            status_message: None,
        }
    }

    /// Creates a failure status with a top-level code and optional sub-code.
    #[must_use]
    pub fn failure(code: impl Into<String>, sub_code: Option<String>, message: Option<String>) -> Self {
        let mut status_code = StatusCode::new(code);
        if let Some(sub_code) = sub_code {
            status_code = status_code.with_sub_status(StatusCode::new(sub_code));
        }
        Self {
            status_code,
            status_message: message,
        }
    }

    /// Returns true if this status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::success()
    }
}

impl SamlObject for Status {
    fn to_element(&self) -> Element {
        samlp("Status")
            .with_child(self.status_code.to_element())
            .with_optional_child(
                self.status_message
                    .as_ref()
                    .map(|message| samlp("StatusMessage").with_text(message.as_str())),
            )
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAMLP_NS, "Status")?;
        let status_code = element
            .find_child(SAMLP_NS, "StatusCode")
            .ok_or_else(|| EngineError::validation("Status is missing StatusCode"))
            .and_then(StatusCode::from_element)?;
        Ok(Self {
            status_code,
            status_message: element.child_text(SAMLP_NS, "StatusMessage"),
        })
    }
}

/// SAML status code.
///
/// Status codes can be nested, with a top-level code and optional sub-code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusCode {
    /// The status code URI value.
    pub value: String,

    /// Optional nested status code providing more detail.
    pub status_code: Option<Box<StatusCode>>,
}

impl StatusCode {
    /// Creates a new status code with the given value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            status_code: None,
        }
    }

    /// Creates a success status code.
    #[must_use]
    pub fn success() -> Self {
        Self::new(status_codes::SUCCESS)
    }

    /// Adds a sub-status code.
    #[must_use]
    pub fn with_sub_status(mut self, sub: StatusCode) -> Self {
        self.status_code = Some(Box::new(sub));
        self
    }

    /// Returns true if this is a success status code.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.value == status_codes::SUCCESS
    }

    /// Returns the sub-status code value if present.
    #[must_use]
    pub fn sub_status_value(&self) -> Option<&str> {
        self.status_code.as_ref().map(|s| s.value.as_str())
    }
}

impl SamlObject for StatusCode {
    fn to_element(&self) -> Element {
        samlp("StatusCode")
            .with_attribute("Value", self.value.as_str())
            .with_optional_child(self.status_code.as_ref().map(|sub| sub.to_element()))
    }

    fn from_element(element: &Element) -> EngineResult<Self> {
        expect(element, SAMLP_NS, "StatusCode")?;
        let value = required_attribute(element, "Value")?.to_string();
        let status_code = element
            .find_child(SAMLP_NS, "StatusCode")
            .map(StatusCode::from_element)
            .transpose()?
            .map(Box::new);
        Ok(Self { value, status_code })
    }
}
