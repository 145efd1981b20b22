//! Deterministic XML writer.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;

use super::dom::{invalid_char, Element, Node};
use crate::error::{EngineError, EngineResult};

/// Per-use output options. Reset at the start of every call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct OutputOptions {
    omit_declaration: bool,
}

/// A reusable serializer producing UTF-8, XML 1.0 output without
/// indentation. Attribute order and prefixes are kept as in the DOM, so the
/// same element always yields the same bytes.
#[derive(Debug, Default)]
pub struct XmlSerializer {
    buf: Vec<u8>,
    options: OutputOptions,
}

impl XmlSerializer {
    /// Creates a serializer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `element` as a document.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the writer fails or a text or attribute
    /// value holds a character XML 1.0 cannot represent.
    pub fn serialize(&mut self, element: &Element, omit_declaration: bool) -> EngineResult<Vec<u8>> {
        self.options = OutputOptions { omit_declaration };
        self.buf.clear();

        let mut writer = Writer::new(&mut self.buf);
        if !self.options.omit_declaration {
            writer
                .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
                .map_err(|e| EngineError::serialization(e.to_string()))?;
        }
        write_element(&mut writer, element)?;
        Ok(self.buf.clone())
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> EngineResult<()> {
    let mut start = BytesStart::new(element.name());
    for attr in element.attributes() {
        check_chars(&attr.value)?;
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }

    if element.children().is_empty() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| EngineError::serialization(e.to_string()));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| EngineError::serialization(e.to_string()))?;
    for child in element.children() {
        match child {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => {
                check_chars(text)?;
                writer
                    .write_event(Event::Text(BytesText::new(text)))
                    .map_err(|e| EngineError::serialization(e.to_string()))?;
            }
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(element.name())))
        .map_err(|e| EngineError::serialization(e.to_string()))
}

fn check_chars(value: &str) -> EngineResult<()> {
    match invalid_char(value) {
        Some(c) => Err(EngineError::serialization(format!(
            "character U+{:04X} cannot be written as XML 1.0",
            u32::from(c)
        ))),
        None => Ok(()),
    }
}
