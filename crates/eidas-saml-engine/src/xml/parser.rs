//! Hardened XML reader.
//!
//! Built on quick-xml's namespace-resolving reader, which never loads DTDs
//! or resolves external entities. On top of that a hardened parser refuses
//! DOCTYPE declarations outright and fails on any entity reference that is
//! not one of the five predefined entities or a character reference.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;

use super::dom::{invalid_char, Document, Element};
use crate::error::{EngineError, EngineResult};

/// A reusable hardened parser. Obtain one from
/// [`ParserFactory::new_parser`](super::ParserFactory::new_parser).
#[derive(Debug)]
pub struct XmlParser {
    buf: Vec<u8>,
    max_depth: usize,
}

impl XmlParser {
    pub(crate) fn new(max_depth: usize) -> Self {
        Self {
            buf: Vec::with_capacity(1024),
            max_depth,
        }
    }

    /// Parses a complete document.
    ///
    /// # Errors
    ///
    /// Returns `MalformedXml` for ill-formed input, DOCTYPE declarations,
    /// unresolvable entities or prefixes, non-UTF-8 declared encodings,
    /// multiple roots and excessive nesting.
    pub fn parse(&mut self, input: &[u8]) -> EngineResult<Document> {
        self.buf.clear();
        let mut reader = NsReader::from_reader(input);
        {
            let config = reader.config_mut();
            config.trim_text(false);
            config.expand_empty_elements = true;
            config.check_end_names = true;
        }

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (resolved, event) = reader.read_resolved_event_into(&mut self.buf)?;
            match event {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(EngineError::malformed("content after the root element"));
                    }
                    if stack.len() >= self.max_depth {
                        return Err(EngineError::malformed(format!(
                            "element nesting exceeds {} levels",
                            self.max_depth
                        )));
                    }
                    let namespace = resolve_namespace(resolved)?;
                    stack.push(build_element(&reader, &start, namespace)?);
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| EngineError::malformed("unexpected end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(element),
                        None => root = Some(element),
                    }
                }
                Event::Empty(start) => {
                    // Only reachable if empty-element expansion is turned off.
                    let namespace = resolve_namespace(resolved)?;
                    let element = build_element(&reader, &start, namespace)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(element),
                        None if root.is_none() => root = Some(element),
                        None => return Err(EngineError::malformed("content after the root element")),
                    }
                }
                Event::Text(text) => {
                    let value = text
                        .unescape()
                        .map_err(|e| EngineError::malformed(e.to_string()).with_source(e))?;
                    push_text(&mut stack, value)?;
                }
                Event::CData(cdata) => {
                    let bytes = cdata.into_inner();
                    let value = std::str::from_utf8(&bytes)
                        .map_err(|e| EngineError::malformed(format!("invalid UTF-8 in CDATA: {e}")))?;
                    push_text(&mut stack, Cow::Borrowed(value))?;
                }
                Event::Decl(decl) => {
                    if let Some(encoding) = decl.encoding() {
                        let encoding =
                            encoding.map_err(|e| EngineError::malformed(e.to_string()).with_source(e))?;
                        if !encoding.eq_ignore_ascii_case(b"UTF-8") && !encoding.eq_ignore_ascii_case(b"UTF8") {
                            return Err(EngineError::malformed(format!(
                                "unsupported encoding {}",
                                String::from_utf8_lossy(&encoding)
                            )));
                        }
                    }
                }
                Event::DocType(_) => {
                    return Err(EngineError::malformed("DOCTYPE declarations are not allowed"));
                }
                Event::Comment(_) | Event::PI(_) => {}
                Event::Eof => break,
            }
            self.buf.clear();
        }

        if !stack.is_empty() {
            return Err(EngineError::malformed("unexpected end of document"));
        }
        root.map(Document::new)
            .ok_or_else(|| EngineError::malformed("document has no root element"))
    }
}

fn resolve_namespace(resolved: ResolveResult<'_>) -> EngineResult<Option<String>> {
    match resolved {
        ResolveResult::Bound(namespace) => Ok(Some(String::from_utf8_lossy(namespace.as_ref()).into_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(EngineError::malformed(format!(
            "unbound namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn build_element(
    reader: &NsReader<&[u8]>,
    start: &BytesStart<'_>,
    namespace: Option<String>,
) -> EngineResult<Element> {
    let qname = start.name();
    let name = utf8(qname.as_ref())?;
    let mut element = Element::with_namespace(namespace, name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| EngineError::malformed(e.to_string()).with_source(e))?;
        if let (ResolveResult::Unknown(prefix), _) = reader.resolve_attribute(attr.key) {
            return Err(EngineError::malformed(format!(
                "unbound namespace prefix '{}'",
                String::from_utf8_lossy(&prefix)
            )));
        }
        let key = utf8(attr.key.as_ref())?;
        let value = attr
            .unescape_value()
            .map_err(|e| EngineError::malformed(e.to_string()).with_source(e))?;
        check_chars(&value)?;
        element.set_attribute(key, value.into_owned());
    }
    Ok(element)
}

fn push_text(stack: &mut [Element], value: Cow<'_, str>) -> EngineResult<()> {
    check_chars(&value)?;
    match stack.last_mut() {
        Some(parent) => {
            parent.push_text(value.into_owned());
            Ok(())
        }
        None if value.trim().is_empty() => Ok(()),
        None => Err(EngineError::malformed("text outside the root element")),
    }
}

fn check_chars(value: &str) -> EngineResult<()> {
    match invalid_char(value) {
        Some(c) => Err(EngineError::malformed(format!(
            "character U+{:04X} is not allowed in XML 1.0",
            u32::from(c)
        ))),
        None => Ok(()),
    }
}

fn utf8(bytes: &[u8]) -> EngineResult<&str> {
    std::str::from_utf8(bytes).map_err(|e| EngineError::malformed(format!("invalid UTF-8 name: {e}")))
}
