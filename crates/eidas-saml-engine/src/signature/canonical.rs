//! Canonical form used for digests and signature input.
//!
//! Follows the shape of exclusive C14N over the engine's DOM: namespace
//! declarations are rendered where they were written, attributes are
//! sorted with declarations first, empty elements become start/end pairs,
//! and text and attribute values use the C14N escapes. Comments never reach
//! the DOM, so there is nothing to strip.

use crate::xml::{Element, Node};

/// Returns the canonical bytes of `element`.
#[must_use]
pub fn canonicalize(element: &Element) -> Vec<u8> {
    let mut out = String::new();
    write_element(&mut out, element);
    out.into_bytes()
}

fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(element.name());

    let mut attributes: Vec<_> = element.attributes().iter().collect();
    attributes.sort_by(|a, b| {
        let a_decl = is_namespace_declaration(&a.name);
        let b_decl = is_namespace_declaration(&b.name);
        b_decl.cmp(&a_decl).then_with(|| a.name.cmp(&b.name))
    });
    for attribute in attributes {
        out.push(' ');
        out.push_str(&attribute.name);
        out.push_str("=\"");
        escape_attribute(out, &attribute.value);
        out.push('"');
    }
    out.push('>');

    for child in element.children() {
        match child {
            Node::Element(child) => write_element(out, child),
            Node::Text(text) => escape_text(out, text),
        }
    }

    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
}

fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}

fn escape_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}
