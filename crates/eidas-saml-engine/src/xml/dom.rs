//! Owned XML document model.
//!
//! Parsed documents and documents built for marshalling share this model.
//! Elements record their qualified name exactly as written and the
//! namespace URI it resolved to, so that signatures can be recomputed over
//! the same prefixes the signer used.

use crate::error::{EngineError, EngineResult};

/// An XML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    root: Option<Element>,
}

impl Document {
    /// Creates a document with the given root element.
    #[must_use]
    pub fn new(root: Element) -> Self {
        Self { root: Some(root) }
    }

    /// Returns the root element, if any.
    #[must_use]
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    /// Replaces the root element.
    pub fn set_root(&mut self, root: Element) {
        self.root = Some(root);
    }

    /// Returns the root element or fails if the document is empty.
    ///
    /// # Errors
    ///
    /// Returns `MalformedXml` for an empty document.
    pub fn require_root(&self) -> EngineResult<&Element> {
        self.root
            .as_ref()
            .ok_or_else(|| EngineError::malformed("document has no root element"))
    }

    /// Consumes the document and returns its root element.
    ///
    /// # Errors
    ///
    /// Returns `MalformedXml` for an empty document.
    pub fn into_root(self) -> EngineResult<Element> {
        self.root
            .ok_or_else(|| EngineError::malformed("document has no root element"))
    }
}

/// A child node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Nested element.
    Element(Element),
    /// Character data, already unescaped.
    Text(String),
}

/// An attribute as written, including `xmlns` declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified attribute name.
    pub name: String,
    /// Unescaped value.
    pub value: String,
}

/// An XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    namespace: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Creates an element in a namespace, e.g. `Element::new(SAML2_ASSERTION_NS, "saml2:Issuer")`.
    #[must_use]
    pub fn new(namespace: &str, qualified_name: &str) -> Self {
        Self::with_namespace(Some(namespace.to_string()), qualified_name)
    }

    pub(crate) fn with_namespace(namespace: Option<String>, qualified_name: &str) -> Self {
        Self {
            name: qualified_name.to_string(),
            namespace,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Qualified name as written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Local part of the name.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name.rsplit_once(':').map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Prefix of the name, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Resolved namespace URI.
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Returns true if this element has the given namespace and local name.
    #[must_use]
    pub fn is(&self, namespace: &str, local_name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.local_name() == local_name
    }

    /// All attributes in document order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up an attribute by qualified name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Sets an attribute, replacing an existing value.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self.attributes.iter_mut().find(|attr| attr.name == name) {
            existing.value = value;
        } else {
            self.attributes.push(Attribute { name, value });
        }
    }

    /// Builder form of [`Element::set_attribute`].
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Sets an attribute only when a value is present.
    #[must_use]
    pub fn with_optional_attribute(self, name: &str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with_attribute(name, value),
            None => self,
        }
    }

    /// Declares `xmlns:prefix="uri"` on this element.
    #[must_use]
    pub fn declare_namespace(self, prefix: &str, uri: &str) -> Self {
        self.with_attribute(format!("xmlns:{prefix}"), uri)
    }

    /// Child nodes in document order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable child nodes.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Appends a child element.
    pub fn push_child(&mut self, child: Element) {
        self.children.push(Node::Element(child));
    }

    /// Appends text.
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Builder form of [`Element::push_child`].
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.push_child(child);
        self
    }

    /// Appends a child element when present.
    #[must_use]
    pub fn with_optional_child(mut self, child: Option<Element>) -> Self {
        if let Some(child) = child {
            self.push_child(child);
        }
        self
    }

    /// Builder form of [`Element::push_text`].
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    /// Iterates over child elements, skipping text.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Iterates over child elements with the given name.
    pub fn find_children<'a>(
        &'a self,
        namespace: &'a str,
        local_name: &'a str,
    ) -> impl Iterator<Item = &'a Element> + 'a {
        self.child_elements()
            .filter(move |child| child.is(namespace, local_name))
    }

    /// First child element with the given name.
    #[must_use]
    pub fn find_child(&self, namespace: &str, local_name: &str) -> Option<&Element> {
        self.child_elements().find(|child| child.is(namespace, local_name))
    }

    /// Index in [`Element::children`] of the first matching child element.
    #[must_use]
    pub fn position_of(&self, namespace: &str, local_name: &str) -> Option<usize> {
        self.children.iter().position(|node| match node {
            Node::Element(element) => element.is(namespace, local_name),
            Node::Text(_) => false,
        })
    }

    /// Removes and returns the first matching child element.
    pub fn remove_child(&mut self, namespace: &str, local_name: &str) -> Option<Element> {
        let index = self.position_of(namespace, local_name)?;
        match self.children.remove(index) {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        }
    }

    /// Inserts a child element at a position in [`Element::children`].
    pub fn insert_child(&mut self, index: usize, child: Element) {
        let index = index.min(self.children.len());
        self.children.insert(index, Node::Element(child));
    }

    /// Concatenated text of the direct text children.
    #[must_use]
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Trimmed text of the first matching child element.
    #[must_use]
    pub fn child_text(&self, namespace: &str, local_name: &str) -> Option<String> {
        self.find_child(namespace, local_name)
            .map(|child| child.text().trim().to_string())
    }

    /// Depth-first search for an element whose `ID` attribute equals `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.attribute("ID") == Some(id) {
            return Some(self);
        }
        self.child_elements().find_map(|child| child.find_by_id(id))
    }
}

/// Returns the first character of `value` outside the XML 1.0 `Char`
/// production.
pub(crate) fn invalid_char(value: &str) -> Option<char> {
    value.chars().find(|&c| {
        !matches!(c,
            '\u{9}' | '\u{A}' | '\u{D}'
            | '\u{20}'..='\u{D7FF}'
            | '\u{E000}'..='\u{FFFD}'
            | '\u{10000}'..='\u{10FFFF}')
    })
}
