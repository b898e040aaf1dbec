//! In-memory XML node values exchanged between the document model and the
//! package layer.
//!
//! Node encoders produce [`XmlNode`] trees, node decoders consume them, and
//! the package layer serializes them into part payloads. Parsing goes through
//! quick-xml; serialization is hand-assembled with explicit escaping so the
//! emitted bytes are deterministic.

mod engine;
mod parse;

pub use engine::{Bindings, TemplateEngine, Transform};

use thiserror::Error;

/// Result type for XML tree operations.
pub type Result<T> = std::result::Result<T, XmlError>;

/// Error types for XML tree operations.
#[derive(Error, Debug)]
pub enum XmlError {
    /// Malformed XML payload
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Template could not be rendered into a node
    #[error("template render error: {0}")]
    Render(String),
}

/// A single XML node: an element or a text segment.
///
/// Text content is stored unescaped; escaping happens at serialization time.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

impl XmlNode {
    /// Parse a complete XML payload (optionally with a declaration) into a
    /// single root node.
    pub fn parse(bytes: &[u8]) -> Result<XmlNode> {
        parse::parse_node(bytes)
    }

    /// Get the element if this node is one.
    #[inline]
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }

    /// Consume the node, returning the element if it is one.
    pub fn into_element(self) -> Option<XmlElement> {
        match self {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        }
    }

    /// Get the text segment if this node is one.
    #[inline]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            XmlNode::Text(t) => Some(t),
            XmlNode::Element(_) => None,
        }
    }

    /// Serialize this node to an XML string without a declaration.
    pub fn to_xml_string(&self) -> String {
        let mut out = String::with_capacity(256);
        self.write_into(&mut out);
        out
    }

    /// Serialize this node as a standalone XML document with a declaration.
    pub fn to_document_string(&self) -> String {
        let mut out = String::with_capacity(512);
        out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        out.push('\n');
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        match self {
            XmlNode::Text(t) => out.push_str(&escape_xml(t)),
            XmlNode::Element(el) => el.write_into(out),
        }
    }
}

impl From<XmlElement> for XmlNode {
    fn from(el: XmlElement) -> Self {
        XmlNode::Element(el)
    }
}

/// An XML element with a qualified name, ordered attributes, and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    /// Qualified element name, e.g. `w:p`
    pub name: String,

    /// Ordered attribute list of (qualified name, unescaped value)
    pub attrs: Vec<(String, String)>,

    /// Ordered child nodes
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element with the given qualified name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// The local part of the element name, with any namespace prefix stripped.
    pub fn local_name(&self) -> &str {
        match self.name.rfind(':') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    /// Get an attribute value by exact qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get an attribute value by local name, ignoring any prefix.
    ///
    /// Documents in the wild carry both `w:id` and bare `id` spellings, so
    /// decoders match on the local part.
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| local_of(k) == local)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing any existing value for the same name.
    pub fn set_attr<K: Into<String>, V: Into<String>>(&mut self, name: K, value: V) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    /// Append a child node.
    #[inline]
    pub fn push<N: Into<XmlNode>>(&mut self, child: N) {
        self.children.push(child.into());
    }

    /// Iterate over child elements, skipping text segments.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Find the first child element with the given local name.
    pub fn element(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.local_name() == local)
    }

    /// Concatenate all descendant text segments.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(el) => el.collect_text(out),
            }
        }
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attrs {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape_xml(v));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            child.write_into(out);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

/// The local part of a qualified name.
pub(crate) fn local_of(name: &str) -> &str {
    match name.rfind(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Escape XML special characters.
pub(crate) fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Resolve one predefined or numeric character reference, without its
/// `&`/`;` delimiters.
pub(crate) fn resolve_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => entity
            .strip_prefix("#x")
            .or_else(|| entity.strip_prefix("#X"))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
            .and_then(char::from_u32),
    }
}

/// Resolve the character references in raw text.
pub(crate) fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let Some(end) = rest.find(';') else {
            out.push_str(rest);
            return out;
        };
        match resolve_entity(&rest[1..end]) {
            Some(c) => out.push(c),
            // Unknown entity, keep it verbatim
            None => out.push_str(&rest[..=end]),
        }
        rest = &rest[end + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_serialization() {
        let mut el = XmlElement::new("w:t");
        el.set_attr("xml:space", "preserve");
        el.push(XmlNode::Text("a < b".to_string()));

        assert_eq!(
            XmlNode::Element(el).to_xml_string(),
            r#"<w:t xml:space="preserve">a &lt; b</w:t>"#
        );
    }

    #[test]
    fn test_empty_element_self_closes() {
        let el = XmlElement::new("w:br");
        assert_eq!(XmlNode::Element(el).to_xml_string(), "<w:br/>");
    }

    #[test]
    fn test_local_name_and_attrs() {
        let mut el = XmlElement::new("w:ins");
        el.set_attr("w:id", "1");
        el.set_attr("w:id", "2");

        assert_eq!(el.local_name(), "ins");
        assert_eq!(el.attr("w:id"), Some("2"));
        assert_eq!(el.attr_local("id"), Some("2"));
        assert_eq!(el.attrs.len(), 1);
    }

    #[test]
    fn test_parse_round_trip() {
        let xml = r#"<w:p><w:r><w:t xml:space="preserve">Hello &amp; goodbye</w:t></w:r></w:p>"#;
        let node = XmlNode::parse(xml.as_bytes()).unwrap();

        let el = node.as_element().unwrap();
        assert_eq!(el.local_name(), "p");
        assert_eq!(el.text(), "Hello & goodbye");
        assert_eq!(node.to_xml_string(), xml);
    }

    #[test]
    fn test_unescape_numeric_references() {
        assert_eq!(unescape_xml("&#65;&#x42;"), "AB");
        assert_eq!(unescape_xml("&unknown;"), "&unknown;");
    }

    #[test]
    fn test_document_string_has_declaration() {
        let el = XmlElement::new("Types");
        let doc = XmlNode::Element(el).to_document_string();
        assert!(doc.starts_with(r#"<?xml version="1.0""#));
    }
}
