//! The injected XML transform capability.
//!
//! Node encoders and decoders do not build their own query language; they go
//! through [`Transform`], a small two-operation seam: render a template with
//! bound values into a node, or query scalar values out of a node by path.
//! The crate ships [`TemplateEngine`], a placeholder-substitution and
//! slash-path implementation sufficient for the built-in node set.

use super::{Result, XmlElement, XmlError, XmlNode, escape_xml, local_of};
use std::collections::BTreeMap;

/// Values bound into a template render, keyed by placeholder name.
pub type Bindings = BTreeMap<String, String>;

/// Declarative template-to-node and node-to-value evaluation.
pub trait Transform: Send + Sync {
    /// Render a template with the given bindings into an XML node.
    fn render(&self, template: &str, bindings: &Bindings) -> Result<XmlNode>;

    /// Evaluate a path against a node, returning every matching value.
    fn query(&self, node: &XmlNode, path: &str) -> Vec<String>;

    /// Evaluate a path against a node, returning the first matching value.
    fn query_one(&self, node: &XmlNode, path: &str) -> Option<String> {
        self.query(node, path).into_iter().next()
    }
}

/// The built-in transform implementation.
///
/// Templates are XML fragments with `{name}` placeholders; bound values are
/// XML-escaped before substitution. Query paths are slash-separated local
/// element names, optionally ending in `@attr` (attribute value) or `text()`
/// (concatenated text). The path is evaluated relative to the given node, so
/// the first segment names a child, e.g. `r/t/text()` or `@id` on the node
/// itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateEngine;

impl Transform for TemplateEngine {
    fn render(&self, template: &str, bindings: &Bindings) -> Result<XmlNode> {
        let mut xml = template.to_string();
        for (key, value) in bindings {
            let placeholder = format!("{{{key}}}");
            if xml.contains(&placeholder) {
                xml = xml.replace(&placeholder, &escape_xml(value));
            }
        }
        XmlNode::parse(xml.as_bytes())
            .map_err(|e| XmlError::Render(format!("template did not produce a node: {e}")))
    }

    fn query(&self, node: &XmlNode, path: &str) -> Vec<String> {
        let Some(el) = node.as_element() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        eval(el, path, &mut out);
        out
    }
}

fn eval(el: &XmlElement, path: &str, out: &mut Vec<String>) {
    let (segment, rest) = match path.split_once('/') {
        Some((seg, rest)) => (seg, Some(rest)),
        None => (path, None),
    };

    match (segment, rest) {
        (attr, None) if attr.starts_with('@') => {
            if let Some(value) = el.attr_local(local_of(&attr[1..])) {
                out.push(value.to_string());
            }
        },
        ("text()", None) => out.push(el.text()),
        (name, None) => {
            for child in el.elements().filter(|c| c.local_name() == local_of(name)) {
                out.push(child.text());
            }
        },
        (name, Some(rest)) => {
            for child in el.elements().filter(|c| c.local_name() == local_of(name)) {
                eval(child, rest, out);
            }
        },
    }
}
