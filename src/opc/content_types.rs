//! The `[Content_Types].xml` model: extension defaults and per-part
//! overrides.

use super::constants::content_type as ct;
use super::constants::namespace;
use super::error::{OpcError, Result};
use super::partname::PartName;
use crate::xml::{XmlElement, XmlNode};
use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashMap};

/// Extension/content-type pairs that are declared as Defaults rather than
/// per-part Overrides.
static STANDARD_DEFAULTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("rels", ct::OPC_RELATIONSHIPS),
        ("xml", ct::XML),
        ("png", ct::PNG),
        ("jpg", ct::JPEG),
        ("jpeg", ct::JPEG),
        ("gif", ct::GIF),
    ])
});

/// Content-type declaration table for a package.
///
/// Sorted maps keep the emitted `[Content_Types].xml` deterministic.
#[derive(Debug, Clone)]
pub struct ContentTypes {
    /// Default content types by lowercase extension
    defaults: BTreeMap<String, String>,

    /// Override content types by part name
    overrides: BTreeMap<String, String>,
}

impl ContentTypes {
    /// Create a table with the two defaults every package carries.
    pub fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert("rels".to_string(), ct::OPC_RELATIONSHIPS.to_string());
        defaults.insert("xml".to_string(), ct::XML.to_string());
        Self {
            defaults,
            overrides: BTreeMap::new(),
        }
    }

    /// Add a default content type for an extension.
    pub fn add_default<E: Into<String>, C: Into<String>>(&mut self, extension: E, content_type: C) {
        self.defaults
            .insert(extension.into().to_lowercase(), content_type.into());
    }

    /// Add an override content type for a specific part.
    pub fn add_override<C: Into<String>>(&mut self, name: &PartName, content_type: C) {
        self.overrides
            .insert(name.as_str().to_string(), content_type.into());
    }

    /// Record a part's content type, preferring a Default when the pair is a
    /// standard extension mapping and an Override otherwise.
    pub fn register_part(&mut self, name: &PartName, content_type: &str) {
        let ext = name.ext().to_lowercase();
        if STANDARD_DEFAULTS.get(ext.as_str()) == Some(&content_type) {
            self.defaults.insert(ext, content_type.to_string());
        } else {
            self.overrides
                .insert(name.as_str().to_string(), content_type.to_string());
        }
    }

    /// Resolve a part's content type: an explicit override wins, then the
    /// extension default.
    pub fn resolve(&self, name: &PartName) -> Result<String> {
        if let Some(ct) = self.overrides.get(name.as_str()) {
            return Ok(ct.clone());
        }
        if let Some(ct) = self.defaults.get(&name.ext().to_lowercase()) {
            return Ok(ct.clone());
        }
        Err(OpcError::UnresolvedContentType(name.to_string()))
    }

    /// Serialize as the `[Content_Types].xml` payload.
    pub fn to_xml(&self) -> String {
        let mut root = XmlElement::new("Types");
        root.set_attr("xmlns", namespace::OPC_CONTENT_TYPES);

        for (ext, content_type) in &self.defaults {
            let mut el = XmlElement::new("Default");
            el.set_attr("Extension", ext.as_str());
            el.set_attr("ContentType", content_type.as_str());
            root.push(el);
        }
        for (name, content_type) in &self.overrides {
            let mut el = XmlElement::new("Override");
            el.set_attr("PartName", name.as_str());
            el.set_attr("ContentType", content_type.as_str());
            root.push(el);
        }

        XmlNode::Element(root).to_document_string()
    }

    /// Parse a `[Content_Types].xml` payload.
    pub fn from_xml(bytes: &[u8]) -> Result<Self> {
        let node = XmlNode::parse(bytes)?;
        let root = node
            .as_element()
            .filter(|el| el.local_name() == "Types")
            .ok_or_else(|| {
                OpcError::Xml(crate::xml::XmlError::Parse(
                    "payload is not a content-types stream".to_string(),
                ))
            })?;

        let mut table = Self {
            defaults: BTreeMap::new(),
            overrides: BTreeMap::new(),
        };
        for el in root.elements() {
            match el.local_name() {
                "Default" => {
                    if let (Some(ext), Some(ct)) = (el.attr("Extension"), el.attr("ContentType")) {
                        table.add_default(ext, ct);
                    }
                },
                "Override" => {
                    if let (Some(name), Some(ct)) = (el.attr("PartName"), el.attr("ContentType")) {
                        table.overrides.insert(name.to_string(), ct.to_string());
                    }
                },
                _ => {},
            }
        }
        Ok(table)
    }
}

impl Default for ContentTypes {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_wins_over_default() {
        let mut table = ContentTypes::new();
        let doc = PartName::new("/word/document.xml").unwrap();
        table.add_override(&doc, ct::WML_DOCUMENT_MAIN);

        assert_eq!(table.resolve(&doc).unwrap(), ct::WML_DOCUMENT_MAIN);

        let other = PartName::new("/word/styles.xml").unwrap();
        assert_eq!(table.resolve(&other).unwrap(), ct::XML);
    }

    #[test]
    fn test_unresolvable_is_an_error() {
        let table = ContentTypes::new();
        let blob = PartName::new("/word/media/image1.bin").unwrap();
        assert!(matches!(
            table.resolve(&blob),
            Err(OpcError::UnresolvedContentType(_))
        ));
    }

    #[test]
    fn test_register_part_picks_default_or_override() {
        let mut table = ContentTypes::new();
        let image = PartName::new("/word/media/image1.png").unwrap();
        let doc = PartName::new("/word/document.xml").unwrap();
        table.register_part(&image, ct::PNG);
        table.register_part(&doc, ct::WML_DOCUMENT_MAIN);

        let xml = table.to_xml();
        assert!(xml.contains(r#"<Default Extension="png" ContentType="image/png"/>"#));
        assert!(xml.contains(r#"<Override PartName="/word/document.xml""#));
    }

    #[test]
    fn test_xml_round_trip() {
        let mut table = ContentTypes::new();
        let doc = PartName::new("/word/document.xml").unwrap();
        table.register_part(&doc, ct::WML_DOCUMENT_MAIN);
        table.add_default("png", ct::PNG);

        let parsed = ContentTypes::from_xml(table.to_xml().as_bytes()).unwrap();
        assert_eq!(parsed.resolve(&doc).unwrap(), ct::WML_DOCUMENT_MAIN);
        let image = PartName::new("/word/media/image2.PNG").unwrap();
        assert_eq!(parsed.resolve(&image).unwrap(), ct::PNG);
    }
}
