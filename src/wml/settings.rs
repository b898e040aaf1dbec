//! The document settings part, including the track-changes toggle.

use crate::error::Result;
use crate::opc::constants::{content_type as ct, namespace};
use crate::opc::{Part, PartName};
use crate::xml::{XmlElement, XmlNode};
use serde::{Deserialize, Serialize};

/// Document-level settings carried by `/word/settings.xml`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Whether edits are recorded as tracked changes
    pub track_changes: bool,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable track-changes mode.
    pub fn with_track_changes(mut self, enabled: bool) -> Self {
        self.track_changes = enabled;
        self
    }

    /// Serialize as the settings part payload.
    pub fn to_xml(&self) -> String {
        let mut el = XmlElement::new("w:settings");
        el.set_attr("xmlns:w", namespace::WML_MAIN);
        if self.track_changes {
            el.push(XmlElement::new("w:trackChanges"));
        }
        XmlNode::Element(el).to_document_string()
    }

    /// Parse a settings part payload.
    ///
    /// Both spellings of the track-changes family (`w:trackChanges`,
    /// `w:trackRevisions`) enable the mode.
    pub fn from_xml(bytes: &[u8]) -> Result<Self> {
        let node = XmlNode::parse(bytes)?;
        let Some(el) = node.as_element() else {
            return Ok(Self::default());
        };
        let track_changes = el
            .elements()
            .any(|c| matches!(c.local_name(), "trackChanges" | "trackRevisions"));
        Ok(Self { track_changes })
    }

    /// Wrap into a blob-backed settings part.
    pub fn to_part(&self, name: PartName) -> Part {
        Part::new_blob(name, ct::WML_SETTINGS, self.to_xml().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let on = Settings::new().with_track_changes(true);
        let parsed = Settings::from_xml(on.to_xml().as_bytes()).unwrap();
        assert!(parsed.track_changes);

        let off = Settings::new();
        let parsed = Settings::from_xml(off.to_xml().as_bytes()).unwrap();
        assert!(!parsed.track_changes);
    }

    #[test]
    fn test_track_revisions_spelling_accepted() {
        let xml = br#"<w:settings xmlns:w="ns"><w:trackRevisions/></w:settings>"#;
        assert!(Settings::from_xml(xml).unwrap().track_changes);
    }
}
