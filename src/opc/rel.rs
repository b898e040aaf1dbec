//! Relationships between parts.
//!
//! Every part (and the package itself) owns a relationship collection,
//! serialized as a `_rels/*.rels` companion stream. Relationship ids are
//! assigned from a monotonic counter scoped to the owning part: an id is
//! never reused, even after the relationship carrying it is removed.

use super::constants::{namespace, target_mode};
use super::error::{OpcError, Result};
use super::partname::PartName;
use crate::xml::{XmlElement, XmlNode};
use smallvec::SmallVec;

/// A typed reference from one part to another part or an external resource.
#[derive(Debug, Clone)]
pub struct Relationship {
    id: String,
    reltype: String,
    target: String,
    is_external: bool,
}

impl Relationship {
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn reltype(&self) -> &str {
        &self.reltype
    }

    /// The raw target reference: a relative part reference for internal
    /// relationships, an absolute URI for external ones.
    #[inline]
    pub fn target(&self) -> &str {
        &self.target
    }

    #[inline]
    pub fn is_external(&self) -> bool {
        self.is_external
    }
}

/// The relationship collection owned by one source (a part or the package).
#[derive(Debug)]
pub struct Relationships {
    /// Base URI the targets resolve against
    base_uri: String,

    /// Relationships in insertion order
    rels: SmallVec<[Relationship; 8]>,

    /// Next id to assign; only ever increments
    next_id: u32,
}

impl Relationships {
    /// Create an empty collection resolving targets against `base_uri`.
    pub fn new<S: Into<String>>(base_uri: S) -> Self {
        Self {
            base_uri: base_uri.into(),
            rels: SmallVec::new(),
            next_id: 1,
        }
    }

    /// Add a relationship, assigning the next sequential id.
    pub fn add<T: Into<String>, U: Into<String>>(
        &mut self,
        reltype: T,
        target: U,
        is_external: bool,
    ) -> String {
        let id = format!("rId{}", self.next_id);
        self.next_id += 1;
        self.rels.push(Relationship {
            id: id.clone(),
            reltype: reltype.into(),
            target: target.into(),
            is_external,
        });
        id
    }

    /// Remove a relationship by id. The id is retired, not recycled.
    pub fn remove(&mut self, id: &str) -> Option<Relationship> {
        let pos = self.rels.iter().position(|r| r.id == id)?;
        Some(self.rels.remove(pos))
    }

    /// Get a relationship by id.
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.rels.iter().find(|r| r.id == id)
    }

    /// Get the id of an existing internal relationship with this type and
    /// target, or add one.
    pub fn get_or_add(&mut self, reltype: &str, target: &str) -> String {
        if let Some(rel) = self
            .rels
            .iter()
            .find(|r| r.reltype == reltype && r.target == target && !r.is_external)
        {
            return rel.id.clone();
        }
        self.add(reltype, target, false)
    }

    /// Get the id of an existing external relationship with this type and
    /// target, or add one.
    pub fn get_or_add_external(&mut self, reltype: &str, target: &str) -> String {
        if let Some(rel) = self
            .rels
            .iter()
            .find(|r| r.reltype == reltype && r.target == target && r.is_external)
        {
            return rel.id.clone();
        }
        self.add(reltype, target, true)
    }

    /// The single relationship of the given type.
    ///
    /// Errors when none exists, or when the type is ambiguous.
    pub fn single_by_type(&self, reltype: &str) -> Result<&Relationship> {
        let mut matching = self.rels.iter().filter(|r| r.reltype == reltype);
        match (matching.next(), matching.next()) {
            (None, _) => Err(OpcError::RelationshipNotFound(format!(
                "no relationship of type '{reltype}'"
            ))),
            (Some(rel), None) => Ok(rel),
            (Some(_), Some(_)) => Err(OpcError::InvalidRelationship(format!(
                "multiple relationships of type '{reltype}'"
            ))),
        }
    }

    /// Resolve every internal target into an absolute part name, in order.
    pub fn internal_targets(&self) -> Result<Vec<PartName>> {
        self.rels
            .iter()
            .filter(|r| !r.is_external)
            .map(|r| PartName::resolve(&self.base_uri, &r.target))
            .collect()
    }

    /// Resolve one relationship's target into an absolute part name.
    pub fn target_name(&self, id: &str) -> Result<PartName> {
        let rel = self
            .get(id)
            .ok_or_else(|| OpcError::RelationshipNotFound(id.to_string()))?;
        if rel.is_external {
            return Err(OpcError::InvalidRelationship(format!(
                "'{id}' is external and has no part name"
            )));
        }
        PartName::resolve(&self.base_uri, &rel.target)
    }

    #[inline]
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.rels.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.rels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rels.is_empty()
    }

    /// Serialize to a `.rels` payload.
    pub fn to_xml(&self) -> String {
        let mut root = XmlElement::new("Relationships");
        root.set_attr("xmlns", namespace::OPC_RELATIONSHIPS);

        for rel in &self.rels {
            let mut el = XmlElement::new("Relationship");
            el.set_attr("Id", rel.id.as_str());
            el.set_attr("Type", rel.reltype.as_str());
            el.set_attr("Target", rel.target.as_str());
            if rel.is_external {
                el.set_attr("TargetMode", target_mode::EXTERNAL);
            }
            root.push(el);
        }

        XmlNode::Element(root).to_document_string()
    }

    /// Parse a `.rels` payload.
    ///
    /// The id counter resumes past the highest numeric id seen, so ids added
    /// after a parse never collide with parsed ones.
    pub fn parse(bytes: &[u8], base_uri: &str) -> Result<Self> {
        let node = XmlNode::parse(bytes)?;
        let root = node
            .as_element()
            .filter(|el| el.local_name() == "Relationships")
            .ok_or_else(|| {
                OpcError::InvalidRelationship("payload is not a Relationships stream".to_string())
            })?;

        let mut rels = Self::new(base_uri);
        for el in root.elements().filter(|el| el.local_name() == "Relationship") {
            let (Some(id), Some(reltype), Some(target)) =
                (el.attr("Id"), el.attr("Type"), el.attr("Target"))
            else {
                return Err(OpcError::InvalidRelationship(
                    "Relationship element is missing Id, Type, or Target".to_string(),
                ));
            };
            let is_external = el.attr("TargetMode") == Some(target_mode::EXTERNAL);

            if let Some(n) = id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()) {
                rels.next_id = rels.next_id.max(n + 1);
            }
            rels.rels.push(Relationship {
                id: id.to_string(),
                reltype: reltype.to_string(),
                target: target.to_string(),
                is_external,
            });
        }
        Ok(rels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::relationship_type;

    #[test]
    fn test_sequential_ids_are_distinct() {
        let mut rels = Relationships::new("/word");
        let ids: Vec<String> = (0..5)
            .map(|i| rels.add(relationship_type::IMAGE, format!("media/image{i}.png"), false))
            .collect();

        assert_eq!(ids, vec!["rId1", "rId2", "rId3", "rId4", "rId5"]);
    }

    #[test]
    fn test_ids_never_reused_after_removal() {
        let mut rels = Relationships::new("/word");
        let first = rels.add(relationship_type::SETTINGS, "settings.xml", false);
        rels.remove(&first).unwrap();

        let second = rels.add(relationship_type::STYLES, "styles.xml", false);
        assert_ne!(first, second);
        assert_eq!(second, "rId2");
        assert!(rels.get(&first).is_none());
    }

    #[test]
    fn test_get_or_add_reuses_matching() {
        let mut rels = Relationships::new("/word");
        let a = rels.get_or_add(relationship_type::SETTINGS, "settings.xml");
        let b = rels.get_or_add(relationship_type::SETTINGS, "settings.xml");
        let c = rels.get_or_add(relationship_type::STYLES, "styles.xml");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_external_relationships() {
        let mut rels = Relationships::new("/word");
        let id = rels.get_or_add_external(relationship_type::HYPERLINK, "https://example.com/");

        let rel = rels.get(&id).unwrap();
        assert!(rel.is_external());
        assert!(rels.target_name(&id).is_err());
        assert!(rels.internal_targets().unwrap().is_empty());
    }

    #[test]
    fn test_xml_round_trip_resumes_counter() {
        let mut rels = Relationships::new("/word");
        rels.add(relationship_type::SETTINGS, "settings.xml", false);
        rels.add(relationship_type::HYPERLINK, "https://example.com/", true);

        let xml = rels.to_xml();
        assert!(xml.contains(r#"TargetMode="External""#));

        let parsed = Relationships::parse(xml.as_bytes(), "/word").unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(
            parsed.target_name("rId1").unwrap().as_str(),
            "/word/settings.xml"
        );
        // A fresh add continues past the parsed ids.
        let mut parsed = parsed;
        assert_eq!(parsed.add(relationship_type::STYLES, "styles.xml", false), "rId3");
    }

    #[test]
    fn test_single_by_type() {
        let mut rels = Relationships::new("/");
        assert!(rels.single_by_type(relationship_type::OFFICE_DOCUMENT).is_err());

        rels.add(relationship_type::OFFICE_DOCUMENT, "word/document.xml", false);
        assert!(rels.single_by_type(relationship_type::OFFICE_DOCUMENT).is_ok());

        rels.add(relationship_type::OFFICE_DOCUMENT, "word/document2.xml", false);
        assert!(matches!(
            rels.single_by_type(relationship_type::OFFICE_DOCUMENT),
            Err(OpcError::InvalidRelationship(_))
        ));
    }
}
