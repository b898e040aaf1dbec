//! Parts: the named resources inside a package.
//!
//! A part is backed either by a document tree (serialized through the node
//! registry at write time) or by opaque bytes. Each part owns its
//! relationship collection, loaded from the `.rels` companion when reading.

use super::error::Result;
use super::partname::PartName;
use super::phys::ArchiveReader;
use super::rel::Relationships;
use crate::model::{Node, Registry};
use crate::xml::XmlNode;

/// The payload backing a part.
#[derive(Debug, Clone)]
pub enum PartContent {
    /// A document tree, encoded through the registry on write
    Tree(Node),

    /// Raw bytes, written verbatim
    Blob(Vec<u8>),
}

/// One named resource in a package.
#[derive(Debug)]
pub struct Part {
    name: PartName,
    content_type: String,
    content: PartContent,
    rels: Relationships,
}

impl Part {
    /// Create a part backed by a document tree.
    pub fn new_tree<C: Into<String>>(name: PartName, content_type: C, tree: Node) -> Self {
        let rels = Relationships::new(name.base_uri());
        Self {
            name,
            content_type: content_type.into(),
            content: PartContent::Tree(tree),
            rels,
        }
    }

    /// Create a part backed by raw bytes.
    pub fn new_blob<C: Into<String>>(name: PartName, content_type: C, blob: Vec<u8>) -> Self {
        let rels = Relationships::new(name.base_uri());
        Self {
            name,
            content_type: content_type.into(),
            content: PartContent::Blob(blob),
            rels,
        }
    }

    /// Load a part and its relationships from a serialized archive.
    ///
    /// A missing or unreadable `.rels` companion is recoverable: it is
    /// logged and the part proceeds with an empty relationship set.
    pub fn from_archive(
        archive: &ArchiveReader,
        name: PartName,
        content_type: String,
    ) -> Result<Self> {
        let blob = archive
            .get(&name)
            .ok_or_else(|| super::error::OpcError::PartNotFound(name.to_string()))?
            .to_vec();

        let rels = match archive.get(&name.rels_name()) {
            Some(rels_xml) => match Relationships::parse(rels_xml, name.base_uri()) {
                Ok(rels) => rels,
                Err(e) => {
                    tracing::warn!(part = %name, "unreadable relationships, continuing without: {e}");
                    Relationships::new(name.base_uri())
                },
            },
            None => Relationships::new(name.base_uri()),
        };

        Ok(Self {
            name,
            content_type,
            content: PartContent::Blob(blob),
            rels,
        })
    }

    #[inline]
    pub fn name(&self) -> &PartName {
        &self.name
    }

    #[inline]
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    #[inline]
    pub fn content(&self) -> &PartContent {
        &self.content
    }

    /// The document tree, if this part is tree-backed.
    pub fn tree(&self) -> Option<&Node> {
        match &self.content {
            PartContent::Tree(node) => Some(node),
            PartContent::Blob(_) => None,
        }
    }

    /// The raw bytes, if this part is blob-backed.
    pub fn blob(&self) -> Option<&[u8]> {
        match &self.content {
            PartContent::Blob(bytes) => Some(bytes),
            PartContent::Tree(_) => None,
        }
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    /// Add or reuse a relationship to another part, returning its id.
    pub fn relate_to(&mut self, target: &PartName, reltype: &str) -> String {
        let target_ref = target.relative_from(self.name.base_uri());
        self.rels.get_or_add(reltype, &target_ref)
    }

    /// Add or reuse an external relationship, returning its id.
    pub fn relate_to_external(&mut self, url: &str, reltype: &str) -> String {
        self.rels.get_or_add_external(reltype, url)
    }

    /// Serialize this part's payload.
    ///
    /// Tree-backed parts run structural repair and encode through the
    /// registry; blob-backed parts pass through unchanged.
    pub fn payload(&self, registry: &Registry) -> Result<Vec<u8>> {
        match &self.content {
            PartContent::Blob(bytes) => Ok(bytes.clone()),
            PartContent::Tree(node) => {
                let xml = registry.encode_tree(node.clone())?;
                Ok(xml.to_document_string().into_bytes())
            },
        }
    }

    /// Decode this part's payload into a document tree.
    pub fn decode_tree(&self, registry: &Registry, accepted_roots: &[&str]) -> Result<Node> {
        match &self.content {
            PartContent::Tree(node) => Ok(node.clone()),
            PartContent::Blob(bytes) => {
                let xml = XmlNode::parse(bytes)?;
                Ok(registry.decode_tree(&xml, accepted_roots)?)
            },
        }
    }
}
