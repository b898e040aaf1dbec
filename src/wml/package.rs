//! Assembly of a complete WordprocessingML package from a document tree.
//!
//! `DocumentPackage` wires the standard parts together: the document part
//! at `/word/document.xml` (tree-backed, encoded through the registry at
//! write time), the settings part, the package-level officeDocument
//! relationship, and the document-to-settings relationship. Opening
//! reverses the wiring through the relationship graph.

use super::settings::Settings;
use crate::error::Result;
use crate::model::{Node, Registry};
use crate::opc::constants::{content_type as ct, relationship_type};
use crate::opc::{OpcError, Package, Part, PartName};
use std::path::Path;

/// Part name of the main document.
pub const DOCUMENT_PART: &str = "/word/document.xml";

/// Part name of the settings part.
pub const SETTINGS_PART: &str = "/word/settings.xml";

/// A package assembled around one WordprocessingML document.
pub struct DocumentPackage {
    package: Package,
}

impl DocumentPackage {
    /// Assemble a package from a document tree and settings.
    ///
    /// The tree is validated and encoded lazily, at write time; an illegal
    /// tree surfaces there, after structural repair has had its chance.
    pub fn build(document: Node, settings: &Settings) -> Result<Self> {
        let mut package = Package::new();

        let doc_name = PartName::new(DOCUMENT_PART)?;
        let settings_name = PartName::new(SETTINGS_PART)?;

        let mut doc_part = Part::new_tree(doc_name.clone(), ct::WML_DOCUMENT_MAIN, document);
        doc_part.relate_to(&settings_name, relationship_type::SETTINGS);
        package.add_part(doc_part)?;
        package.add_part(settings.to_part(settings_name))?;
        package.relate_to(&doc_name, relationship_type::OFFICE_DOCUMENT);

        Ok(Self { package })
    }

    /// Open a serialized package.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            package: Package::open(bytes)?,
        })
    }

    /// Serialize the package.
    pub fn to_bytes(&self, registry: &Registry) -> Result<Vec<u8>> {
        Ok(self.package.to_bytes(registry)?)
    }

    /// The document tree, decoded through the registry when the part was
    /// read from an archive.
    pub fn document(&self, registry: &Registry) -> Result<Node> {
        let part = self.package.main_document_part()?;
        Ok(part.decode_tree(registry, &["document"])?)
    }

    /// The document settings; a package without a settings part gets the
    /// defaults.
    pub fn settings(&self) -> Result<Settings> {
        let doc = self.package.main_document_part()?;
        let rel = match doc.rels().single_by_type(relationship_type::SETTINGS) {
            Ok(rel) => rel,
            Err(OpcError::RelationshipNotFound(_)) => return Ok(Settings::default()),
            Err(e) => return Err(e.into()),
        };
        let name = doc.rels().target_name(rel.id())?;
        let part = self.package.part(&name)?;
        match part.blob() {
            Some(bytes) => Settings::from_xml(bytes),
            None => Ok(Settings::default()),
        }
    }

    /// The underlying package, for direct part access.
    #[inline]
    pub fn package(&self) -> &Package {
        &self.package
    }

    #[inline]
    pub fn package_mut(&mut self) -> &mut Package {
        &mut self.package
    }

    pub fn into_package(self) -> Package {
        self.package
    }

    /// Open a package from a file.
    pub async fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            package: Package::open_path(path).await?,
        })
    }

    /// Serialize and write the package to a file.
    pub async fn save_path<P: AsRef<Path>>(&self, path: P, registry: &Registry) -> Result<()> {
        Ok(self.package.save_path(path, registry).await?)
    }
}
