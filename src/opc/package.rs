//! The logical package: an ordered part collection with content types and
//! package-level relationships.
//!
//! Reading walks the relationship graph from the package root, so only parts
//! reachable through relationships become part of the in-memory package.
//! Writing is all-or-nothing: the output bytes are only returned once every
//! part, relationship stream, and the content-type table serialized cleanly.

use super::constants::relationship_type;
use super::content_types::ContentTypes;
use super::error::{OpcError, Result};
use super::partname::{CONTENT_TYPES_NAME, PACKAGE_ROOT, PartName};
use super::part::Part;
use super::phys::{ArchiveReader, ArchiveWriter};
use super::rel::Relationships;
use crate::model::Registry;
use std::collections::VecDeque;
use std::path::Path;

/// An in-memory package of parts.
pub struct Package {
    /// Parts in insertion (or discovery) order
    parts: Vec<Part>,

    /// Package-level relationships (`/_rels/.rels`)
    rels: Relationships,

    /// Content-type declaration table
    content_types: ContentTypes,
}

impl Package {
    /// Create an empty package.
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            rels: Relationships::new(PACKAGE_ROOT),
            content_types: ContentTypes::new(),
        }
    }

    /// Add a part. Fails if a part with the same name already exists.
    pub fn add_part(&mut self, part: Part) -> Result<()> {
        if self.contains_part(part.name()) {
            return Err(OpcError::DuplicatePart(part.name().to_string()));
        }
        self.parts.push(part);
        Ok(())
    }

    /// Get a part by name.
    pub fn part(&self, name: &PartName) -> Result<&Part> {
        self.parts
            .iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| OpcError::PartNotFound(name.to_string()))
    }

    /// Get a mutable part by name.
    pub fn part_mut(&mut self, name: &PartName) -> Result<&mut Part> {
        self.parts
            .iter_mut()
            .find(|p| p.name() == name)
            .ok_or_else(|| OpcError::PartNotFound(name.to_string()))
    }

    pub fn contains_part(&self, name: &PartName) -> bool {
        self.parts.iter().any(|p| p.name() == name)
    }

    pub fn iter_parts(&self) -> impl Iterator<Item = &Part> {
        self.parts.iter()
    }

    #[inline]
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    #[inline]
    pub fn rels(&self) -> &Relationships {
        &self.rels
    }

    #[inline]
    pub fn rels_mut(&mut self) -> &mut Relationships {
        &mut self.rels
    }

    #[inline]
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    #[inline]
    pub fn content_types_mut(&mut self) -> &mut ContentTypes {
        &mut self.content_types
    }

    /// Add or reuse a package-level relationship to a part, returning its id.
    pub fn relate_to(&mut self, target: &PartName, reltype: &str) -> String {
        self.rels.get_or_add(reltype, &target.relative_from(PACKAGE_ROOT))
    }

    /// Resolve a part's content type from the declaration table.
    pub fn resolve_content_type(&self, name: &PartName) -> Result<String> {
        self.content_types.resolve(name)
    }

    /// The part targeted by the single package-level relationship of the
    /// given type.
    pub fn part_by_reltype(&self, reltype: &str) -> Result<&Part> {
        let rel = self.rels.single_by_type(reltype)?;
        let name = self.rels.target_name(rel.id())?;
        self.part(&name)
    }

    /// The main document part.
    pub fn main_document_part(&self) -> Result<&Part> {
        self.part_by_reltype(relationship_type::OFFICE_DOCUMENT)
    }

    /// The parts referenced by one part's relationships, in relationship
    /// order. Every internal target must exist in the package.
    pub fn related_parts(&self, name: &PartName) -> Result<Vec<&Part>> {
        let part = self.part(name)?;
        part.rels()
            .internal_targets()?
            .iter()
            .map(|target| self.part(target))
            .collect()
    }

    /// Find the next free part name for a `%d` template,
    /// e.g. `/word/media/image%d.png`.
    pub fn next_part_name(&self, template: &str) -> Result<PartName> {
        for n in 1..=10_000u32 {
            let candidate = PartName::new(template.replace("%d", &n.to_string()))?;
            if !self.contains_part(&candidate) {
                return Ok(candidate);
            }
        }
        Err(OpcError::InvalidPartName(format!(
            "no free name left for template '{template}'"
        )))
    }

    /// Open a serialized package.
    ///
    /// Parts are discovered by walking the relationship graph from the
    /// package root. A missing package-level `.rels` stream is recoverable;
    /// a missing `[Content_Types].xml` is not.
    pub fn open(bytes: &[u8]) -> Result<Self> {
        let archive = ArchiveReader::new(bytes)?;

        let content_types_name = PartName::new(CONTENT_TYPES_NAME)?;
        let content_types_xml = archive
            .get(&content_types_name)
            .ok_or_else(|| OpcError::PartNotFound(CONTENT_TYPES_NAME.to_string()))?;
        let content_types = ContentTypes::from_xml(content_types_xml)?;

        let package_root = PartName::new(PACKAGE_ROOT)?;
        let rels = match archive.get(&package_root.rels_name()) {
            Some(rels_xml) => match Relationships::parse(rels_xml, PACKAGE_ROOT) {
                Ok(rels) => rels,
                Err(e) => {
                    tracing::warn!("unreadable package relationships, continuing without: {e}");
                    Relationships::new(PACKAGE_ROOT)
                },
            },
            None => {
                tracing::warn!("package has no relationship stream");
                Relationships::new(PACKAGE_ROOT)
            },
        };

        let mut package = Self {
            parts: Vec::new(),
            rels,
            content_types,
        };

        // Walk the relationship graph breadth-first; each part is loaded
        // with its relationships before its targets are visited.
        let mut queue: VecDeque<PartName> = package.rels.internal_targets()?.into();
        while let Some(name) = queue.pop_front() {
            if package.contains_part(&name) {
                continue;
            }
            let content_type = package.content_types.resolve(&name)?;
            let part = Part::from_archive(&archive, name, content_type)?;
            queue.extend(part.rels().internal_targets()?);
            package.parts.push(part);
        }

        Ok(package)
    }

    /// Serialize the package.
    ///
    /// Tree-backed parts encode through the registry. Fails when a
    /// relationship references a part that is neither present nor external.
    pub fn to_bytes(&self, registry: &Registry) -> Result<Vec<u8>> {
        self.check_relationship_closure()?;

        let mut content_types = self.content_types.clone();
        for part in &self.parts {
            content_types.register_part(part.name(), part.content_type());
        }

        let mut writer = ArchiveWriter::new();
        writer.write(
            &PartName::new(CONTENT_TYPES_NAME)?,
            content_types.to_xml().as_bytes(),
        )?;

        let package_root = PartName::new(PACKAGE_ROOT)?;
        if !self.rels.is_empty() {
            writer.write(&package_root.rels_name(), self.rels.to_xml().as_bytes())?;
        }

        for part in &self.parts {
            writer.write(part.name(), &part.payload(registry)?)?;
            if !part.rels().is_empty() {
                writer.write(&part.name().rels_name(), part.rels().to_xml().as_bytes())?;
            }
        }

        writer.finish()
    }

    fn check_relationship_closure(&self) -> Result<()> {
        for target in self.rels.internal_targets()? {
            if !self.contains_part(&target) {
                return Err(OpcError::InvalidRelationship(format!(
                    "package relationship targets missing part {target}"
                )));
            }
        }
        for part in &self.parts {
            for target in part.rels().internal_targets()? {
                if !self.contains_part(&target) {
                    return Err(OpcError::InvalidRelationship(format!(
                        "{} targets missing part {target}",
                        part.name()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Open a package from a file.
    pub async fn open_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        Self::open(&bytes)
    }

    /// Serialize the package and write it to a file.
    pub async fn save_path<P: AsRef<Path>>(&self, path: P, registry: &Registry) -> Result<()> {
        let bytes = self.to_bytes(registry)?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::constants::content_type as ct;

    fn blob_part(name: &str, content_type: &str) -> Part {
        Part::new_blob(
            PartName::new(name).unwrap(),
            content_type,
            format!("<x name={name:?}/>").into_bytes(),
        )
    }

    #[test]
    fn test_duplicate_part_rejected() {
        let mut pkg = Package::new();
        pkg.add_part(blob_part("/word/document.xml", ct::WML_DOCUMENT_MAIN))
            .unwrap();

        assert!(matches!(
            pkg.add_part(blob_part("/word/document.xml", ct::XML)),
            Err(OpcError::DuplicatePart(_))
        ));
    }

    #[test]
    fn test_next_part_name_skips_taken() {
        let mut pkg = Package::new();
        pkg.add_part(blob_part("/word/media/image1.png", ct::PNG)).unwrap();

        let next = pkg.next_part_name("/word/media/image%d.png").unwrap();
        assert_eq!(next.as_str(), "/word/media/image2.png");
    }

    #[test]
    fn test_write_rejects_dangling_relationship() {
        let registry = Registry::new();
        let mut pkg = Package::new();
        let ghost = PartName::new("/word/ghost.xml").unwrap();
        pkg.relate_to(&ghost, relationship_type::OFFICE_DOCUMENT);

        assert!(matches!(
            pkg.to_bytes(&registry),
            Err(OpcError::InvalidRelationship(_))
        ));
    }

    #[test]
    fn test_round_trip_with_related_parts() {
        let registry = Registry::new();
        let mut pkg = Package::new();

        let doc_name = PartName::new("/word/document.xml").unwrap();
        let styles_name = PartName::new("/word/styles.xml").unwrap();
        let mut doc = blob_part("/word/document.xml", ct::WML_DOCUMENT_MAIN);
        doc.relate_to(&styles_name, relationship_type::STYLES);
        pkg.add_part(doc).unwrap();
        pkg.add_part(blob_part("/word/styles.xml", ct::WML_STYLES)).unwrap();
        pkg.relate_to(&doc_name, relationship_type::OFFICE_DOCUMENT);

        let bytes = pkg.to_bytes(&registry).unwrap();
        let reopened = Package::open(&bytes).unwrap();

        assert_eq!(reopened.part_count(), 2);
        let main = reopened.main_document_part().unwrap();
        assert_eq!(main.name(), &doc_name);
        assert_eq!(main.content_type(), ct::WML_DOCUMENT_MAIN);

        let related = reopened.related_parts(&doc_name).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].name(), &styles_name);
    }

    #[test]
    fn test_open_without_package_rels_degrades_to_empty() {
        let mut writer = ArchiveWriter::new();
        writer
            .write(
                &PartName::new(CONTENT_TYPES_NAME).unwrap(),
                ContentTypes::new().to_xml().as_bytes(),
            )
            .unwrap();
        let bytes = writer.finish().unwrap();

        let pkg = Package::open(&bytes).unwrap();
        assert_eq!(pkg.part_count(), 0);
        assert!(pkg.rels().is_empty());
    }

    #[test]
    fn test_open_without_content_types_fails() {
        let bytes = ArchiveWriter::new().finish().unwrap();
        assert!(matches!(
            Package::open(&bytes),
            Err(OpcError::PartNotFound(_))
        ));
    }

    #[test]
    fn test_unreferenced_member_is_not_a_part() {
        let registry = Registry::new();
        let mut pkg = Package::new();
        let doc_name = PartName::new("/word/document.xml").unwrap();
        pkg.add_part(blob_part("/word/document.xml", ct::WML_DOCUMENT_MAIN))
            .unwrap();
        pkg.relate_to(&doc_name, relationship_type::OFFICE_DOCUMENT);
        let bytes = pkg.to_bytes(&registry).unwrap();

        // Splice an orphan member into the archive.
        let archive = ArchiveReader::new(&bytes).unwrap();
        let mut writer = ArchiveWriter::new();
        for name in ["[Content_Types].xml", "_rels/.rels", "word/document.xml"] {
            let part_name = PartName::new(format!("/{name}")).unwrap();
            writer.write(&part_name, archive.get(&part_name).unwrap()).unwrap();
        }
        writer
            .write(&PartName::new("/orphan.xml").unwrap(), b"<orphan/>")
            .unwrap();

        let reopened = Package::open(&writer.finish().unwrap()).unwrap();
        assert_eq!(reopened.part_count(), 1);
    }

    #[tokio::test]
    async fn test_save_and_open_path() {
        let registry = Registry::new();
        let mut pkg = Package::new();
        let doc_name = PartName::new("/word/document.xml").unwrap();
        pkg.add_part(blob_part("/word/document.xml", ct::WML_DOCUMENT_MAIN))
            .unwrap();
        pkg.relate_to(&doc_name, relationship_type::OFFICE_DOCUMENT);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.docx");
        pkg.save_path(&path, &registry).await.unwrap();

        let reopened = Package::open_path(&path).await.unwrap();
        assert_eq!(reopened.part_count(), 1);
    }
}
