//! The physical package: a ZIP archive of member streams.
//!
//! Reading inflates every member up front into an in-memory map, so the
//! logical layer above never touches the archive again. Writing streams
//! members out with Deflate compression.

use super::error::Result;
use super::partname::PartName;
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Read-only access to the members of a serialized package.
#[derive(Debug)]
pub struct ArchiveReader {
    files: HashMap<String, Vec<u8>>,
}

impl ArchiveReader {
    /// Inflate a ZIP archive from bytes.
    pub fn new(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes.to_vec()))?;
        let mut files = HashMap::with_capacity(archive.len());

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let mut content = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut content)?;
            files.insert(file.name().to_string(), content);
        }

        Ok(Self { files })
    }

    /// Get a member's content by part name.
    pub fn get(&self, name: &PartName) -> Option<&[u8]> {
        self.files.get(name.membername()).map(Vec::as_slice)
    }

    /// Check whether a part exists in the archive.
    pub fn contains(&self, name: &PartName) -> bool {
        self.files.contains_key(name.membername())
    }

    /// The number of member streams.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Streaming writer producing a serialized package.
pub struct ArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    /// Write one member with Deflate compression.
    pub fn write(&mut self, name: &PartName, content: &[u8]) -> Result<()> {
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        self.zip.start_file(name.membername(), options)?;
        self.zip.write_all(content)?;
        Ok(())
    }

    /// Finish the archive and return its bytes.
    pub fn finish(self) -> Result<Vec<u8>> {
        Ok(self.zip.finish()?.into_inner())
    }
}

impl Default for ArchiveWriter {
    fn default() -> Self {
        Self::new()
    }
}
