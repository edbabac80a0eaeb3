//! The OPC package layer.
//!
//! [`Package`] hides the ZIP container behind part-path reads, the
//! content-type manifest, and lazily cached relationship lookups.
//! [`PackageBuilder`] accumulates parts in insertion order and assembles
//! the archive on [`PackageBuilder::finalize`].

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use gridbook_xml::content_types::{self, ContentTypes};
use gridbook_xml::namespaces::rel_types;
use gridbook_xml::relationships::{self, Relationship, Relationships};

use crate::error::{Error, Result};
use crate::paths;

/// Path of the content-types manifest.
pub const CONTENT_TYPES_PATH: &str = "/[Content_Types].xml";
/// Path of the package-level relationships part.
pub const ROOT_RELS_PATH: &str = "/_rels/.rels";
/// Path the office-document relationship must resolve to.
pub const WORKBOOK_PATH: &str = "/xl/workbook.xml";

/// A read-only OPC package over an in-memory archive.
#[derive(Debug)]
pub struct Package {
    archive: Mutex<ZipArchive<Cursor<Vec<u8>>>>,
    entry_names: HashSet<String>,
    content_types: ContentTypes,
    rels_cache: DashMap<String, Arc<Relationships>>,
}

impl Package {
    /// Open a package from raw bytes, validating the OPC skeleton:
    /// the manifest and root relationships must exist, and exactly one
    /// office-document relationship must resolve to `/xl/workbook.xml`.
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| Error::InvalidZipArchive(e.to_string()))?;

        let entry_names: HashSet<String> =
            archive.file_names().map(|n| n.to_string()).collect();

        let manifest = read_entry(&mut archive, CONTENT_TYPES_PATH)?;
        let content_types =
            content_types::parse_content_types(CONTENT_TYPES_PATH, &manifest)?;

        let root_rels_bytes = read_entry(&mut archive, ROOT_RELS_PATH)?;
        let root_rels = relationships::parse_relationships(ROOT_RELS_PATH, &root_rels_bytes)?;

        let office_docs: Vec<&Relationship> =
            root_rels.by_type(rel_types::OFFICE_DOCUMENT).collect();
        let office_doc = match office_docs.as_slice() {
            [single] => *single,
            [] => {
                return Err(Error::NotAnXlsxFile(
                    "no officeDocument relationship".to_string(),
                ))
            }
            _ => {
                return Err(Error::InvalidPackageStructure(
                    "multiple officeDocument relationships".to_string(),
                ))
            }
        };
        let workbook_path = paths::resolve_target("/", &office_doc.target);
        if workbook_path != WORKBOOK_PATH {
            return Err(Error::NotAnXlsxFile(format!(
                "officeDocument relationship targets '{workbook_path}'"
            )));
        }
        if !entry_names.contains(paths::entry_name(WORKBOOK_PATH)) {
            return Err(Error::MissingPart {
                path: WORKBOOK_PATH.to_string(),
            });
        }
        if let Some(declared) = content_types.content_type_of(WORKBOOK_PATH) {
            if declared != gridbook_xml::namespaces::mime_types::WORKBOOK
                && declared != gridbook_xml::namespaces::mime_types::XML
            {
                return Err(Error::InvalidContentType {
                    path: WORKBOOK_PATH.to_string(),
                    content_type: declared.to_string(),
                });
            }
        }

        let package = Self {
            archive: Mutex::new(archive),
            entry_names,
            content_types,
            rels_cache: DashMap::new(),
        };
        package
            .rels_cache
            .insert("/".to_string(), Arc::new(root_rels));
        Ok(package)
    }

    /// Read the raw bytes of a part.
    pub fn read_part(&self, part_path: &str) -> Result<Vec<u8>> {
        let mut archive = self.archive.lock().expect("package archive lock poisoned");
        read_entry(&mut archive, part_path)
    }

    /// Whether a part exists in the archive.
    pub fn exists(&self, part_path: &str) -> bool {
        self.entry_names.contains(paths::entry_name(part_path))
    }

    /// The relationships collection of a source part, parsed lazily and
    /// cached. A missing relationships file yields an empty collection.
    pub fn relationships_for(&self, source_part: &str) -> Result<Arc<Relationships>> {
        let key = source_part.to_string();
        if let Some(cached) = self.rels_cache.get(&key) {
            return Ok(Arc::clone(&cached));
        }

        let rels_path = paths::rels_path_for(source_part);
        let rels = if self.exists(&rels_path) {
            let bytes = self.read_part(&rels_path)?;
            relationships::parse_relationships(&rels_path, &bytes)?
        } else {
            Relationships::new()
        };

        let arc = Arc::new(rels);
        self.rels_cache.insert(key, Arc::clone(&arc));
        Ok(arc)
    }

    /// Resolve a relationship's target to an absolute part path.
    pub fn resolve(&self, rel: &Relationship, source_part: &str) -> String {
        paths::resolve_target(source_part, &rel.target)
    }

    /// The parsed content-type manifest.
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }
}

fn read_entry(
    archive: &mut ZipArchive<Cursor<Vec<u8>>>,
    part_path: &str,
) -> Result<Vec<u8>> {
    let name = paths::entry_name(part_path);
    let mut file = archive.by_name(name).map_err(|_| Error::MissingPart {
        path: part_path.to_string(),
    })?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes)
        .map_err(|e| Error::InvalidZipArchive(e.to_string()))?;
    Ok(bytes)
}

/// Accumulates parts and content-type registrations, emitting the archive
/// on finalize. Identical call sequences produce byte-identical output.
pub struct PackageBuilder {
    parts: Vec<(String, Vec<u8>)>,
    content_types: ContentTypes,
}

impl PackageBuilder {
    /// Create a builder pre-loaded with the standard extension defaults.
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            content_types: ContentTypes::standard(),
        }
    }

    /// Record a part. Writing the same path again replaces the bytes while
    /// keeping the original position.
    pub fn write(&mut self, part_path: &str, bytes: Vec<u8>) {
        if let Some(existing) = self.parts.iter_mut().find(|(p, _)| p == part_path) {
            existing.1 = bytes;
        } else {
            self.parts.push((part_path.to_string(), bytes));
        }
    }

    /// Register a content-type default for an extension.
    pub fn add_default(&mut self, extension: &str, content_type: &str) {
        self.content_types.add_default(extension, content_type);
    }

    /// Register a content-type override for a part.
    pub fn add_override(&mut self, part_path: &str, content_type: &str) {
        self.content_types.add_override(part_path, content_type);
    }

    /// Assemble the ZIP: the manifest first, then parts in insertion order.
    pub fn finalize(self) -> Result<Vec<u8>> {
        let manifest = content_types::write_content_types(&self.content_types)?;

        let mut buf = Vec::new();
        {
            let cursor = Cursor::new(&mut buf);
            let mut zip = ZipWriter::new(cursor);
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            write_zip_entry(&mut zip, CONTENT_TYPES_PATH, &manifest, &options)?;
            for (path, bytes) in &self.parts {
                write_zip_entry(&mut zip, path, bytes, &options)?;
            }
            zip.finish()
                .map_err(|e| Error::InvalidZipArchive(e.to_string()))?;
        }
        Ok(buf)
    }
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn write_zip_entry(
    zip: &mut ZipWriter<Cursor<&mut Vec<u8>>>,
    part_path: &str,
    bytes: &[u8],
    options: &SimpleFileOptions,
) -> Result<()> {
    zip.start_file(paths::entry_name(part_path), options.clone())
        .map_err(|e| Error::InvalidZipArchive(e.to_string()))?;
    zip.write_all(bytes)?;
    Ok(())
}
