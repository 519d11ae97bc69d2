use std::fmt;
use std::sync::Arc;

use crate::catalog::{CatalogError, CatalogMutation, CatalogQuery, MediaCatalog, QueryResult};
use crate::error::{FileError, Result};
use crate::media::{AddressingScheme, ContentType, Volume};
use crate::uri::Uri;
use crate::vfs::handle::{FileHandle, SafeFile};
use crate::vfs::path::{
    NodeKind, SEPARATOR, after_last_separator, before_last_separator, classify,
    collapse_separators,
};
use crate::vfs::stream::{InputStream, OutputStream, WriteMode};

/// One node of the directory tree emulated over a catalog collection.
///
/// The catalog only knows rows with a display name and a relative-path
/// string. A `MediaFile` is a coordinate in that namespace: a file when its
/// path has no trailing separator, a synthetic directory otherwise. It holds
/// no row state; every metadata access queries the catalog again.
#[derive(Debug, Clone)]
pub struct MediaFile {
    catalog: Arc<dyn MediaCatalog>,
    content_type: ContentType,
    volume: Volume,
    scheme: AddressingScheme,
    collection: Uri,
    /// Path below the category root, separators collapsed,
    /// e.g. `/hello/text.txt`
    sanitized_path: String,
    kind: NodeKind,
    /// Category-prefixed directory portion without trailing separator,
    /// e.g. `Download/hello`
    relative_path: String,
    /// Last segment, e.g. `text.txt`; empty for directories
    display_name: String,
}

impl MediaFile {
    pub fn new(
        catalog: Arc<dyn MediaCatalog>,
        content_type: ContentType,
        volume: Volume,
        scheme: AddressingScheme,
        path: &str,
    ) -> Result<Self> {
        let sanitized_path = collapse_separators(path);
        let kind = classify(&sanitized_path);
        let relative_path = before_last_separator(&collapse_separators(&format!(
            "{}{SEPARATOR}{sanitized_path}",
            content_type.path()
        )))
        .to_string();
        let display_name = after_last_separator(&sanitized_path).to_string();

        let file = MediaFile {
            catalog,
            content_type,
            volume,
            scheme,
            collection: content_type.collection_uri(volume, scheme)?,
            sanitized_path,
            kind,
            relative_path,
            display_name,
        };
        file.check_invariants()?;
        Ok(file)
    }

    /// Root directory of a category
    pub fn root(
        catalog: Arc<dyn MediaCatalog>,
        content_type: ContentType,
        volume: Volume,
        scheme: AddressingScheme,
    ) -> Result<Self> {
        Self::new(catalog, content_type, volume, scheme, "/")
    }

    fn check_invariants(&self) -> Result<()> {
        let violation = |what: &str| {
            Err(FileError::InvariantViolation(format!(
                "{what} (path {:?}, relative path {:?}, name {:?})",
                self.sanitized_path, self.relative_path, self.display_name
            )))
        };

        let double = format!("{SEPARATOR}{SEPARATOR}");
        if self.relative_path.ends_with(SEPARATOR) {
            return violation("relative path ends with a separator");
        }
        if self.relative_path.contains(&double) {
            return violation("relative path contains a doubled separator");
        }
        if self.display_name.contains(SEPARATOR) {
            return violation("display name contains a separator");
        }
        let blank = self.display_name.trim().is_empty();
        if self.kind.is_directory() && !blank {
            return violation("directory has a display name");
        }
        if self.kind.is_file() && blank {
            return violation("file has a blank display name");
        }
        Ok(())
    }

    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    /// Address of the catalog collection this node lives in
    pub fn collection(&self) -> &Uri {
        &self.collection
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn sanitized_path(&self) -> &str {
        &self.sanitized_path
    }

    fn query(&self) -> CatalogQuery<'_> {
        CatalogQuery::new(self.catalog.as_ref(), &self.collection)
    }

    fn mutation(&self) -> CatalogMutation<'_> {
        CatalogMutation::new(self.catalog.as_ref(), &self.collection, self.content_type)
    }

    fn require_directory(&self, operation: &str) -> Result<()> {
        if self.kind.is_directory() {
            Ok(())
        } else {
            Err(FileError::InvalidArgument(format!(
                "{operation} requires a directory, {self} is a file"
            )))
        }
    }

    fn require_file(&self, operation: &str) -> Result<()> {
        if self.kind.is_file() {
            Ok(())
        } else {
            Err(FileError::InvalidArgument(format!(
                "{operation} requires a file, {self} is a directory"
            )))
        }
    }

    fn require_name(name: &str, operation: &str) -> Result<()> {
        if name.trim().is_empty() {
            Err(FileError::InvalidArgument(format!("{operation} requires a non-blank name")))
        } else {
            Ok(())
        }
    }

    /// Handle for a direct child of this directory
    fn child(&self, name: &str, kind: NodeKind) -> Result<MediaFile> {
        self.require_directory("appending a child")?;

        // navigating into the category directory from its own root
        if kind.is_directory() && self.relative_path == name {
            return Ok(self.clone());
        }

        let trailing = if kind.is_directory() { "/" } else { "" };
        MediaFile::new(
            Arc::clone(&self.catalog),
            self.content_type,
            self.volume,
            self.scheme,
            &format!("{}{name}{trailing}", self.sanitized_path),
        )
    }

    /// The catalog row for this file, queried afresh
    fn resolve(&self) -> Result<QueryResult> {
        self.query().find(&self.relative_path, &self.display_name)
    }

    fn open_existing_output(&self, append: bool) -> Option<OutputStream> {
        let row = self.resolve().ok()?;
        match self
            .catalog
            .open_output_stream(&row.uri, WriteMode::for_existing(append))
        {
            Ok(out) => Some(out),
            Err(e) => {
                log::warn!("failed to open {} for writing, creating a new row: {e}", row.uri);
                None
            }
        }
    }
}

impl FileHandle for MediaFile {
    fn create_file(&self, display_name: &str) -> Result<SafeFile> {
        self.require_directory("create_file")?;
        Self::require_name(display_name, "create_file")?;

        let child = self.child(display_name, NodeKind::File)?;
        match child.resolve() {
            Ok(existing) => log::debug!("{child} already exists as {}", existing.uri),
            Err(e) if e.is_not_found() => {
                self.mutation().insert(&child.relative_path, &child.display_name)?;
            }
            Err(e) => return Err(e),
        }
        Ok(SafeFile::Media(child))
    }

    fn create_directory(&self, name: &str) -> Result<SafeFile> {
        Self::require_name(name, "create_directory")?;
        // nothing to insert: directories exist only as relative-path prefixes
        Ok(SafeFile::Media(self.child(name, NodeKind::Directory)?))
    }

    fn uri(&self) -> Result<Uri> {
        self.require_file("uri")?;
        Ok(self.resolve()?.uri)
    }

    fn name(&self) -> Result<String> {
        self.require_file("name")?;
        Ok(self.display_name.clone())
    }

    fn file_type(&self) -> Result<String> {
        Err(FileError::Unsupported("type of a catalog file".into()))
    }

    fn file_path(&self) -> Result<String> {
        Ok(collapse_separators(&format!(
            "{}{SEPARATOR}{}",
            self.relative_path, self.display_name
        )))
    }

    fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    fn last_modified(&self) -> Result<i64> {
        self.require_file("last_modified")?;
        Ok(self.resolve()?.last_modified)
    }

    fn length(&self) -> Result<u64> {
        self.require_file("length")?;
        let row = self.resolve()?;
        if row.reported_length > 0 {
            return Ok(row.reported_length as u64);
        }

        // pending and virtual rows report no size; measure the content instead
        match self.catalog.open_file_descriptor(&row.uri) {
            Ok(descriptor) => {
                if let Some(size) = descriptor.stat_size() {
                    return Ok(size);
                }
            }
            Err(CatalogError::NotFound(what)) => {
                return Err(FileError::NotFound(format!("length of {self}: {what}")));
            }
            Err(e) => log::debug!("descriptor for {} unavailable: {e}", row.uri),
        }

        // lower bound only: bytes available without blocking
        let stream = self
            .catalog
            .open_input_stream(&row.uri)
            .map_err(|e| FileError::NotFound(format!("length of {self}: {e}")))?;
        stream
            .available()
            .map_err(|e| FileError::io(format!("length of {self}"), e))
    }

    fn can_read(&self) -> Result<bool> {
        Err(FileError::Unsupported("read permission of a catalog file".into()))
    }

    fn can_write(&self) -> Result<bool> {
        Err(FileError::Unsupported("write permission of a catalog file".into()))
    }

    fn delete(&self) -> Result<()> {
        if self.kind.is_file() {
            let row = self.resolve()?;
            return if self.mutation().delete(&row.uri)? {
                Ok(())
            } else {
                Err(FileError::NotFound(format!("no row removed for {self}")))
            };
        }

        let children = self.list_files()?;
        let total = children.len();
        let failed = children
            .iter()
            .filter(|child| match child.delete() {
                Ok(()) => false,
                Err(e) => {
                    log::debug!("failed to delete {child}: {e}");
                    true
                }
            })
            .count();

        if failed == 0 {
            Ok(())
        } else {
            Err(FileError::io(
                format!("{self} partially deleted"),
                std::io::Error::other(format!("{failed} of {total} entries could not be deleted")),
            ))
        }
    }

    fn exists(&self) -> Result<bool> {
        if self.kind.is_directory() {
            return Ok(true);
        }
        match self.resolve() {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn list_files(&self) -> Result<Vec<SafeFile>> {
        self.require_directory("list_files")?;
        self.query()
            .list_display_names(&self.relative_path)?
            .into_iter()
            .map(|name| self.child(&name, NodeKind::File).map(SafeFile::Media))
            .collect()
    }

    fn find_file(&self, display_name: &str, _ignore_case: bool) -> Result<SafeFile> {
        self.require_directory("find_file")?;
        Self::require_name(display_name, "find_file")?;

        // equality filter: case sensitivity is whatever the catalog collation does
        let candidate = self.child(display_name, NodeKind::File)?;
        if candidate.exists()? {
            Ok(SafeFile::Media(candidate))
        } else {
            Err(FileError::NotFound(format!("{display_name} in {self}")))
        }
    }

    fn rename_to(&self, _name: &str) -> Result<SafeFile> {
        Err(FileError::Unsupported("renaming a catalog file".into()))
    }

    fn open_output_stream(&self, append: bool) -> Result<OutputStream> {
        self.require_file("open_output_stream")?;
        if let Some(out) = self.open_existing_output(append) {
            return Ok(out);
        }

        // the row is new, so plain write access is enough
        let row = self.mutation().insert(&self.relative_path, &self.display_name)?;
        self.catalog
            .open_output_stream(&row, WriteMode::Write)
            .map_err(|e| e.into_file_error(&format!("open {row} for writing")))
    }

    fn open_input_stream(&self) -> Result<InputStream> {
        self.require_file("open_input_stream")?;
        let row = self.resolve()?;
        self.catalog
            .open_input_stream(&row.uri)
            .map_err(|e| e.into_file_error(&format!("open {} for reading", row.uri)))
    }

    fn directories_are_synthetic(&self) -> bool {
        true
    }
}

impl fmt::Display for MediaFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.content_type, self.sanitized_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::error::ErrorKind;
    use std::io::{Read, Write};

    fn downloads(catalog: &MemoryCatalog) -> MediaFile {
        MediaFile::root(
            Arc::new(catalog.clone()),
            ContentType::Downloads,
            Volume::External,
            AddressingScheme::VolumeKeyed,
        )
        .unwrap()
    }

    fn media(file: SafeFile) -> MediaFile {
        match file {
            SafeFile::Media(m) => m,
            other => panic!("expected a catalog handle, got {other:?}"),
        }
    }

    #[test]
    fn test_root_coordinates() {
        let root = downloads(&MemoryCatalog::new());
        assert!(root.is_directory());
        assert!(!root.is_file());
        assert_eq!(root.relative_path(), "Download");
        assert_eq!(root.display_name(), "");
        assert_eq!(root.file_path().unwrap(), "Download/");
    }

    #[test]
    fn test_nested_coordinates() {
        let catalog: Arc<dyn MediaCatalog> = Arc::new(MemoryCatalog::new());
        let file = MediaFile::new(
            catalog,
            ContentType::Downloads,
            Volume::External,
            AddressingScheme::VolumeKeyed,
            "//hello///text.txt",
        )
        .unwrap();
        assert_eq!(file.sanitized_path(), "/hello/text.txt");
        assert_eq!(file.relative_path(), "Download/hello");
        assert_eq!(file.display_name(), "text.txt");
        assert_eq!(file.file_path().unwrap(), "Download/hello/text.txt");
    }

    #[test]
    fn test_blank_file_name_violates_invariants() {
        let catalog: Arc<dyn MediaCatalog> = Arc::new(MemoryCatalog::new());
        let err = MediaFile::new(
            catalog,
            ContentType::Images,
            Volume::External,
            AddressingScheme::VolumeKeyed,
            "",
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvariantViolation);
    }

    #[test]
    fn test_create_directory_inserts_nothing() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);
        let sub = media(root.create_directory("sub").unwrap());

        assert!(sub.is_directory());
        assert!(sub.exists().unwrap());
        assert_eq!(sub.file_path().unwrap(), "Download/sub/");
        assert!(catalog.is_empty(root.collection()));
    }

    #[test]
    fn test_category_segment_is_the_root() {
        let root = downloads(&MemoryCatalog::new());
        let same = media(root.create_directory("Download").unwrap());
        assert_eq!(same.sanitized_path(), "/");
    }

    #[test]
    fn test_create_file_is_idempotent() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);

        let first = root.create_file("a.txt").unwrap();
        let second = root.create_file("a.txt").unwrap();
        assert_eq!(catalog.len(root.collection()), 1);
        assert_eq!(first.file_path().unwrap(), second.file_path().unwrap());
        assert_eq!(first.uri().unwrap(), second.uri().unwrap());
    }

    #[test]
    fn test_wrong_node_kind() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);
        let file = root.create_file("a.txt").unwrap();

        assert_eq!(root.name().unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(root.length().unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(file.list_files().unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(file.create_file("b.txt").unwrap_err().kind(), ErrorKind::InvalidArgument);
        assert_eq!(root.create_file("  ").unwrap_err().kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_unsupported_operations() {
        let catalog = MemoryCatalog::new();
        let file = downloads(&catalog).create_file("a.txt").unwrap();
        assert_eq!(file.rename_to("b.txt").unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(file.file_type().unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(file.can_read().unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(file.can_write().unwrap_err().kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_length_uses_descriptor_when_size_is_stale() {
        let catalog = MemoryCatalog::new().with_stale_sizes();
        let file = downloads(&catalog).create_file("a.bin").unwrap();
        file.open_output_stream(false).unwrap().write_all(&[7u8; 42]).unwrap();

        assert_eq!(file.length().unwrap(), 42);
        assert_eq!(file.length().unwrap(), 42);
    }

    #[test]
    fn test_length_falls_back_to_available_bytes() {
        let catalog = MemoryCatalog::new()
            .with_stale_sizes()
            .with_failing_descriptors();
        let file = downloads(&catalog).create_file("a.bin").unwrap();
        file.open_output_stream(false).unwrap().write_all(b"abcdef").unwrap();

        assert_eq!(file.length().unwrap(), 6);
    }

    #[test]
    fn test_missing_file_metadata() {
        let root = downloads(&MemoryCatalog::new());
        let ghost = media(root.create_directory("x").unwrap())
            .child("ghost.txt", NodeKind::File)
            .unwrap();
        assert!(!ghost.exists().unwrap());
        assert!(ghost.uri().unwrap_err().is_not_found());
        assert!(ghost.length().unwrap_err().is_not_found());
        assert!(ghost.last_modified().unwrap_err().is_not_found());
        assert!(ghost.open_input_stream().err().unwrap().is_not_found());
        assert!(ghost.delete().unwrap_err().is_not_found());
    }

    #[test]
    fn test_output_stream_creates_missing_row() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);
        let file = media(root.create_directory("notes").unwrap())
            .child("todo.txt", NodeKind::File)
            .unwrap();
        assert!(!file.exists().unwrap());

        file.open_output_stream(false).unwrap().write_all(b"milk").unwrap();
        assert!(file.exists().unwrap());

        file.open_output_stream(true).unwrap().write_all(b", eggs").unwrap();
        let mut text = String::new();
        file.open_input_stream().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "milk, eggs");

        file.open_output_stream(false).unwrap().write_all(b"bread").unwrap();
        text.clear();
        file.open_input_stream().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "bread");
        assert_eq!(catalog.len(root.collection()), 1);
    }

    #[test]
    fn test_output_stream_falls_through_to_a_new_row() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);
        let theirs = catalog
            .seed(root.collection(), "Download/", "shared.txt", b"keep")
            .unwrap();
        catalog.make_read_only(&theirs).unwrap();

        let file = root.child("shared.txt", NodeKind::File).unwrap();
        file.open_output_stream(true).unwrap().write_all(b"mine").unwrap();

        // the unwritable row is untouched; the bytes land in a sibling row
        let mut text = String::new();
        catalog.open_input_stream(&theirs).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "keep");
        assert_eq!(catalog.len(root.collection()), 2);

        let sibling = root.find_file("shared (1).txt", false).unwrap();
        text.clear();
        sibling.open_input_stream().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "mine");
    }

    #[test]
    fn test_output_stream_fails_when_creation_fails_too() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);
        let theirs = catalog
            .seed(root.collection(), "Download/", "shared.txt", b"keep")
            .unwrap();
        catalog.make_read_only(&theirs).unwrap();
        catalog.deny_inserts();

        let file = root.child("shared.txt", NodeKind::File).unwrap();
        let err = file.open_output_stream(false).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("insert shared.txt"), "{err}");
        assert_eq!(catalog.len(root.collection()), 1);
    }

    #[test]
    fn test_directory_delete_attempts_every_child() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);
        for name in ["a.txt", "b.txt", "c.txt"] {
            let row = catalog
                .seed(root.collection(), "Download/junk/", name, b"x")
                .unwrap();
            if name == "b.txt" {
                catalog.make_read_only(&row).unwrap();
            }
        }

        let junk = root.create_directory("junk").unwrap();
        let err = junk.delete().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("partially deleted"), "{err}");

        let left: Vec<_> = junk
            .list_files()
            .unwrap()
            .iter()
            .map(|f| f.name().unwrap())
            .collect();
        assert_eq!(left, vec!["b.txt"]);
        assert_eq!(catalog.len(root.collection()), 1);
    }

    #[test]
    fn test_list_skips_unnamed_rows() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);
        catalog.seed(root.collection(), "Download/", "named.txt", b"x").unwrap();
        catalog.seed_unnamed(root.collection(), "Download/").unwrap();

        let names: Vec<_> = root
            .list_files()
            .unwrap()
            .iter()
            .map(|f| f.name().unwrap())
            .collect();
        assert_eq!(names, vec!["named.txt"]);
    }

    #[test]
    fn test_find_file_is_case_sensitive() {
        let catalog = MemoryCatalog::new();
        let root = downloads(&catalog);
        root.create_file("Report.pdf").unwrap();

        assert!(root.find_file("Report.pdf", false).is_ok());
        assert!(root.find_file("report.pdf", true).unwrap_err().is_not_found());
    }
}
