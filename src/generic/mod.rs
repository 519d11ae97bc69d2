//! Handles over opaque URIs served by a document provider.
//!
//! The provider library answers everything. When its streams or deletion
//! fail, the same operation is retried through the content resolver by URI,
//! the way catalog rows are opened.

use std::fmt;
use std::sync::Arc;

use crate::catalog::MediaCatalog;
use crate::error::{FileError, Result};
use crate::uri::Uri;
use crate::vfs::handle::{FileHandle, SafeFile};
use crate::vfs::path::split_stem_mime;
use crate::vfs::stream::{InputStream, OutputStream, WriteMode};

/// A document as the host's document provider sees it
pub trait UniversalFile: Send + Sync + fmt::Debug {
    fn uri(&self) -> Uri;

    fn name(&self) -> Result<String>;

    fn file_type(&self) -> Result<String>;

    fn is_directory(&self) -> bool;

    fn is_file(&self) -> bool;

    fn last_modified(&self) -> Result<i64>;

    /// Provider-reported size, `-1` when the provider does not know it
    fn length(&self) -> Result<i64>;

    fn can_read(&self) -> Result<bool>;

    fn can_write(&self) -> Result<bool>;

    fn exists(&self) -> Result<bool>;

    fn list_files(&self) -> Result<Vec<Arc<dyn UniversalFile>>>;

    fn find_file(&self, name: &str, ignore_case: bool) -> Result<Option<Arc<dyn UniversalFile>>>;

    fn create_file(&self, name: &str, mime: Option<&str>) -> Result<Arc<dyn UniversalFile>>;

    fn create_directory(&self, name: &str) -> Result<Arc<dyn UniversalFile>>;

    fn rename_to(&self, name: &str) -> Result<Arc<dyn UniversalFile>>;

    /// True iff the document was removed
    fn delete(&self) -> Result<bool>;

    fn open_input_stream(&self) -> Result<InputStream>;

    fn open_output_stream(&self, append: bool) -> Result<OutputStream>;

    fn file_path(&self) -> Result<String> {
        Ok(self.uri().to_string())
    }
}

/// Resolves URIs, bundled assets and resources to provider documents
pub trait UniversalFileProvider: Send + Sync + fmt::Debug {
    fn from_uri(&self, uri: &Uri) -> Result<Arc<dyn UniversalFile>>;

    fn from_asset(&self, name: &str) -> Result<Arc<dyn UniversalFile>>;

    fn from_resource(&self, id: u32) -> Result<Arc<dyn UniversalFile>>;
}

#[derive(Debug, Clone)]
pub struct GenericFile {
    file: Arc<dyn UniversalFile>,
    resolver: Arc<dyn MediaCatalog>,
}

impl GenericFile {
    pub fn new(file: Arc<dyn UniversalFile>, resolver: Arc<dyn MediaCatalog>) -> Self {
        Self { file, resolver }
    }

    fn wrap(&self, file: Arc<dyn UniversalFile>) -> SafeFile {
        SafeFile::Generic(GenericFile::new(file, Arc::clone(&self.resolver)))
    }

    fn measure(&self) -> Result<u64> {
        let stream = self.open_input_stream()?;
        stream
            .available()
            .map_err(|e| FileError::io(format!("measure {}", self.file.uri()), e))
    }
}

impl FileHandle for GenericFile {
    fn create_file(&self, display_name: &str) -> Result<SafeFile> {
        let (_, mime) = split_stem_mime(display_name);
        Ok(self.wrap(self.file.create_file(display_name, mime)?))
    }

    fn create_directory(&self, name: &str) -> Result<SafeFile> {
        Ok(self.wrap(self.file.create_directory(name)?))
    }

    fn uri(&self) -> Result<Uri> {
        Ok(self.file.uri())
    }

    fn name(&self) -> Result<String> {
        self.file.name()
    }

    fn file_type(&self) -> Result<String> {
        self.file.file_type()
    }

    fn file_path(&self) -> Result<String> {
        self.file.file_path()
    }

    fn is_directory(&self) -> bool {
        self.file.is_directory()
    }

    fn is_file(&self) -> bool {
        self.file.is_file()
    }

    fn last_modified(&self) -> Result<i64> {
        self.file.last_modified()
    }

    fn length(&self) -> Result<u64> {
        let first = match self.file.length() {
            Ok(reported) if reported > 1 => return Ok(reported as u64),
            // providers report 0 or 1 for content they have not sized yet
            Ok(reported) if reported >= 0 => match self.measure() {
                Ok(available) => return Ok(available),
                Err(e) => e,
            },
            Ok(_) => FileError::NotFound(format!("provider has no length for {}", self.file.uri())),
            Err(e) => e,
        };

        let uri = self.file.uri();
        match self.resolver.open_file_descriptor(&uri) {
            Ok(descriptor) => descriptor.stat_size().ok_or(first),
            Err(e) => {
                log::debug!("descriptor for {uri} unavailable: {e}");
                Err(first)
            }
        }
    }

    fn can_read(&self) -> Result<bool> {
        self.file.can_read()
    }

    fn can_write(&self) -> Result<bool> {
        self.file.can_write()
    }

    fn delete(&self) -> Result<()> {
        match self.file.delete() {
            Ok(true) => return Ok(()),
            Ok(false) => log::debug!("provider kept {}, deleting by uri", self.file.uri()),
            Err(e) => log::debug!("provider failed to delete {}: {e}", self.file.uri()),
        }

        let uri = self.file.uri();
        let removed = self
            .resolver
            .delete(&uri)
            .map_err(|e| e.into_file_error(&format!("delete {uri}")))?;
        if removed > 0 {
            Ok(())
        } else {
            Err(FileError::NotFound(format!("nothing deleted at {uri}")))
        }
    }

    fn exists(&self) -> Result<bool> {
        self.file.exists()
    }

    fn list_files(&self) -> Result<Vec<SafeFile>> {
        Ok(self
            .file
            .list_files()?
            .into_iter()
            .map(|f| self.wrap(f))
            .collect())
    }

    fn find_file(&self, display_name: &str, ignore_case: bool) -> Result<SafeFile> {
        self.file
            .find_file(display_name, ignore_case)?
            .map(|f| self.wrap(f))
            .ok_or_else(|| FileError::NotFound(format!("{display_name} in {}", self.file.uri())))
    }

    fn rename_to(&self, name: &str) -> Result<SafeFile> {
        Ok(self.wrap(self.file.rename_to(name)?))
    }

    fn open_output_stream(&self, append: bool) -> Result<OutputStream> {
        if let Ok(out) = self
            .file
            .open_output_stream(append)
            .inspect_err(|e| log::debug!("provider cannot write {}: {e}", self.file.uri()))
        {
            return Ok(out);
        }

        let uri = self.file.uri();
        self.resolver
            .open_output_stream(&uri, WriteMode::for_existing(append))
            .map_err(|e| e.into_file_error(&format!("open {uri} for writing")))
    }

    fn open_input_stream(&self) -> Result<InputStream> {
        if let Ok(input) = self
            .file
            .open_input_stream()
            .inspect_err(|e| log::debug!("provider cannot read {}: {e}", self.file.uri()))
        {
            return Ok(input);
        }

        let uri = self.file.uri();
        self.resolver
            .open_input_stream(&uri)
            .map_err(|e| e.into_file_error(&format!("open {uri} for reading")))
    }
}

impl fmt::Display for GenericFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file.uri())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MemoryCatalog;
    use crate::media::{AddressingScheme, ContentType, Volume};
    use std::io::{Read, Write};

    /// Document whose provider can only describe it; bytes live in a catalog row
    #[derive(Debug)]
    struct Document {
        uri: Uri,
        /// `None` makes the provider fail to report a length
        reported: Option<i64>,
    }

    impl UniversalFile for Document {
        fn uri(&self) -> Uri {
            self.uri.clone()
        }
        fn name(&self) -> Result<String> {
            Ok("doc.bin".into())
        }
        fn file_type(&self) -> Result<String> {
            Ok("application/octet-stream".into())
        }
        fn is_directory(&self) -> bool {
            false
        }
        fn is_file(&self) -> bool {
            true
        }
        fn last_modified(&self) -> Result<i64> {
            Ok(0)
        }
        fn length(&self) -> Result<i64> {
            self.reported
                .ok_or_else(|| FileError::Unsupported("provider length".into()))
        }
        fn can_read(&self) -> Result<bool> {
            Ok(true)
        }
        fn can_write(&self) -> Result<bool> {
            Ok(false)
        }
        fn exists(&self) -> Result<bool> {
            Ok(true)
        }
        fn list_files(&self) -> Result<Vec<Arc<dyn UniversalFile>>> {
            Ok(Vec::new())
        }
        fn find_file(&self, _: &str, _: bool) -> Result<Option<Arc<dyn UniversalFile>>> {
            Ok(None)
        }
        fn create_file(&self, name: &str, _: Option<&str>) -> Result<Arc<dyn UniversalFile>> {
            Err(FileError::Unsupported(format!("create {name} in a document")))
        }
        fn create_directory(&self, name: &str) -> Result<Arc<dyn UniversalFile>> {
            Err(FileError::Unsupported(format!("mkdir {name} in a document")))
        }
        fn rename_to(&self, name: &str) -> Result<Arc<dyn UniversalFile>> {
            Err(FileError::Unsupported(format!("rename to {name}")))
        }
        fn delete(&self) -> Result<bool> {
            Err(FileError::Unsupported("provider delete".into()))
        }
        fn open_input_stream(&self) -> Result<InputStream> {
            Err(FileError::Unsupported("provider read".into()))
        }
        fn open_output_stream(&self, _: bool) -> Result<OutputStream> {
            Err(FileError::Unsupported("provider write".into()))
        }
    }

    fn document(catalog: &MemoryCatalog, content: &[u8], reported: Option<i64>) -> GenericFile {
        let collection = ContentType::Downloads
            .collection_uri(Volume::External, AddressingScheme::VolumeKeyed)
            .unwrap();
        let uri = catalog
            .seed(&collection, "Download/", "doc.bin", content)
            .unwrap();
        GenericFile::new(
            Arc::new(Document { uri, reported }),
            Arc::new(catalog.clone()),
        )
    }

    #[test]
    fn test_reported_length_is_trusted() {
        let file = document(&MemoryCatalog::new(), b"abc", Some(512));
        assert_eq!(file.length().unwrap(), 512);
    }

    #[test]
    fn test_small_length_is_measured() {
        let file = document(&MemoryCatalog::new(), b"abcdef", Some(0));
        assert_eq!(file.length().unwrap(), 6);
    }

    #[test]
    fn test_unknown_length_uses_descriptor() {
        let file = document(&MemoryCatalog::new(), b"abc", Some(-1));
        assert_eq!(file.length().unwrap(), 3);
    }

    #[test]
    fn test_provider_length_error_uses_descriptor() {
        let file = document(&MemoryCatalog::new(), b"abcd", None);
        assert_eq!(file.length().unwrap(), 4);
    }

    #[test]
    fn test_unknown_length_without_descriptor_fails() {
        let catalog = MemoryCatalog::new().with_failing_descriptors();
        let file = document(&catalog, b"abc", Some(-1));
        assert!(file.length().unwrap_err().is_not_found());

        let file = document(&catalog, b"abc", None);
        assert_eq!(file.length().unwrap_err().kind(), crate::error::ErrorKind::Unsupported);
    }

    #[test]
    fn test_streams_and_delete_go_through_resolver() {
        let catalog = MemoryCatalog::new();
        let file = document(&catalog, b"old", Some(3));

        file.open_output_stream(true).unwrap().write_all(b" new").unwrap();
        let mut text = String::new();
        file.open_input_stream().unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "old new");

        file.delete().unwrap();
        assert!(file.delete().unwrap_err().is_not_found());
    }

    #[test]
    fn test_missing_child() {
        let file = document(&MemoryCatalog::new(), b"", Some(0));
        assert!(file.find_file("x", true).unwrap_err().is_not_found());
    }
}
