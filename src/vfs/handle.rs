use std::fmt;

use crate::error::{FileError, Result};
use crate::generic::GenericFile;
use crate::media::MediaFile;
use crate::raw::RawFile;
use crate::uri::Uri;
use crate::vfs::path::segments;
use crate::vfs::stream::{InputStream, OutputStream};

/// Operations every file handle supports, whatever backs it.
///
/// Handles are immutable coordinates. Operations that create return a new
/// handle; metadata is re-read from the backend on each call.
pub trait FileHandle {
    /// Create (or reuse) a file named `display_name` in this directory
    fn create_file(&self, display_name: &str) -> Result<SafeFile>;

    /// Create (or reuse) a subdirectory named `name`
    fn create_directory(&self, name: &str) -> Result<SafeFile>;

    fn uri(&self) -> Result<Uri>;

    fn name(&self) -> Result<String>;

    /// MIME type of the file
    fn file_type(&self) -> Result<String>;

    fn file_path(&self) -> Result<String>;

    fn is_directory(&self) -> bool;

    fn is_file(&self) -> bool;

    /// Modification time in epoch seconds
    fn last_modified(&self) -> Result<i64>;

    /// Size in bytes
    fn length(&self) -> Result<u64>;

    fn can_read(&self) -> Result<bool>;

    fn can_write(&self) -> Result<bool>;

    fn delete(&self) -> Result<()>;

    fn exists(&self) -> Result<bool>;

    /// Direct children of this directory
    fn list_files(&self) -> Result<Vec<SafeFile>>;

    fn find_file(&self, display_name: &str, ignore_case: bool) -> Result<SafeFile>;

    fn rename_to(&self, name: &str) -> Result<SafeFile>;

    /// Open for writing. `append` keeps existing content, otherwise it is
    /// truncated.
    fn open_output_stream(&self, append: bool) -> Result<OutputStream>;

    fn open_input_stream(&self) -> Result<InputStream>;

    /// True when directories are only path prefixes and need not be looked up
    fn directories_are_synthetic(&self) -> bool {
        false
    }
}

/// A file handle over one of the supported backends
#[derive(Debug, Clone)]
pub enum SafeFile {
    /// Shared-media catalog
    Media(MediaFile),
    /// Plain host filesystem
    Raw(RawFile),
    /// Opaque URI-backed file
    Generic(GenericFile),
}

macro_rules! dispatch {
    ($self:ident, $file:ident => $call:expr) => {
        match $self {
            SafeFile::Media($file) => $call,
            SafeFile::Raw($file) => $call,
            SafeFile::Generic($file) => $call,
        }
    };
}

impl SafeFile {
    /// Walk `path` segment by segment from this directory.
    ///
    /// Each segment is created when `create_missing` is set or when the
    /// backend's directories are synthetic; otherwise it must already exist
    /// as a directory.
    pub fn goto_directory(&self, path: &str, create_missing: bool) -> Result<SafeFile> {
        let create = create_missing || self.directories_are_synthetic();
        segments(path).try_fold(self.clone(), |current, segment| {
            if create {
                return current.create_directory(segment);
            }
            let next = current.find_file(segment, false)?;
            if next.is_directory() {
                Ok(next)
            } else {
                Err(FileError::NotFound(format!("{segment} is not a directory in {current}")))
            }
        })
    }

    pub fn as_media(&self) -> Option<&MediaFile> {
        match self {
            SafeFile::Media(file) => Some(file),
            _ => None,
        }
    }
}

impl FileHandle for SafeFile {
    fn create_file(&self, display_name: &str) -> Result<SafeFile> {
        dispatch!(self, f => f.create_file(display_name))
    }

    fn create_directory(&self, name: &str) -> Result<SafeFile> {
        dispatch!(self, f => f.create_directory(name))
    }

    fn uri(&self) -> Result<Uri> {
        dispatch!(self, f => f.uri())
    }

    fn name(&self) -> Result<String> {
        dispatch!(self, f => f.name())
    }

    fn file_type(&self) -> Result<String> {
        dispatch!(self, f => f.file_type())
    }

    fn file_path(&self) -> Result<String> {
        dispatch!(self, f => f.file_path())
    }

    fn is_directory(&self) -> bool {
        dispatch!(self, f => f.is_directory())
    }

    fn is_file(&self) -> bool {
        dispatch!(self, f => f.is_file())
    }

    fn last_modified(&self) -> Result<i64> {
        dispatch!(self, f => f.last_modified())
    }

    fn length(&self) -> Result<u64> {
        dispatch!(self, f => f.length())
    }

    fn can_read(&self) -> Result<bool> {
        dispatch!(self, f => f.can_read())
    }

    fn can_write(&self) -> Result<bool> {
        dispatch!(self, f => f.can_write())
    }

    fn delete(&self) -> Result<()> {
        dispatch!(self, f => f.delete())
    }

    fn exists(&self) -> Result<bool> {
        dispatch!(self, f => f.exists())
    }

    fn list_files(&self) -> Result<Vec<SafeFile>> {
        dispatch!(self, f => f.list_files())
    }

    fn find_file(&self, display_name: &str, ignore_case: bool) -> Result<SafeFile> {
        dispatch!(self, f => f.find_file(display_name, ignore_case))
    }

    fn rename_to(&self, name: &str) -> Result<SafeFile> {
        dispatch!(self, f => f.rename_to(name))
    }

    fn open_output_stream(&self, append: bool) -> Result<OutputStream> {
        dispatch!(self, f => f.open_output_stream(append))
    }

    fn open_input_stream(&self) -> Result<InputStream> {
        dispatch!(self, f => f.open_input_stream())
    }

    fn directories_are_synthetic(&self) -> bool {
        dispatch!(self, f => f.directories_are_synthetic())
    }
}

impl fmt::Display for SafeFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, file => fmt::Display::fmt(file, f))
    }
}
