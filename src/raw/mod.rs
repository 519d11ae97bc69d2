//! Handles over plain host paths.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{FileError, Result};
use crate::uri::Uri;
use crate::vfs::handle::{FileHandle, SafeFile};
use crate::vfs::mime::extension_to_mime;
use crate::vfs::path::split_stem_extension;
use crate::vfs::stream::{InputStream, OutputStream};

const FALLBACK_MIME: &str = "application/octet-stream";

/// A path on the host filesystem. Every call goes to the filesystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFile {
    path: PathBuf,
}

impl RawFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn metadata(&self) -> Result<fs::Metadata> {
        fs::metadata(&self.path).map_err(|e| FileError::from_io(self.context("stat"), e))
    }

    fn context(&self, operation: &str) -> String {
        format!("{operation} {}", self.path.display())
    }

    fn child(&self, name: &str, operation: &str) -> Result<PathBuf> {
        if name.trim().is_empty() {
            return Err(FileError::InvalidArgument(format!(
                "{operation} requires a non-blank name"
            )));
        }
        if !self.path.is_dir() {
            return Err(FileError::InvalidArgument(format!(
                "{operation} requires a directory, {} is not one",
                self.path.display()
            )));
        }
        Ok(self.path.join(name))
    }
}

impl FileHandle for RawFile {
    fn create_file(&self, display_name: &str) -> Result<SafeFile> {
        let path = self.child(display_name, "create_file")?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| FileError::from_io(format!("create {}", path.display()), e))?;
        Ok(SafeFile::Raw(RawFile::new(path)))
    }

    fn create_directory(&self, name: &str) -> Result<SafeFile> {
        let path = self.child(name, "create_directory")?;
        fs::create_dir_all(&path)
            .map_err(|e| FileError::from_io(format!("mkdir {}", path.display()), e))?;
        Ok(SafeFile::Raw(RawFile::new(path)))
    }

    fn uri(&self) -> Result<Uri> {
        Uri::from_path(&self.path)
    }

    fn name(&self) -> Result<String> {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| FileError::InvalidArgument(format!("{} has no name", self.path.display())))
    }

    fn file_type(&self) -> Result<String> {
        let name = self.name()?;
        let (_, extension) = split_stem_extension(&name);
        Ok(extension_to_mime(extension).unwrap_or(FALLBACK_MIME).to_string())
    }

    fn file_path(&self) -> Result<String> {
        Ok(self.path.display().to_string())
    }

    fn is_directory(&self) -> bool {
        self.path.is_dir()
    }

    fn is_file(&self) -> bool {
        self.path.is_file()
    }

    fn last_modified(&self) -> Result<i64> {
        let modified = self
            .metadata()?
            .modified()
            .map_err(|e| FileError::io(self.context("mtime of"), e))?;
        Ok(DateTime::<Utc>::from(modified).timestamp())
    }

    fn length(&self) -> Result<u64> {
        Ok(self.metadata()?.len())
    }

    fn can_read(&self) -> Result<bool> {
        if self.path.is_dir() {
            return Ok(fs::read_dir(&self.path).is_ok());
        }
        Ok(fs::File::open(&self.path).is_ok())
    }

    fn can_write(&self) -> Result<bool> {
        Ok(!self.metadata()?.permissions().readonly())
    }

    fn delete(&self) -> Result<()> {
        let removed = if self.path.is_dir() {
            fs::remove_dir_all(&self.path)
        } else {
            fs::remove_file(&self.path)
        };
        removed.map_err(|e| FileError::from_io(self.context("delete"), e))
    }

    fn exists(&self) -> Result<bool> {
        self.path
            .try_exists()
            .map_err(|e| FileError::io(self.context("probe"), e))
    }

    fn list_files(&self) -> Result<Vec<SafeFile>> {
        let mut paths = fs::read_dir(&self.path)
            .map_err(|e| FileError::from_io(self.context("list"), e))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()
            .map_err(|e| FileError::io(self.context("list"), e))?;
        paths.sort();
        Ok(paths.into_iter().map(|p| SafeFile::Raw(RawFile::new(p))).collect())
    }

    fn find_file(&self, display_name: &str, ignore_case: bool) -> Result<SafeFile> {
        let exact = self.child(display_name, "find_file")?;
        if exact.exists() {
            return Ok(SafeFile::Raw(RawFile::new(exact)));
        }

        if ignore_case {
            let wanted = display_name.to_lowercase();
            for entry in self.list_files()? {
                if entry.name()?.to_lowercase() == wanted {
                    return Ok(entry);
                }
            }
        }
        Err(FileError::NotFound(format!(
            "{display_name} in {}",
            self.path.display()
        )))
    }

    fn rename_to(&self, name: &str) -> Result<SafeFile> {
        if name.trim().is_empty() {
            return Err(FileError::InvalidArgument("rename_to requires a non-blank name".into()));
        }
        let target = match self.path.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        };
        fs::rename(&self.path, &target).map_err(|e| {
            FileError::from_io(format!("rename {} to {}", self.path.display(), target.display()), e)
        })?;
        Ok(SafeFile::Raw(RawFile::new(target)))
    }

    fn open_output_stream(&self, append: bool) -> Result<OutputStream> {
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options
            .open(&self.path)
            .map_err(|e| FileError::from_io(self.context("open for writing"), e))?;
        Ok(Box::new(file))
    }

    fn open_input_stream(&self) -> Result<InputStream> {
        let file = fs::File::open(&self.path)
            .map_err(|e| FileError::from_io(self.context("open for reading"), e))?;
        Ok(Box::new(file))
    }
}

impl fmt::Display for RawFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
