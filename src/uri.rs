use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

use crate::error::{FileError, Result};

/// Opaque backend address, e.g. `content://media/external_primary/downloads/42`
/// or `file:///storage/emulated/0/notes.txt`.
///
/// Always hierarchical (`scheme://authority/path`), so row ids can be appended
/// as path segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Uri(Url);

impl Uri {
    pub fn parse(uri: &str) -> Result<Self> {
        let url = Url::parse(uri)
            .map_err(|e| FileError::InvalidArgument(format!("malformed uri {uri}: {e}")))?;
        if url.cannot_be_a_base() {
            return Err(FileError::InvalidArgument(format!(
                "{uri} is not a hierarchical uri"
            )));
        }
        Ok(Uri(url))
    }

    /// `file://` URI for an absolute host path, percent-encoded
    pub fn from_path(path: &Path) -> Result<Self> {
        Url::from_file_path(path).map(Uri).map_err(|()| {
            FileError::InvalidArgument(format!("{} is not an absolute path", path.display()))
        })
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn scheme(&self) -> &str {
        self.0.scheme()
    }

    /// Address a row inside a collection
    pub fn with_appended_id(&self, id: u64) -> Self {
        let mut url = self.0.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(&id.to_string());
        }
        Uri(url)
    }

    /// Trailing numeric segment, if the URI addresses a row
    pub fn parse_id(&self) -> Option<u64> {
        self.0.path_segments()?.next_back()?.parse().ok()
    }

    /// The URI with its trailing row id removed
    pub fn collection(&self) -> Self {
        let mut url = self.0.clone();
        if self.parse_id().is_some() {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop();
            }
        }
        Uri(url)
    }

    /// Decoded host path for `file://` URIs
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.scheme() != "file" {
            return None;
        }
        self.0.to_file_path().ok()
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}
