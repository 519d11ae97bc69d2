use std::path::Path;
use std::sync::Arc;

use crate::catalog::MediaCatalog;
use crate::config::StorageConfig;
use crate::error::{FileError, Result};
use crate::generic::{GenericFile, UniversalFile, UniversalFileProvider};
use crate::media::{ContentType, MediaFile, Volume};
use crate::raw::RawFile;
use crate::uri::Uri;
use crate::vfs::handle::SafeFile;
use crate::vfs::path::{SEPARATOR, collapse_separators};

/// Resolves paths and URIs to the backend that owns them.
///
/// Paths under a category directory of shared storage go to the catalog,
/// everything else to the host filesystem. The choice is made once per
/// handle.
#[derive(Debug, Clone)]
pub struct HandleFactory {
    config: StorageConfig,
    catalog: Arc<dyn MediaCatalog>,
    provider: Option<Arc<dyn UniversalFileProvider>>,
}

impl HandleFactory {
    pub fn new(config: StorageConfig, catalog: Arc<dyn MediaCatalog>) -> Self {
        Self {
            config,
            catalog,
            provider: None,
        }
    }

    /// Route opaque URIs, assets and resources through `provider`
    pub fn with_provider(mut self, provider: Arc<dyn UniversalFileProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Arc<dyn MediaCatalog> {
        &self.catalog
    }

    /// Handle for an absolute host path or a bare category path
    /// (`Download/notes.txt`). A trailing separator addresses a directory.
    pub fn from_file(&self, path: &str) -> Result<SafeFile> {
        if path.trim().is_empty() {
            return Err(FileError::InvalidArgument("empty path".into()));
        }

        let path = collapse_separators(path);
        match self.classify(&path) {
            Some((content_type, rest)) => self.from_media(content_type, &rest),
            None => Ok(SafeFile::Raw(RawFile::new(path))),
        }
    }

    /// Handle for `path` below a category root on the configured volume
    pub fn from_media(&self, content_type: ContentType, path: &str) -> Result<SafeFile> {
        self.from_media_on(content_type, self.config.volume, path)
    }

    pub fn from_media_on(
        &self,
        content_type: ContentType,
        volume: Volume,
        path: &str,
    ) -> Result<SafeFile> {
        if !self.config.supports_catalog() {
            let root = content_type.absolute_path(&self.config.external_storage_root);
            let relative = path.trim_start_matches(SEPARATOR);
            log::debug!(
                "api level {} predates the catalog, using {} directly",
                self.config.api_level,
                root.display()
            );
            return Ok(SafeFile::Raw(RawFile::new(root.join(relative))));
        }

        let file = MediaFile::new(
            Arc::clone(&self.catalog),
            content_type,
            volume,
            self.config.addressing(),
            path,
        )?;
        Ok(SafeFile::Media(file))
    }

    /// `file://` URIs map to the host filesystem, everything else to the provider
    pub fn from_uri(&self, uri: &Uri) -> Result<SafeFile> {
        if let Some(path) = uri.to_file_path() {
            return Ok(SafeFile::Raw(RawFile::new(path)));
        }
        let file = self.provider()?.from_uri(uri)?;
        Ok(self.generic(file))
    }

    /// A file bundled with the host application
    pub fn from_asset(&self, name: &str) -> Result<SafeFile> {
        let file = self.provider()?.from_asset(name)?;
        Ok(self.generic(file))
    }

    /// A packaged resource by id
    pub fn from_resource(&self, id: u32) -> Result<SafeFile> {
        let file = self.provider()?.from_resource(id)?;
        Ok(self.generic(file))
    }

    /// Category owning `path` and the remainder below its root
    pub fn classify(&self, path: &str) -> Option<(ContentType, String)> {
        let root = &self.config.external_storage_root;
        ContentType::ALL.into_iter().find_map(|content_type| {
            let rest = strip_directory(path, &content_type.absolute_path(root))
                .or_else(|| strip_bare(path, content_type.path()))?;
            let rest = if rest.is_empty() { "/" } else { rest };
            Some((content_type, rest.to_string()))
        })
    }

    fn provider(&self) -> Result<&Arc<dyn UniversalFileProvider>> {
        self.provider
            .as_ref()
            .ok_or_else(|| FileError::Unsupported("no document provider configured".into()))
    }

    fn generic(&self, file: Arc<dyn UniversalFile>) -> SafeFile {
        SafeFile::Generic(GenericFile::new(file, Arc::clone(&self.catalog)))
    }
}

/// Remainder of `path` below `directory`, matching whole segments only
fn strip_directory<'a>(path: &'a str, directory: &Path) -> Option<&'a str> {
    let directory = directory.to_str()?;
    let rest = path.strip_prefix(directory.trim_end_matches(SEPARATOR))?;
    (rest.is_empty() || rest.starts_with(SEPARATOR)).then_some(rest)
}

fn strip_bare<'a>(path: &'a str, category: &str) -> Option<&'a str> {
    let rest = path.strip_prefix(category)?;
    (rest.is_empty() || rest.starts_with(SEPARATOR)).then_some(rest)
}
