use std::path::PathBuf;

use crate::media::{AddressingScheme, Volume};

/// First platform API level with volume-keyed catalog addressing and the
/// relative-path column
pub const MODERN_CATALOG_API_LEVEL: u32 = 29;

/// Host platform defaults consulted when resolving handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Root of shared external storage, e.g. `/storage/emulated/0`
    pub external_storage_root: PathBuf,
    /// Platform API level of the host
    pub api_level: u32,
    /// Volume used for catalog handles resolved from paths
    pub volume: Volume,
}

impl StorageConfig {
    pub fn new(external_storage_root: impl Into<PathBuf>) -> Self {
        Self {
            external_storage_root: external_storage_root.into(),
            ..Self::default()
        }
    }

    pub fn with_api_level(mut self, api_level: u32) -> Self {
        self.api_level = api_level;
        self
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volume = volume;
        self
    }

    /// Whether the catalog backend can be used at all on this host
    pub fn supports_catalog(&self) -> bool {
        self.api_level >= MODERN_CATALOG_API_LEVEL
    }

    /// Catalog addressing scheme for this platform version
    pub fn addressing(&self) -> AddressingScheme {
        AddressingScheme::for_api_level(self.api_level)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            external_storage_root: PathBuf::from("/storage/emulated/0"),
            api_level: 33,
            volume: Volume::External,
        }
    }
}
