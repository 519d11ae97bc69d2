use std::path::{Path, PathBuf};

use crate::config::MODERN_CATALOG_API_LEVEL;
use crate::error::Result;
use crate::uri::Uri;
use crate::vfs::path::{SEPARATOR, collapse_separators};

const CATALOG_AUTHORITY: &str = "content://media";

/// The four fixed media collections every catalog entry belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Downloads,
    Audio,
    Video,
    Images,
}

/// Storage partition selector used when addressing the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Volume {
    Internal,
    External,
}

/// How collection addresses are built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingScheme {
    /// Fixed per-volume constants (`content://media/external/...`)
    Legacy,
    /// Volume-keyed factory (`content://media/external_primary/...`)
    VolumeKeyed,
}

impl AddressingScheme {
    pub fn for_api_level(api_level: u32) -> Self {
        if api_level >= MODERN_CATALOG_API_LEVEL {
            AddressingScheme::VolumeKeyed
        } else {
            AddressingScheme::Legacy
        }
    }
}

impl Volume {
    /// Volume name as it appears in a collection address
    pub fn name(self, scheme: AddressingScheme) -> &'static str {
        match (self, scheme) {
            (Volume::Internal, _) => "internal",
            (Volume::External, AddressingScheme::Legacy) => "external",
            (Volume::External, AddressingScheme::VolumeKeyed) => "external_primary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "internal" => Some(Volume::Internal),
            "external" | "external_primary" => Some(Volume::External),
            _ => None,
        }
    }
}

impl ContentType {
    pub const ALL: [ContentType; 4] = [
        ContentType::Downloads,
        ContentType::Audio,
        ContentType::Video,
        ContentType::Images,
    ];

    /// Catalog-root path segment, also the relative-path prefix of every row
    pub fn path(self) -> &'static str {
        match self {
            ContentType::Downloads => "Download",
            ContentType::Audio => "Music",
            ContentType::Video => "Movies",
            ContentType::Images => "Pictures",
        }
    }

    /// Collection segment of the catalog address
    fn collection(self) -> &'static str {
        match self {
            ContentType::Downloads => "downloads",
            ContentType::Audio => "audio/media",
            ContentType::Video => "video/media",
            ContentType::Images => "images/media",
        }
    }

    /// Top-level MIME prefix rows of this category must carry.
    /// Downloads accepts any type.
    pub fn mime_prefix(self) -> Option<&'static str> {
        match self {
            ContentType::Downloads => None,
            ContentType::Audio => Some("audio/"),
            ContentType::Video => Some("video/"),
            ContentType::Images => Some("image/"),
        }
    }

    /// Force `mime` under this category's prefix, keeping its subtype
    pub fn coerce_mime(self, mime: &str) -> String {
        match self.mime_prefix() {
            None => mime.to_string(),
            Some(prefix) => {
                let subtype = mime.split_once('/').map(|(_, sub)| sub).unwrap_or(mime);
                format!("{prefix}{subtype}")
            }
        }
    }

    /// Whether `mime` is acceptable for rows of this category
    pub fn accepts_mime(self, mime: &str) -> bool {
        self.mime_prefix().is_none_or(|prefix| mime.starts_with(prefix))
    }

    /// Catalog collection address on `volume`
    pub fn collection_uri(self, volume: Volume, scheme: AddressingScheme) -> Result<Uri> {
        Uri::parse(&format!(
            "{CATALOG_AUTHORITY}/{}/{}",
            volume.name(scheme),
            self.collection()
        ))
    }

    /// Category and volume addressed by a collection or row URI
    pub fn from_collection_uri(uri: &Uri) -> Option<(ContentType, Volume)> {
        let rest = uri
            .collection()
            .as_str()
            .strip_prefix(CATALOG_AUTHORITY)?
            .trim_start_matches(SEPARATOR)
            .to_string();
        let (volume, collection) = rest.split_once(SEPARATOR)?;
        let volume = Volume::from_name(volume)?;
        let content_type = ContentType::ALL
            .into_iter()
            .find(|ct| ct.collection() == collection)?;
        Some((content_type, volume))
    }

    /// Host path of the category directory under `storage_root`
    pub fn absolute_path(self, storage_root: &Path) -> PathBuf {
        let joined = format!("{}{SEPARATOR}{}", storage_root.display(), self.path());
        PathBuf::from(collapse_separators(&joined))
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ContentType::Downloads => "downloads",
            ContentType::Audio => "audio",
            ContentType::Video => "video",
            ContentType::Images => "images",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_uris() {
        assert_eq!(
            ContentType::Downloads
                .collection_uri(Volume::External, AddressingScheme::VolumeKeyed)
                .unwrap()
                .as_str(),
            "content://media/external_primary/downloads"
        );
        assert_eq!(
            ContentType::Audio
                .collection_uri(Volume::External, AddressingScheme::Legacy)
                .unwrap()
                .as_str(),
            "content://media/external/audio/media"
        );
        assert_eq!(
            ContentType::Images
                .collection_uri(Volume::Internal, AddressingScheme::VolumeKeyed)
                .unwrap()
                .as_str(),
            "content://media/internal/images/media"
        );
    }

    #[test]
    fn test_from_collection_uri_round_trips_rows() {
        let row = ContentType::Video
            .collection_uri(Volume::External, AddressingScheme::VolumeKeyed)
            .unwrap()
            .with_appended_id(7);
        assert_eq!(
            ContentType::from_collection_uri(&row),
            Some((ContentType::Video, Volume::External))
        );
        assert_eq!(ContentType::from_collection_uri(&Uri::parse("file:///a").unwrap()), None);
    }

    #[test]
    fn test_mime_coercion() {
        assert_eq!(ContentType::Audio.coerce_mime("application/ogg"), "audio/ogg");
        assert_eq!(ContentType::Images.coerce_mime("image/png"), "image/png");
        assert_eq!(ContentType::Downloads.coerce_mime("text/plain"), "text/plain");
        assert!(ContentType::Downloads.accepts_mime("anything/at-all"));
        assert!(!ContentType::Video.accepts_mime("audio/mpeg"));
    }

    #[test]
    fn test_absolute_path() {
        assert_eq!(
            ContentType::Downloads.absolute_path(Path::new("/storage/emulated/0/")),
            PathBuf::from("/storage/emulated/0/Download")
        );
    }
}
