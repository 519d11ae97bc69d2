//! Directory emulation over the shared-media catalog.

pub mod content_type;
pub mod file;

pub use content_type::{AddressingScheme, ContentType, Volume};
pub use file::MediaFile;
