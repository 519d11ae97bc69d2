//! Uniform file handles over host paths, the shared-media catalog and opaque
//! document URIs.
//!
//! [`vfs::HandleFactory`] picks the backend for a path or URI once and hands
//! back a [`vfs::SafeFile`]. Every handle speaks [`vfs::FileHandle`]; errors
//! are [`error::FileError`], and `.quietly()` from [`error::Quietly`] turns any
//! result into an `Option` when the caller only cares about success.

pub mod catalog;
pub mod config;
pub mod error;
pub mod generic;
pub mod media;
pub mod raw;
pub mod shell;
pub mod uri;
pub mod vfs;

pub use config::StorageConfig;
pub use error::{ErrorKind, FileError, Quietly, Result};
pub use uri::Uri;
pub use vfs::{FileHandle, HandleFactory, SafeFile};
