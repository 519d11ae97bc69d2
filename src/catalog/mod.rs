//! The shared-media catalog boundary.
//!
//! The catalog is a flat relational store with one table per collection. It
//! is queried with equality conjunctions over its columns, accepts inserts
//! as column/value maps, deletes rows by address, and opens byte streams on
//! row addresses. Nothing here knows about directories.

pub mod memory;
pub mod mutation;
pub mod query;

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::error::FileError;
use crate::uri::Uri;
use crate::vfs::stream::{InputStream, OutputStream, WriteMode};

pub use memory::MemoryCatalog;
pub use mutation::CatalogMutation;
pub use query::{CatalogQuery, QueryResult};

/// Columns of every catalog table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Id,
    DisplayName,
    Title,
    MimeType,
    RelativePath,
    Size,
    DateModified,
    IsPending,
}

impl Column {
    pub fn name(self) -> &'static str {
        match self {
            Column::Id => "_id",
            Column::DisplayName => "_display_name",
            Column::Title => "title",
            Column::MimeType => "mime_type",
            Column::RelativePath => "relative_path",
            Column::Size => "_size",
            Column::DateModified => "date_modified",
            Column::IsPending => "is_pending",
        }
    }
}

/// A single cell value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    Integer(i64),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Integer(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            Value::Text(s) => s.parse().ok(),
        }
    }
}

/// Column/value map handed to `insert`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentValues {
    values: BTreeMap<Column, Value>,
}

impl ContentValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_text(&mut self, column: Column, value: impl Into<String>) {
        self.values.insert(column, Value::Text(value.into()));
    }

    pub fn put_integer(&mut self, column: Column, value: i64) {
        self.values.insert(column, Value::Integer(value));
    }

    pub fn remove(&mut self, column: Column) {
        self.values.remove(&column);
    }

    pub fn get(&self, column: Column) -> Option<&Value> {
        self.values.get(&column)
    }

    pub fn get_text(&self, column: Column) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Column, &Value)> {
        self.values.iter().map(|(c, v)| (*c, v))
    }
}

/// Equality conjunction over columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    clauses: Vec<(Column, String)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, column: Column, value: impl Into<String>) -> Self {
        self.clauses.push((column, value.into()));
        self
    }

    pub fn clauses(&self) -> &[(Column, String)] {
        &self.clauses
    }

    /// Parameterized `where` clause, e.g. `relative_path=? AND _display_name=?`
    pub fn where_clause(&self) -> String {
        self.clauses
            .iter()
            .map(|(column, _)| format!("{}=?", column.name()))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    /// Arguments bound to the placeholders of [`Selection::where_clause`]
    pub fn args(&self) -> Vec<&str> {
        self.clauses.iter().map(|(_, v)| v.as_str()).collect()
    }

    /// Whether a row satisfies every clause
    pub fn matches(&self, row: &Row) -> bool {
        self.clauses
            .iter()
            .all(|(column, expected)| row.get_text(*column) == Some(expected.as_str()))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .clauses
            .iter()
            .map(|(column, value)| format!("{}='{}'", column.name(), value.replace('\'', "''")))
            .collect::<Vec<_>>()
            .join(" AND ");
        f.write_str(&rendered)
    }
}

/// One row of a query result, restricted to the projected columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: BTreeMap<Column, Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, column: Column, value: Value) -> Self {
        self.cells.insert(column, value);
        self
    }

    pub fn get(&self, column: Column) -> Option<&Value> {
        self.cells.get(&column)
    }

    pub fn get_text(&self, column: Column) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    pub fn get_i64(&self, column: Column) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    /// Keep only `projection` columns
    pub fn project(&self, projection: &[Column]) -> Row {
        let cells = self
            .cells
            .iter()
            .filter(|(column, _)| projection.contains(column))
            .map(|(column, value)| (*column, value.clone()))
            .collect();
        Row { cells }
    }
}

/// Low-level descriptor opened on a row address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDescriptor {
    stat_size: Option<u64>,
}

impl FileDescriptor {
    pub fn new(stat_size: Option<u64>) -> Self {
        Self { stat_size }
    }

    /// Real byte size, `None` when the descriptor is not backed by a sized file
    pub fn stat_size(&self) -> Option<u64> {
        self.stat_size
    }
}

/// Failures reported by a catalog backend
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no catalog row for {0}")]
    NotFound(String),

    /// Malformed arguments, e.g. a MIME type the collection refuses
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("unsupported by catalog: {0}")]
    Unsupported(String),

    #[error("catalog i/o failure: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Re-signal at the adapter boundary, logging the cause first
    pub(crate) fn into_file_error(self, context: &str) -> FileError {
        log::debug!("{context}: {self}");
        match self {
            CatalogError::NotFound(what) => FileError::NotFound(format!("{context}: {what}")),
            CatalogError::IllegalArgument(msg) => {
                FileError::BackendRejected(format!("{context}: {msg}"))
            }
            CatalogError::PermissionDenied(msg) => FileError::io(
                context,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, msg),
            ),
            CatalogError::Unsupported(msg) => {
                FileError::Unsupported(format!("{context}: {msg}"))
            }
            CatalogError::Io(err) => FileError::from_io(context, err),
        }
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Capability interface of the host media catalog (a content resolver).
///
/// Implementations are synchronous and may block; they apply the host's own
/// timeouts. Every call is expected to reflect the current state of the
/// store, so callers never cache results.
pub trait MediaCatalog: Send + Sync + fmt::Debug {
    /// Rows of `collection` matching `selection`, restricted to `projection`
    fn query(
        &self,
        collection: &Uri,
        projection: &[Column],
        selection: &Selection,
    ) -> CatalogResult<Vec<Row>>;

    /// Insert a row. `Ok(None)` means the catalog declined without an error.
    fn insert(&self, collection: &Uri, values: &ContentValues) -> CatalogResult<Option<Uri>>;

    /// Delete the row at `row`, returning the number of removed rows
    fn delete(&self, row: &Uri) -> CatalogResult<usize>;

    /// Open a read descriptor on `row`
    fn open_file_descriptor(&self, row: &Uri) -> CatalogResult<FileDescriptor>;

    fn open_input_stream(&self, row: &Uri) -> CatalogResult<InputStream>;

    fn open_output_stream(&self, row: &Uri, mode: WriteMode) -> CatalogResult<OutputStream>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_rendering() {
        let selection = Selection::new()
            .where_eq(Column::RelativePath, "Download/")
            .where_eq(Column::DisplayName, "it's.txt");
        assert_eq!(selection.where_clause(), "relative_path=? AND _display_name=?");
        assert_eq!(selection.args(), vec!["Download/", "it's.txt"]);
        assert_eq!(
            selection.to_string(),
            "relative_path='Download/' AND _display_name='it''s.txt'"
        );
    }

    #[test]
    fn test_selection_matches_exactly() {
        let row = Row::new()
            .with(Column::RelativePath, Value::Text("Download/sub/".into()))
            .with(Column::DisplayName, Value::Text("a.txt".into()));

        assert!(Selection::new().where_eq(Column::RelativePath, "Download/sub/").matches(&row));
        assert!(!Selection::new().where_eq(Column::RelativePath, "Download/").matches(&row));
        assert!(!Selection::new().where_eq(Column::DisplayName, "A.txt").matches(&row));
    }

    #[test]
    fn test_row_projection() {
        let row = Row::new()
            .with(Column::Id, Value::Integer(1))
            .with(Column::Size, Value::Integer(13))
            .with(Column::DisplayName, Value::Text("a".into()));
        let projected = row.project(&[Column::Id, Column::Size]);
        assert_eq!(projected.get_i64(Column::Id), Some(1));
        assert_eq!(projected.get_i64(Column::Size), Some(13));
        assert_eq!(projected.get(Column::DisplayName), None);
    }

    #[test]
    fn test_catalog_error_mapping() {
        let err = CatalogError::IllegalArgument("bad mime".into()).into_file_error("insert a.txt");
        assert_eq!(err.kind(), crate::error::ErrorKind::BackendRejected);

        let err = CatalogError::NotFound("row 9".into()).into_file_error("open");
        assert!(err.is_not_found());
    }
}
