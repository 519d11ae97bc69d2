use super::{Column, MediaCatalog, Selection};
use crate::error::{FileError, Result};
use crate::uri::Uri;
use crate::vfs::path::SEPARATOR;

/// Row metadata for one `(relative path, display name)` coordinate.
/// Consumed immediately by the caller and never cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult {
    /// Address of the matched row
    pub uri: Uri,
    /// Catalog-reported modification time, epoch seconds
    pub last_modified: i64,
    /// Catalog-reported size. Zero or negative for pending and virtual rows.
    pub reported_length: i64,
}

/// Read queries against one catalog collection
pub struct CatalogQuery<'a> {
    catalog: &'a dyn MediaCatalog,
    collection: &'a Uri,
}

impl<'a> CatalogQuery<'a> {
    pub fn new(catalog: &'a dyn MediaCatalog, collection: &'a Uri) -> Self {
        Self {
            catalog,
            collection,
        }
    }

    /// Value of the relative-path column for a canonical relative path
    pub fn relative_path_column(relative_path: &str) -> String {
        format!("{relative_path}{SEPARATOR}")
    }

    /// Look up the row filed under `relative_path` with `display_name`
    pub fn find(&self, relative_path: &str, display_name: &str) -> Result<QueryResult> {
        let selection = Selection::new()
            .where_eq(Column::RelativePath, Self::relative_path_column(relative_path))
            .where_eq(Column::DisplayName, display_name);
        let projection = [Column::Id, Column::DateModified, Column::Size];

        let rows = self
            .catalog
            .query(self.collection, &projection, &selection)
            .map_err(|e| e.into_file_error(&format!("query {}", self.collection)))?;

        rows.iter()
            .find_map(|row| {
                let id = u64::try_from(row.get_i64(Column::Id)?).ok()?;
                Some(QueryResult {
                    uri: self.collection.with_appended_id(id),
                    last_modified: row.get_i64(Column::DateModified).unwrap_or(0),
                    reported_length: row.get_i64(Column::Size).unwrap_or(0),
                })
            })
            .ok_or_else(|| {
                FileError::NotFound(format!("no catalog row matches {selection} in {}", self.collection))
            })
    }

    /// Display names of every row filed directly under `relative_path`.
    /// Rows without a display name are skipped.
    pub fn list_display_names(&self, relative_path: &str) -> Result<Vec<String>> {
        let selection = Selection::new()
            .where_eq(Column::RelativePath, Self::relative_path_column(relative_path));

        let rows = self
            .catalog
            .query(self.collection, &[Column::DisplayName], &selection)
            .map_err(|e| e.into_file_error(&format!("list {}", self.collection)))?;

        Ok(rows
            .iter()
            .filter_map(|row| row.get_text(Column::DisplayName))
            .map(String::from)
            .collect())
    }
}
