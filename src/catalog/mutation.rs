use super::{CatalogError, Column, ContentValues, MediaCatalog};
use crate::catalog::query::CatalogQuery;
use crate::error::{FileError, Result};
use crate::media::ContentType;
use crate::uri::Uri;
use crate::vfs::path::{SEPARATOR, split_stem_mime};

/// Inserts and deletes against one catalog collection
pub struct CatalogMutation<'a> {
    catalog: &'a dyn MediaCatalog,
    collection: &'a Uri,
    content_type: ContentType,
}

impl<'a> CatalogMutation<'a> {
    pub fn new(catalog: &'a dyn MediaCatalog, collection: &'a Uri, content_type: ContentType) -> Self {
        Self {
            catalog,
            collection,
            content_type,
        }
    }

    /// MIME values tried in order when inserting: the exact type, the type
    /// coerced under the category prefix, then no MIME at all.
    pub fn mime_candidates(content_type: ContentType, mime: Option<&str>) -> Vec<Option<String>> {
        let Some(mime) = mime else {
            return vec![None];
        };

        let mut candidates: Vec<Option<String>> = Vec::with_capacity(3);
        for candidate in [
            Some(mime.to_string()),
            Some(content_type.coerce_mime(mime)),
            None,
        ] {
            if !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
        candidates
    }

    /// Create a row for `display_name` filed under `relative_path`.
    ///
    /// A relative path without a separator is the category root; the
    /// relative-path column is left unset so the catalog files the row there.
    pub fn insert(&self, relative_path: &str, display_name: &str) -> Result<Uri> {
        let (stem, mime) = split_stem_mime(display_name);

        let mut values = ContentValues::new();
        values.put_text(Column::DisplayName, display_name);
        values.put_text(Column::Title, stem);
        if relative_path.contains(SEPARATOR) {
            values.put_text(
                Column::RelativePath,
                CatalogQuery::relative_path_column(relative_path),
            );
        }

        for candidate in Self::mime_candidates(self.content_type, mime) {
            match &candidate {
                Some(m) => values.put_text(Column::MimeType, m.as_str()),
                None => values.remove(Column::MimeType),
            }

            match self.catalog.insert(self.collection, &values) {
                Ok(Some(uri)) => {
                    log::debug!(
                        "created {uri} for {relative_path}/{display_name} with mime {candidate:?}"
                    );
                    return Ok(uri);
                }
                Ok(None) => {
                    log::debug!("catalog declined {display_name} with mime {candidate:?}");
                }
                Err(CatalogError::IllegalArgument(reason)) => {
                    log::debug!("catalog rejected {display_name} with mime {candidate:?}: {reason}");
                }
                Err(err) => {
                    return Err(err.into_file_error(&format!("insert {display_name} into {}", self.collection)));
                }
            }
        }

        Err(FileError::NoAcceptableMime(display_name.to_string()))
    }

    /// Delete the row at `row`. True iff at least one row was removed.
    pub fn delete(&self, row: &Uri) -> Result<bool> {
        let removed = self
            .catalog
            .delete(row)
            .map_err(|e| e.into_file_error(&format!("delete {row}")))?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{MemoryCatalog, Selection};
    use crate::error::ErrorKind;
    use crate::media::{AddressingScheme, Volume};

    fn collection(content_type: ContentType) -> Uri {
        content_type
            .collection_uri(Volume::External, AddressingScheme::VolumeKeyed)
            .unwrap()
    }

    #[test]
    fn test_mime_candidates_dedup_in_order() {
        assert_eq!(
            CatalogMutation::mime_candidates(ContentType::Audio, Some("application/ogg")),
            vec![Some("application/ogg".into()), Some("audio/ogg".into()), None]
        );
        assert_eq!(
            CatalogMutation::mime_candidates(ContentType::Downloads, Some("text/plain")),
            vec![Some("text/plain".into()), None]
        );
        assert_eq!(CatalogMutation::mime_candidates(ContentType::Images, None), vec![None]);
    }

    #[test]
    fn test_insert_at_root_omits_relative_path() {
        let catalog = MemoryCatalog::new();
        let uri = collection(ContentType::Downloads);
        let mutation = CatalogMutation::new(&catalog, &uri, ContentType::Downloads);

        let row = mutation.insert("Download", "HelloWorld.txt").unwrap();
        let rows = catalog
            .query(
                &uri,
                &[Column::Id, Column::RelativePath, Column::MimeType, Column::Title],
                &Selection::new().where_eq(Column::DisplayName, "HelloWorld.txt"),
            )
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_i64(Column::Id), row.parse_id().map(|id| id as i64));
        // the catalog files it at the collection's default directory
        assert_eq!(rows[0].get_text(Column::RelativePath), Some("Download/"));
        assert_eq!(rows[0].get_text(Column::MimeType), Some("text/plain"));
        assert_eq!(rows[0].get_text(Column::Title), Some("HelloWorld"));
    }

    #[test]
    fn test_insert_falls_back_to_coerced_mime() {
        let catalog = MemoryCatalog::new();
        let uri = collection(ContentType::Audio);
        let mutation = CatalogMutation::new(&catalog, &uri, ContentType::Audio);

        // text/plain is refused by the audio collection
        mutation.insert("Music/podcasts", "notes.txt").unwrap();
        let rows = catalog
            .query(
                &uri,
                &[Column::MimeType],
                &Selection::new().where_eq(Column::DisplayName, "notes.txt"),
            )
            .unwrap();
        assert_eq!(rows[0].get_text(Column::MimeType), Some("audio/plain"));
    }

    #[test]
    fn test_insert_falls_back_to_no_mime() {
        let catalog = MemoryCatalog::new();
        let uri = collection(ContentType::Audio);
        catalog.reject_mime("audio/mp4");
        let mutation = CatalogMutation::new(&catalog, &uri, ContentType::Audio);

        mutation.insert("Music/podcasts", "track.m4a").unwrap();
        let rows = catalog
            .query(
                &uri,
                &[Column::MimeType],
                &Selection::new().where_eq(Column::DisplayName, "track.m4a"),
            )
            .unwrap();
        assert_eq!(rows[0].get_text(Column::MimeType), None);
    }

    #[test]
    fn test_insert_coerces_foreign_mime() {
        let catalog = MemoryCatalog::new();
        let uri = collection(ContentType::Video);
        let mutation = CatalogMutation::new(&catalog, &uri, ContentType::Video);

        // application/json is refused by the video collection
        mutation.insert("Movies/meta", "info.json").unwrap();
        let rows = catalog
            .query(
                &uri,
                &[Column::MimeType, Column::RelativePath],
                &Selection::new().where_eq(Column::DisplayName, "info.json"),
            )
            .unwrap();
        assert_eq!(rows[0].get_text(Column::MimeType), Some("video/json"));
        assert_eq!(rows[0].get_text(Column::RelativePath), Some("Movies/meta/"));
    }

    #[test]
    fn test_insert_exhausts_candidates() {
        let catalog = MemoryCatalog::new();
        let uri = collection(ContentType::Downloads);
        catalog.reject_mime("text/plain");
        catalog.reject_missing_mime();
        let mutation = CatalogMutation::new(&catalog, &uri, ContentType::Downloads);

        let err = mutation.insert("Download", "a.txt").unwrap_err();
        assert!(matches!(err, FileError::NoAcceptableMime(ref name) if name == "a.txt"));
    }

    #[test]
    fn test_insert_aborts_on_other_failures() {
        let catalog = MemoryCatalog::new();
        let uri = collection(ContentType::Images);
        catalog.deny_inserts();
        let mutation = CatalogMutation::new(&catalog, &uri, ContentType::Images);

        let err = mutation.insert("Pictures", "cat.png").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_delete_reports_removal() {
        let catalog = MemoryCatalog::new();
        let uri = collection(ContentType::Downloads);
        let mutation = CatalogMutation::new(&catalog, &uri, ContentType::Downloads);
        let row = mutation.insert("Download", "gone.txt").unwrap();

        assert!(mutation.delete(&row).unwrap());
        assert!(!mutation.delete(&row).unwrap());
    }
}
