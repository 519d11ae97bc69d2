use bytes::{Bytes, BytesMut};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::{Cursor, Write};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use super::{
    CatalogError, CatalogResult, Column, ContentValues, FileDescriptor, MediaCatalog, Row,
    Selection, Value,
};
use crate::media::{ContentType, Volume};
use crate::uri::Uri;
use crate::vfs::path::{SEPARATOR, split_stem_extension};
use crate::vfs::stream::{InputStream, OutputStream, WriteMode};

/// A stored catalog row
#[derive(Debug, Clone)]
struct Record {
    display_name: Option<String>,
    title: Option<String>,
    mime_type: Option<String>,
    relative_path: String,
    content: Bytes,
    size: i64,
    date_modified: i64,
}

impl Record {
    fn to_row(&self, id: u64) -> Row {
        let mut row = Row::new()
            .with(Column::Id, Value::Integer(id as i64))
            .with(Column::RelativePath, Value::Text(self.relative_path.clone()))
            .with(Column::Size, Value::Integer(self.size))
            .with(Column::DateModified, Value::Integer(self.date_modified))
            .with(Column::IsPending, Value::Integer(0));
        if let Some(name) = &self.display_name {
            row = row.with(Column::DisplayName, Value::Text(name.clone()));
        }
        if let Some(title) = &self.title {
            row = row.with(Column::Title, Value::Text(title.clone()));
        }
        if let Some(mime) = &self.mime_type {
            row = row.with(Column::MimeType, Value::Text(mime.clone()));
        }
        row
    }
}

type TableKey = (ContentType, Volume);

#[derive(Debug, Default)]
struct State {
    tables: HashMap<TableKey, BTreeMap<u64, Record>>,
    next_id: u64,
    rejected_mimes: HashSet<String>,
    reject_missing_mime: bool,
    deny_inserts: bool,
    stale_sizes: bool,
    failing_descriptors: bool,
    read_only_rows: HashSet<(TableKey, u64)>,
}

/// In-process media catalog.
///
/// Behaves like the host catalog where this crate depends on it: one table per
/// collection (both addressing schemes reach the same table), collection MIME
/// policies, default relative paths, de-duplicated display names, and row
/// sizes that are only refreshed when a writer is flushed. Knobs reproduce the
/// quirks real catalogs show.
#[derive(Debug, Default, Clone)]
pub struct MemoryCatalog {
    state: Arc<RwLock<State>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always report a size of zero, as catalogs do for pending rows
    pub fn with_stale_sizes(self) -> Self {
        self.configure(|s| s.stale_sizes = true);
        self
    }

    /// Fail every `open_file_descriptor` call
    pub fn with_failing_descriptors(self) -> Self {
        self.configure(|s| s.failing_descriptors = true);
        self
    }

    /// Refuse inserts carrying this exact MIME type
    pub fn reject_mime(&self, mime: &str) {
        self.configure(|s| {
            s.rejected_mimes.insert(mime.to_string());
        });
    }

    /// Refuse inserts that carry no MIME type at all
    pub fn reject_missing_mime(&self) {
        self.configure(|s| s.reject_missing_mime = true);
    }

    /// Fail every insert with a permission error
    pub fn deny_inserts(&self) {
        self.configure(|s| s.deny_inserts = true);
    }

    /// Refuse writes to and deletes of `row`, as for a row another app owns
    pub fn make_read_only(&self, row: &Uri) -> CatalogResult<()> {
        let key = table_key(row)?;
        let id = row
            .parse_id()
            .ok_or_else(|| CatalogError::IllegalArgument(format!("{row} does not address a row")))?;
        self.configure(|s| {
            s.read_only_rows.insert((key, id));
        });
        Ok(())
    }

    fn configure(&self, apply: impl FnOnce(&mut State)) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        apply(&mut state);
    }

    fn lock(&self) -> CatalogResult<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| CatalogError::Io(std::io::Error::other("catalog lock poisoned")))
    }

    /// Insert a row directly, bypassing MIME policy, as if another app created it
    pub fn seed(
        &self,
        collection: &Uri,
        relative_path: &str,
        display_name: &str,
        content: &[u8],
    ) -> CatalogResult<Uri> {
        let key = table_key(collection)?;
        let (stem, _) = split_stem_extension(display_name);
        let record = Record {
            display_name: Some(display_name.to_string()),
            title: Some(stem.to_string()),
            mime_type: None,
            relative_path: relative_path.to_string(),
            content: Bytes::copy_from_slice(content),
            size: content.len() as i64,
            date_modified: now(),
        };
        let mut state = self.lock()?;
        let id = state.allocate_id();
        state.tables.entry(key).or_default().insert(id, record);
        Ok(collection.collection().with_appended_id(id))
    }

    /// Insert a row with no display name
    pub fn seed_unnamed(&self, collection: &Uri, relative_path: &str) -> CatalogResult<Uri> {
        let key = table_key(collection)?;
        let record = Record {
            display_name: None,
            title: None,
            mime_type: None,
            relative_path: relative_path.to_string(),
            content: Bytes::new(),
            size: 0,
            date_modified: now(),
        };
        let mut state = self.lock()?;
        let id = state.allocate_id();
        state.tables.entry(key).or_default().insert(id, record);
        Ok(collection.collection().with_appended_id(id))
    }

    /// Number of rows in the collection
    pub fn len(&self, collection: &Uri) -> usize {
        let Ok(key) = table_key(collection) else {
            return 0;
        };
        self.state
            .read()
            .ok()
            .and_then(|s| s.tables.get(&key).map(BTreeMap::len))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &Uri) -> bool {
        self.len(collection) == 0
    }

    fn commit(&self, key: TableKey, id: u64, content: Bytes) -> CatalogResult<()> {
        let mut state = self.lock()?;
        let stale = state.stale_sizes;
        let record = state
            .tables
            .get_mut(&key)
            .and_then(|t| t.get_mut(&id))
            .ok_or_else(|| CatalogError::NotFound(format!("row {id}")))?;
        if !stale {
            record.size = content.len() as i64;
        }
        record.content = content;
        record.date_modified = now();
        Ok(())
    }
}

impl State {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&self, row: &Uri) -> CatalogResult<(TableKey, u64, &Record)> {
        let key = table_key(row)?;
        let id = row
            .parse_id()
            .ok_or_else(|| CatalogError::IllegalArgument(format!("{row} does not address a row")))?;
        self.tables
            .get(&key)
            .and_then(|t| t.get(&id))
            .map(|r| (key, id, r))
            .ok_or_else(|| CatalogError::NotFound(row.to_string()))
    }

    /// Display name the catalog stores, de-duplicated as `name (n).ext`
    fn unique_display_name(&self, key: TableKey, relative_path: &str, name: &str) -> String {
        let taken = |candidate: &str| {
            self.tables.get(&key).is_some_and(|t| {
                t.values().any(|r| {
                    r.relative_path == relative_path && r.display_name.as_deref() == Some(candidate)
                })
            })
        };
        if !taken(name) {
            return name.to_string();
        }

        let (stem, ext) = split_stem_extension(name);
        (1..)
            .map(|n| match ext {
                Some(ext) => format!("{stem} ({n}).{ext}"),
                None => format!("{stem} ({n})"),
            })
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name.to_string())
    }
}

fn table_key(uri: &Uri) -> CatalogResult<TableKey> {
    ContentType::from_collection_uri(uri)
        .ok_or_else(|| CatalogError::Unsupported(format!("unknown collection {uri}")))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl MediaCatalog for MemoryCatalog {
    fn query(
        &self,
        collection: &Uri,
        projection: &[Column],
        selection: &Selection,
    ) -> CatalogResult<Vec<Row>> {
        let key = table_key(collection)?;
        let state = self.lock()?;
        let Some(table) = state.tables.get(&key) else {
            return Ok(Vec::new());
        };

        Ok(table
            .iter()
            .map(|(id, record)| record.to_row(*id))
            .filter(|row| selection.matches(row))
            .map(|row| row.project(projection))
            .collect())
    }

    fn insert(&self, collection: &Uri, values: &ContentValues) -> CatalogResult<Option<Uri>> {
        let key = table_key(collection)?;
        let (content_type, _) = key;
        let mut state = self.lock()?;

        if state.deny_inserts {
            return Err(CatalogError::PermissionDenied(format!(
                "caller may not insert into {collection}"
            )));
        }

        let mime_type = values.get_text(Column::MimeType).map(String::from);
        match &mime_type {
            Some(mime) if state.rejected_mimes.contains(mime) => {
                return Err(CatalogError::IllegalArgument(format!(
                    "MIME type {mime} cannot be inserted into {collection}"
                )));
            }
            Some(mime) if !content_type.accepts_mime(mime) => {
                return Err(CatalogError::IllegalArgument(format!(
                    "MIME type {mime} cannot be inserted into {collection}; expected MIME type under {}*",
                    content_type.mime_prefix().unwrap_or_default()
                )));
            }
            None if state.reject_missing_mime => {
                return Err(CatalogError::IllegalArgument(format!(
                    "MIME type required for {collection}"
                )));
            }
            _ => {}
        }

        let default_path = format!("{}{SEPARATOR}", content_type.path());
        let relative_path = values
            .get_text(Column::RelativePath)
            .map(String::from)
            .unwrap_or_else(|| default_path.clone());
        if !relative_path.starts_with(&default_path) {
            return Err(CatalogError::IllegalArgument(format!(
                "primary directory of {relative_path} not allowed for {collection}; allowed directory is {default_path}"
            )));
        }

        let Some(display_name) = values.get_text(Column::DisplayName) else {
            return Ok(None);
        };
        let display_name = state.unique_display_name(key, &relative_path, display_name);

        let record = Record {
            display_name: Some(display_name),
            title: values.get_text(Column::Title).map(String::from),
            mime_type,
            relative_path,
            content: Bytes::new(),
            size: 0,
            date_modified: now(),
        };
        let id = state.allocate_id();
        state.tables.entry(key).or_default().insert(id, record);
        Ok(Some(collection.collection().with_appended_id(id)))
    }

    fn delete(&self, row: &Uri) -> CatalogResult<usize> {
        let key = table_key(row)?;
        let Some(id) = row.parse_id() else {
            return Ok(0);
        };
        let mut state = self.lock()?;
        if state.read_only_rows.contains(&(key, id)) {
            return Err(CatalogError::PermissionDenied(format!("{row} is owned by another app")));
        }
        let removed = state
            .tables
            .get_mut(&key)
            .and_then(|t| t.remove(&id))
            .is_some();
        Ok(usize::from(removed))
    }

    fn open_file_descriptor(&self, row: &Uri) -> CatalogResult<FileDescriptor> {
        let state = self.lock()?;
        if state.failing_descriptors {
            return Err(CatalogError::Unsupported(format!("no descriptor for {row}")));
        }
        let (_, _, record) = state.record(row)?;
        Ok(FileDescriptor::new(Some(record.content.len() as u64)))
    }

    fn open_input_stream(&self, row: &Uri) -> CatalogResult<InputStream> {
        let state = self.lock()?;
        let (_, _, record) = state.record(row)?;
        Ok(Box::new(Cursor::new(record.content.clone())))
    }

    fn open_output_stream(&self, row: &Uri, mode: WriteMode) -> CatalogResult<OutputStream> {
        let (key, id, initial) = {
            let state = self.lock()?;
            let (key, id, record) = state.record(row)?;
            if state.read_only_rows.contains(&(key, id)) {
                return Err(CatalogError::PermissionDenied(format!(
                    "{row} is owned by another app"
                )));
            }
            let initial = match mode {
                WriteMode::Append => BytesMut::from(&record.content[..]),
                WriteMode::Write | WriteMode::Truncate => BytesMut::new(),
            };
            (key, id, initial)
        };

        // truncation is visible as soon as the stream is open
        if mode != WriteMode::Append {
            self.commit(key, id, Bytes::new())?;
        }
        Ok(Box::new(MemoryWriter {
            catalog: self.clone(),
            key,
            id,
            buffer: initial,
        }))
    }
}

/// Writer committing its buffer to the row on flush and on drop
struct MemoryWriter {
    catalog: MemoryCatalog,
    key: TableKey,
    id: u64,
    buffer: BytesMut,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.catalog
            .commit(self.key, self.id, Bytes::copy_from_slice(&self.buffer))
            .map_err(std::io::Error::other)
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("failed to commit row {} on close: {e}", self.id);
        }
    }
}
