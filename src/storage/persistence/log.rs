//! Single-file, line-delimited store.
//!
//! The file at `<base_dir>/<name>` holds one compact JSON record per line.
//! `add` appends a line without touching earlier bytes; every other mutation
//! rewrites the whole file from memory.
//!
//! # Line contract
//!
//! Records are written followed by `\n`. On load the text is split on `\n`,
//! a trailing `\r` is dropped and blank lines are ignored, so files written
//! with CRLF endings load too. When the last line of an existing file has no
//! terminator, `add` writes one before the new record.

use crate::models::Record;
use crate::storage::list::{Identity, LoadedObserver};
use crate::storage::{RecordList, RecordStore, ensure_dir, resolve_name};
use crate::{Error, Result};
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Stores every record as one line of JSON in a single file.
pub struct LogStore<T: Record> {
    path: PathBuf,
    name: String,
    records: RecordList<T>,
}

/// Configures and opens a [`LogStore`].
pub struct LogStoreBuilder<T: Record> {
    base_dir: PathBuf,
    identity: Identity<T>,
    name: Option<String>,
    auto_load: bool,
    observers: Vec<LoadedObserver<T>>,
}

impl<T: Record> LogStoreBuilder<T> {
    /// Uses `name` for the file instead of the pluralized type name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether `open` loads the existing file (default `true`).
    #[must_use]
    pub const fn auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }

    /// Replaces the rule `update` and `remove` use to find a record.
    #[must_use]
    pub fn identity<F>(mut self, identity: F) -> Self
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        self.identity = Arc::new(identity);
        self
    }

    /// Registers a callback run after every load.
    #[must_use]
    pub fn on_loaded<F>(mut self, observer: F) -> Self
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
        self
    }

    /// Creates the base directory, then loads when auto-load is on.
    ///
    /// The store file itself is not created until the first write.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created or the file
    /// cannot be read, and [`Error::Deserialization`] if a line does not parse.
    pub fn open(self) -> Result<LogStore<T>> {
        if matches!(self.name.as_deref(), Some("")) {
            return Err(Error::InvalidInput("store name must not be empty".to_string()));
        }

        ensure_dir(&self.base_dir, "create_base_dir")?;

        let name = resolve_name::<T>(self.name.as_deref());
        let path = self.base_dir.join(&name);

        let mut records = RecordList::new(self.identity);
        for observer in self.observers {
            records.on_loaded(observer);
        }

        let mut store = LogStore {
            path,
            name,
            records,
        };

        if self.auto_load {
            store.load()?;
        }

        Ok(store)
    }
}

impl<T: Record> LogStore<T> {
    /// Starts configuring a store under `base_dir` whose records are matched
    /// by the key `key_fn` extracts.
    ///
    /// `update` and `remove` look a record up by key, so a record changed in
    /// any other field still finds its stored counterpart.
    pub fn builder<K, F>(base_dir: impl Into<PathBuf>, key_fn: F) -> LogStoreBuilder<T>
    where
        K: PartialEq,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::builder_with_identity(base_dir, move |a: &T, b: &T| key_fn(a) == key_fn(b))
    }

    /// Opens a keyed store with default settings and loads it.
    ///
    /// # Errors
    ///
    /// See [`LogStoreBuilder::open`].
    pub fn open<K, F>(base_dir: impl Into<PathBuf>, key_fn: F) -> Result<Self>
    where
        K: PartialEq,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::builder(base_dir, key_fn).open()
    }

    /// Starts configuring a store whose records are matched by `identity`.
    pub fn builder_with_identity<F>(base_dir: impl Into<PathBuf>, identity: F) -> LogStoreBuilder<T>
    where
        F: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        LogStoreBuilder {
            base_dir: base_dir.into(),
            identity: Arc::new(identity),
            name: None,
            auto_load: true,
            observers: Vec::new(),
        }
    }

    /// The store file, `<base_dir>/<name>`.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The resolved store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rewrites the whole file from memory, one record per line.
    ///
    /// Every record is encoded before the file is touched, so an encoding
    /// failure leaves the previous content in place. Returns `true` once the
    /// write has completed.
    #[instrument(skip_all, fields(store = %self.name, operation = "save"))]
    pub fn save(&self) -> Result<bool> {
        let mut buf = String::new();
        for record in &self.records {
            buf.push_str(&encode_line(record)?);
            buf.push('\n');
        }

        fs::write(&self.path, buf).map_err(Error::io("write_store_file", &self.path))?;
        tracing::debug!(count = self.records.len(), "rewrote store file");
        Ok(true)
    }

    fn read_records(&self) -> Result<Vec<T>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io("read_store_file", &self.path)(e)),
        };

        parse_lines(&self.path, &text)
    }
}

impl<T: Record> RecordStore<T> for LogStore<T> {
    #[instrument(skip_all, fields(store = %self.name, operation = "load"))]
    fn load(&mut self) -> Result<()> {
        let items = self.read_records()?;

        tracing::info!(count = items.len(), path = %self.path.display(), "loaded records");
        self.records.replace_all(items);
        self.records.fire_loaded();
        Ok(())
    }

    #[instrument(skip_all, fields(store = %self.name, operation = "add"))]
    fn add(&mut self, record: T) -> Result<()> {
        let mut line = encode_line(&record)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(Error::io("open_store_file", &self.path))?;

        // A file edited by hand may lack the final newline.
        if missing_final_newline(&mut file).map_err(Error::io("read_store_file", &self.path))? {
            line.insert(0, '\n');
        }

        file.write_all(line.as_bytes())
            .map_err(Error::io("append_store_file", &self.path))?;

        self.records.push(record);
        Ok(())
    }

    #[instrument(skip_all, fields(store = %self.name, operation = "update"))]
    fn update(&mut self, record: T) -> Result<bool> {
        let matched = self.records.update(record);
        self.save()?;
        Ok(matched)
    }

    #[instrument(skip_all, fields(store = %self.name, operation = "remove"))]
    fn remove(&mut self, record: &T) -> Result<bool> {
        let removed = self.records.remove(record);
        self.save()?;
        Ok(removed)
    }

    #[instrument(skip_all, fields(store = %self.name, operation = "clear"))]
    fn clear(&mut self) -> Result<()> {
        self.records.clear();
        self.save()?;
        Ok(())
    }

    fn records(&self) -> &RecordList<T> {
        &self.records
    }
}

impl<T: Record + fmt::Debug> fmt::Debug for LogStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStore")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("records", &self.records)
            .finish()
    }
}

impl<'a, T: Record> IntoIterator for &'a LogStore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Encodes one record as compact JSON. Compact output never contains a raw
/// newline, so the result is always exactly one line.
fn encode_line<T: Record>(record: &T) -> Result<String> {
    serde_json::to_string(record).map_err(|source| Error::Serialization { source })
}

/// Whether `file` is non-empty and its last byte is not `\n`.
fn missing_final_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn parse_lines<T: Record>(path: &Path, text: &str) -> Result<Vec<T>> {
    let mut items = Vec::new();

    for (index, line) in text.split('\n').enumerate() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.trim().is_empty() {
            continue;
        }

        let record = serde_json::from_str(line).map_err(|source| Error::Deserialization {
            path: path.to_path_buf(),
            line: Some(index + 1),
            source,
        })?;
        items.push(record);
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Entry {
        id: u32,
        text: String,
    }

    impl Record for Entry {}

    fn entry(id: u32, text: &str) -> Entry {
        Entry {
            id,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_open_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let store: LogStore<Entry> = LogStore::open(dir.path(), |e: &Entry| e.id).unwrap();

        assert_eq!(store.path(), dir.path().join("entries"));
        assert!(!store.path().exists());
        assert!(store.is_empty());
    }

    #[test]
    fn test_add_appends_one_line() {
        let dir = TempDir::new().unwrap();
        let mut store = LogStore::open(dir.path(), |e: &Entry| e.id).unwrap();

        store.add(entry(1, "one")).unwrap();
        store.add(entry(2, "line\nbreak")).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(
            raw,
            "{\"id\":1,\"text\":\"one\"}\n{\"id\":2,\"text\":\"line\\nbreak\"}\n"
        );
    }

    #[test]
    fn test_parse_lines_accepts_crlf_and_blank_lines() {
        let text = "{\"id\":1,\"text\":\"a\"}\r\n\r\n{\"id\":2,\"text\":\"b\"}\r\n";
        let items: Vec<Entry> = parse_lines(Path::new("entries"), text).unwrap();
        assert_eq!(items, vec![entry(1, "a"), entry(2, "b")]);
    }

    #[test]
    fn test_parse_lines_without_trailing_newline() {
        let text = "{\"id\":1,\"text\":\"a\"}";
        let items: Vec<Entry> = parse_lines(Path::new("entries"), text).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_parse_lines_reports_line_number() {
        let text = "{\"id\":1,\"text\":\"a\"}\n{broken\n";
        let err = parse_lines::<Entry>(Path::new("entries"), text).unwrap_err();
        assert!(matches!(err, Error::Deserialization { line: Some(2), .. }));
    }

    #[test]
    fn test_identity_override_updates_by_id() {
        let dir = TempDir::new().unwrap();
        let mut store: LogStore<Entry> =
            LogStore::builder_with_identity(dir.path(), |a: &Entry, b: &Entry| a.id == b.id)
                .open()
                .unwrap();
        store.add(entry(1, "before")).unwrap();

        assert!(store.update(entry(1, "after")).unwrap());

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw, "{\"id\":1,\"text\":\"after\"}\n");
    }

    #[test]
    fn test_update_by_key_replaces_changed_record() {
        let dir = TempDir::new().unwrap();
        let mut store = LogStore::open(dir.path(), |e: &Entry| e.id).unwrap();
        store.add(entry(1, "a")).unwrap();

        let mut changed = store.iter().next().unwrap().clone();
        changed.text = "b".to_string();
        assert!(store.update(changed).unwrap());
        assert_eq!(store.iter().next(), Some(&entry(1, "b")));
    }

    #[test]
    fn test_update_without_key_match() {
        let dir = TempDir::new().unwrap();
        let mut store = LogStore::open(dir.path(), |e: &Entry| e.id).unwrap();
        store.add(entry(1, "a")).unwrap();

        assert!(!store.update(entry(2, "b")).unwrap());
        assert_eq!(store.records().as_slice(), &[entry(1, "a")]);
    }

    #[test]
    fn test_missing_final_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("log");

        fs::write(&path, "").unwrap();
        let mut file = OpenOptions::new().read(true).append(true).open(&path).unwrap();
        assert!(!missing_final_newline(&mut file).unwrap());

        fs::write(&path, "{}\n").unwrap();
        let mut file = OpenOptions::new().read(true).append(true).open(&path).unwrap();
        assert!(!missing_final_newline(&mut file).unwrap());

        fs::write(&path, "{}").unwrap();
        let mut file = OpenOptions::new().read(true).append(true).open(&path).unwrap();
        assert!(missing_final_newline(&mut file).unwrap());
    }

    #[test]
    fn test_save_returns_true() {
        let dir = TempDir::new().unwrap();
        let mut store = LogStore::open(dir.path(), |e: &Entry| e.id).unwrap();
        store.add(entry(1, "a")).unwrap();

        assert!(store.save().unwrap());
    }

    #[test]
    fn test_clear_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let mut store = LogStore::open(dir.path(), |e: &Entry| e.id).unwrap();
        store.add(entry(1, "a")).unwrap();

        store.clear().unwrap();

        assert!(store.is_empty());
        assert_eq!(fs::metadata(store.path()).unwrap().len(), 0);
    }

    #[test]
    fn test_name_override() {
        let dir = TempDir::new().unwrap();
        let store: LogStore<Entry> = LogStore::builder(dir.path(), |e: &Entry| e.id)
            .name("journal.ndjson")
            .open()
            .unwrap();

        assert_eq!(store.path(), dir.path().join("journal.ndjson"));
    }
}
