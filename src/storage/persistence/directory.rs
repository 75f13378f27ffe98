//! Per-record file store.
//!
//! Each record is a JSON file named after its key:
//!
//! ```text
//! <base_dir>/<name>/<key>.json
//! ```
//!
//! # Security
//!
//! Keys are validated before they become file names. A key containing a path
//! separator, NUL, or equal to `.`/`..` is rejected with
//! [`Error::InvalidKey`], so a record can never be written outside the store
//! directory.

use crate::models::Record;
use crate::storage::list::{Identity, LoadedObserver};
use crate::storage::{RecordList, RecordStore, ensure_dir, remove_file_if_exists, resolve_name};
use crate::{Error, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;

/// Maximum key length in bytes; most filesystems cap a name at 255.
const MAX_KEY_LEN: usize = 250;

/// Maps a record to the stem of its file name.
pub type KeyFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// Decides, given the current records and a candidate, whether the
/// candidate is a duplicate.
pub type ExistsFn<T> = Arc<dyn Fn(&[T], &T) -> bool + Send + Sync>;

/// Stores each record as its own JSON file inside a directory.
pub struct DirectoryStore<T: Record> {
    path: PathBuf,
    name: String,
    records: RecordList<T>,
    key_fn: KeyFn<T>,
    exists_fn: ExistsFn<T>,
    pretty: bool,
}

/// Configures and opens a [`DirectoryStore`].
pub struct DirectoryStoreBuilder<T: Record> {
    base_dir: PathBuf,
    key_fn: KeyFn<T>,
    exists_fn: Option<ExistsFn<T>>,
    name: Option<String>,
    auto_load: bool,
    pretty: bool,
    observers: Vec<LoadedObserver<T>>,
}

impl<T: Record> DirectoryStoreBuilder<T> {
    /// Overrides the duplicate check used by `add`.
    ///
    /// The default treats a record as a duplicate when any stored record has
    /// the same key.
    #[must_use]
    pub fn exists<F>(mut self, exists_fn: F) -> Self
    where
        F: Fn(&[T], &T) -> bool + Send + Sync + 'static,
    {
        self.exists_fn = Some(Arc::new(exists_fn));
        self
    }

    /// Uses `name` for the store directory instead of the pluralized type name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether `open` loads existing files (default `true`).
    #[must_use]
    pub const fn auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = auto_load;
        self
    }

    /// Whether files are written pretty-printed (default `true`).
    #[must_use]
    pub const fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Registers a callback run after every load, including the one `open`
    /// performs.
    #[must_use]
    pub fn on_loaded<F>(mut self, observer: F) -> Self
    where
        F: Fn(&[T]) + Send + Sync + 'static,
    {
        self.observers.push(Box::new(observer));
        self
    }

    /// Creates the base and store directories, then loads when auto-load is on.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if a directory cannot be created or read, and
    /// [`Error::Deserialization`] if an existing file does not parse.
    pub fn open(self) -> Result<DirectoryStore<T>> {
        if matches!(self.name.as_deref(), Some("")) {
            return Err(Error::InvalidInput("store name must not be empty".to_string()));
        }

        ensure_dir(&self.base_dir, "create_base_dir")?;

        let name = resolve_name::<T>(self.name.as_deref());
        let path = self.base_dir.join(&name);
        ensure_dir(&path, "create_store_dir")?;

        let key_fn = self.key_fn;
        let exists_fn = self.exists_fn.unwrap_or_else(|| same_key(Arc::clone(&key_fn)));

        let identity_key = Arc::clone(&key_fn);
        let identity: Identity<T> = Arc::new(move |a: &T, b: &T| identity_key(a) == identity_key(b));
        let mut records = RecordList::new(identity);
        for observer in self.observers {
            records.on_loaded(observer);
        }

        let mut store = DirectoryStore {
            path,
            name,
            records,
            key_fn,
            exists_fn,
            pretty: self.pretty,
        };

        if self.auto_load {
            store.load()?;
        }

        Ok(store)
    }
}

/// The default duplicate check: some stored record shares the candidate's key.
fn same_key<T: Record>(key_fn: KeyFn<T>) -> ExistsFn<T> {
    Arc::new(move |items: &[T], candidate: &T| {
        let key = key_fn(candidate);
        items.iter().any(|item| key_fn(item) == key)
    })
}

impl<T: Record> DirectoryStore<T> {
    /// Starts configuring a store under `base_dir` keyed by `key_fn`.
    pub fn builder<F>(base_dir: impl Into<PathBuf>, key_fn: F) -> DirectoryStoreBuilder<T>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        DirectoryStoreBuilder {
            base_dir: base_dir.into(),
            key_fn: Arc::new(key_fn),
            exists_fn: None,
            name: None,
            auto_load: true,
            pretty: true,
            observers: Vec::new(),
        }
    }

    /// Opens a store with default settings and loads it.
    ///
    /// # Errors
    ///
    /// See [`DirectoryStoreBuilder::open`].
    pub fn open<F>(base_dir: impl Into<PathBuf>, key_fn: F) -> Result<Self>
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        Self::builder(base_dir, key_fn).open()
    }

    /// The store directory, `<base_dir>/<name>`.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The resolved store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The key of `record` under this store's key function.
    pub fn key_of(&self, record: &T) -> String {
        (self.key_fn)(record)
    }

    /// Path of the file `record` is stored in.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKey`] if the record's key is not a safe file name.
    pub fn file_path(&self, record: &T) -> Result<PathBuf> {
        self.key_path(&self.key_of(record))
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.path.join(format!("{key}.json")))
    }

    fn encode(&self, record: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(record)
        } else {
            serde_json::to_string(record)
        };
        json.map_err(|source| Error::Serialization { source })
    }

    fn write_file(path: &Path, json: &str) -> Result<()> {
        fs::write(path, json).map_err(Error::io("write_record_file", path))?;
        tracing::debug!(path = %path.display(), "wrote record file");
        Ok(())
    }

    /// Lists the `*.json` files directly inside the store directory.
    fn json_files(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.path).map_err(Error::io("read_store_dir", &self.path))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(Error::io("read_dir_entry", &self.path))?;
            let path = entry.path();

            if !is_json_file(&path) {
                continue;
            }

            let file_type = entry.file_type().map_err(Error::io("read_file_type", &path))?;
            if !file_type.is_file() {
                tracing::warn!(path = %path.display(), "skipping non-file entry");
                continue;
            }

            files.push(path);
        }

        Ok(files)
    }
}

impl<T: Record> RecordStore<T> for DirectoryStore<T> {
    #[instrument(skip_all, fields(store = %self.name, operation = "load"))]
    fn load(&mut self) -> Result<()> {
        let mut items = Vec::new();

        for path in self.json_files()? {
            let json = fs::read_to_string(&path).map_err(Error::io("read_record_file", &path))?;
            let record = serde_json::from_str(&json).map_err(|source| Error::Deserialization {
                path: path.clone(),
                line: None,
                source,
            })?;
            items.push(record);
        }

        tracing::info!(count = items.len(), path = %self.path.display(), "loaded records");
        self.records.replace_all(items);
        self.records.fire_loaded();
        Ok(())
    }

    #[instrument(skip_all, fields(store = %self.name, operation = "add"))]
    fn add(&mut self, record: T) -> Result<()> {
        let key = self.key_of(&record);
        if (self.exists_fn)(self.records.as_slice(), &record) {
            return Err(Error::DuplicateKey { key });
        }

        let path = self.key_path(&key)?;
        let json = self.encode(&record)?;

        self.records.push(record);
        Self::write_file(&path, &json)
    }

    #[instrument(skip_all, fields(store = %self.name, operation = "update"))]
    fn update(&mut self, record: T) -> Result<bool> {
        let path = self.file_path(&record)?;
        let json = self.encode(&record)?;

        let matched = self.records.update(record);
        Self::write_file(&path, &json)?;
        Ok(matched)
    }

    #[instrument(skip_all, fields(store = %self.name, operation = "remove"))]
    fn remove(&mut self, record: &T) -> Result<bool> {
        let removed = self.records.remove(record);

        // A key that cannot be a file name was never written.
        let Ok(path) = self.file_path(record) else {
            return Ok(removed);
        };

        if remove_file_if_exists(&path)? {
            tracing::debug!(path = %path.display(), "deleted record file");
        }
        Ok(removed)
    }

    #[instrument(skip_all, fields(store = %self.name, operation = "clear"))]
    fn clear(&mut self) -> Result<()> {
        self.records.clear();

        let mut deleted = 0usize;
        for path in self.json_files()? {
            if remove_file_if_exists(&path)? {
                deleted += 1;
            }
        }

        tracing::debug!(deleted, "cleared store directory");
        Ok(())
    }

    fn records(&self) -> &RecordList<T> {
        &self.records
    }
}

impl<T: Record + fmt::Debug> fmt::Debug for DirectoryStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryStore")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("records", &self.records)
            .field("pretty", &self.pretty)
            .finish_non_exhaustive()
    }
}

impl<'a, T: Record> IntoIterator for &'a DirectoryStore<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Checks that `key` is usable as a single file name stem.
fn validate_key(key: &str) -> Result<()> {
    let reason = if key.is_empty() {
        Some("key is empty")
    } else if key.len() > MAX_KEY_LEN {
        Some("key is longer than 250 bytes")
    } else if key == "." || key == ".." {
        Some("key is a relative path component")
    } else if key.contains(['/', '\\', '\0']) {
        Some("key contains a path separator or NUL")
    } else {
        None
    };

    reason.map_or(Ok(()), |reason| {
        Err(Error::InvalidKey {
            key: key.to_string(),
            reason,
        })
    })
}

fn is_json_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}
