//! Command implementations for the `flatstore` binary.
//!
//! Commands operate on stores of untyped JSON objects. A directory store is
//! keyed by one top-level field; a log store matches records by equality.
//!
//! # Example Usage
//!
//! ```bash
//! # One file per record, keyed by "id"
//! flatstore add films '{"id": 123, "title": "Hello world"}'
//! flatstore list films
//! flatstore remove films 123
//!
//! # One record per line
//! flatstore add events --log '{"kind": "start"}'
//! flatstore count events --log
//! ```

use crate::config::StoreConfig;
use crate::{DirectoryStore, Error, LogStore, RecordStore, Result};
use serde_json::Value;
use std::io::Write;

/// Which store layout a command works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// `<data_dir>/<name>/<key>.json`, keyed by a top-level field.
    Directory {
        /// Field whose value becomes the file name.
        key_field: String,
    },
    /// `<data_dir>/<name>`, one record per line.
    Log,
}

impl Layout {
    /// Picks the layout from the `--log` and `--key` flags.
    #[must_use]
    pub fn from_flags(log: bool, key_field: String) -> Self {
        if log {
            Self::Log
        } else {
            Self::Directory { key_field }
        }
    }
}

/// An opened store of JSON values.
pub enum ValueStore {
    /// Per-record files.
    Directory {
        /// The store.
        store: DirectoryStore<Value>,
        /// Field the store is keyed by.
        key_field: String,
    },
    /// Line-delimited file.
    Log(LogStore<Value>),
}

impl ValueStore {
    /// Opens the store `name` under the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be created or loaded.
    pub fn open(config: &StoreConfig, name: &str, layout: Layout) -> Result<Self> {
        match layout {
            Layout::Directory { key_field } => {
                let field = key_field.clone();
                let store = DirectoryStore::builder(&config.data_dir, move |v: &Value| {
                    field_key(v, &field)
                })
                .name(name)
                .auto_load(config.auto_load)
                .pretty(config.pretty)
                .open()?;
                Ok(Self::Directory { store, key_field })
            },
            Layout::Log => {
                let store =
                    LogStore::builder_with_identity(&config.data_dir, |a: &Value, b: &Value| {
                        a == b
                    })
                    .name(name)
                    .auto_load(config.auto_load)
                    .open()?;
                Ok(Self::Log(store))
            },
        }
    }

    /// The records currently in memory.
    #[must_use]
    pub fn records(&self) -> &[Value] {
        match self {
            Self::Directory { store, .. } => store.records().as_slice(),
            Self::Log(store) => store.records().as_slice(),
        }
    }
}

/// Extracts the key of `value` from `field`. Strings are used as-is, other
/// values in their JSON form; a missing field yields an empty key.
#[must_use]
pub fn field_key(value: &Value, field: &str) -> String {
    match value.get(field) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

/// Writes every record as one compact JSON line.
///
/// # Errors
///
/// Returns an error if a record cannot be encoded or the output fails.
pub fn list(store: &ValueStore, out: &mut impl Write) -> Result<usize> {
    for record in store.records() {
        let line = serde_json::to_string(record).map_err(|source| Error::Serialization { source })?;
        writeln!(out, "{line}").map_err(Error::io("write_output", "<stdout>"))?;
    }
    Ok(store.records().len())
}

/// Number of records in the store.
#[must_use]
pub fn count(store: &ValueStore) -> usize {
    store.records().len()
}

/// Parses `json` and adds it to the store.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for malformed JSON, plus any store error.
pub fn add(store: &mut ValueStore, json: &str) -> Result<()> {
    let record = parse_record(json)?;
    match store {
        ValueStore::Directory { store, .. } => store.add(record),
        ValueStore::Log(store) => store.add(record),
    }
}

/// Removes a record.
///
/// A directory store takes the record's key; a log store takes the full
/// record as JSON. Returns whether an in-memory record was removed.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] for malformed JSON, plus any store error.
pub fn remove(store: &mut ValueStore, selector: &str) -> Result<bool> {
    match store {
        ValueStore::Directory { store, key_field } => {
            let mut probe = serde_json::Map::new();
            probe.insert(key_field.clone(), Value::String(selector.to_string()));
            store.remove(&Value::Object(probe))
        },
        ValueStore::Log(store) => {
            let record = parse_record(selector)?;
            store.remove(&record)
        },
    }
}

/// Removes every record.
///
/// # Errors
///
/// Returns any store error.
pub fn clear(store: &mut ValueStore) -> Result<()> {
    match store {
        ValueStore::Directory { store, .. } => store.clear(),
        ValueStore::Log(store) => store.clear(),
    }
}

fn parse_record(json: &str) -> Result<Value> {
    serde_json::from_str(json).map_err(|e| Error::InvalidInput(format!("invalid record JSON: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> StoreConfig {
        StoreConfig::default().with_data_dir(dir.path())
    }

    fn directory(dir: &TempDir) -> ValueStore {
        ValueStore::open(&config(dir), "films", Layout::from_flags(false, "id".to_string())).unwrap()
    }

    #[test]
    fn test_field_key() {
        let v = json!({"id": 123, "slug": "hello", "tags": ["a"]});
        assert_eq!(field_key(&v, "id"), "123");
        assert_eq!(field_key(&v, "slug"), "hello");
        assert_eq!(field_key(&v, "tags"), r#"["a"]"#);
        assert_eq!(field_key(&v, "missing"), "");
    }

    #[test]
    fn test_add_list_count_directory() {
        let dir = TempDir::new().unwrap();
        let mut store = directory(&dir);

        add(&mut store, r#"{"id": 123, "title": "Hello world"}"#).unwrap();
        assert!(dir.path().join("films").join("123.json").exists());

        let mut out = Vec::new();
        assert_eq!(list(&store, &mut out).unwrap(), 1);
        assert_eq!(String::from_utf8(out).unwrap(), "{\"id\":123,\"title\":\"Hello world\"}\n");
        assert_eq!(count(&directory(&dir)), 1);
    }

    #[test]
    fn test_add_without_key_field_is_invalid_key() {
        let dir = TempDir::new().unwrap();
        let mut store = directory(&dir);

        let err = add(&mut store, r#"{"title": "No id"}"#).unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
    }

    #[test]
    fn test_add_malformed_json() {
        let dir = TempDir::new().unwrap();
        let mut store = directory(&dir);

        assert!(matches!(add(&mut store, "{nope"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_remove_by_key_directory() {
        let dir = TempDir::new().unwrap();
        let mut store = directory(&dir);
        add(&mut store, r#"{"id": 1}"#).unwrap();
        add(&mut store, r#"{"id": 2}"#).unwrap();

        assert!(remove(&mut store, "1").unwrap());
        assert!(!dir.path().join("films").join("1.json").exists());
        assert_eq!(count(&directory(&dir)), 1);
    }

    #[test]
    fn test_log_layout_roundtrip() {
        let dir = TempDir::new().unwrap();
        let cfg = config(&dir);
        let mut store = ValueStore::open(&cfg, "events", Layout::Log).unwrap();

        add(&mut store, r#"{"kind": "start"}"#).unwrap();
        add(&mut store, r#"{"kind": "stop"}"#).unwrap();
        assert!(remove(&mut store, r#"{"kind": "start"}"#).unwrap());

        let reopened = ValueStore::open(&cfg, "events", Layout::Log).unwrap();
        assert_eq!(reopened.records(), &[json!({"kind": "stop"})]);

        let mut store = reopened;
        clear(&mut store).unwrap();
        assert_eq!(std::fs::metadata(dir.path().join("events")).unwrap().len(), 0);
    }
}
