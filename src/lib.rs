//! # Flatstore
//!
//! Flat-file JSON persistence for in-memory record lists.
//!
//! Two stores share one contract: load on construction, query from memory,
//! re-persist synchronously on every mutation.
//!
//! - [`DirectoryStore`]: one JSON file per record, `<base>/<name>/<key>.json`
//! - [`LogStore`]: newline-delimited JSON in a single file, `<base>/<name>`
//!
//! ## Example
//!
//! ```rust,no_run
//! use flatstore::{DirectoryStore, Record, RecordStore};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Default, Serialize, Deserialize)]
//! struct Film {
//!     id: u32,
//!     title: String,
//! }
//!
//! impl Record for Film {}
//!
//! # fn main() -> flatstore::Result<()> {
//! let mut films = DirectoryStore::open("data", |f: &Film| f.id.to_string())?;
//! films.add(Film { id: 123, title: "Hello world".into() })?;
//! assert_eq!(films.len(), 1);
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use std::path::PathBuf;
use thiserror::Error as ThisError;

pub mod cli;
pub mod config;
pub mod models;
pub mod observability;
pub mod storage;

pub use config::{LoggingSettings, StoreConfig};
pub use models::Record;
pub use storage::{
    DirectoryStore, DirectoryStoreBuilder, LogStore, LogStoreBuilder, RecordList, RecordStore,
    pluralize, resolve_name,
};

/// Error type for flatstore operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `DuplicateKey` | `DirectoryStore::add` and the existence predicate reports a conflict |
/// | `InvalidKey` | A record key is not a safe single file name |
/// | `Deserialization` | `load` finds content that does not parse as the record type |
/// | `Serialization` | A record cannot be encoded as JSON |
/// | `Io` | Any filesystem failure (permission denied, disk full, ...) |
/// | `InvalidInput` | Bad configuration values or command-line input |
/// | `OperationFailed` | Non-filesystem failures such as config parsing or logging setup |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A record with the same key is already in the store.
    #[error("duplicate key: a record with key '{key}' already exists")]
    DuplicateKey {
        /// The conflicting key.
        key: String,
    },

    /// A key cannot be used as a file name.
    #[error("invalid key '{key}': {reason}")]
    InvalidKey {
        /// The rejected key.
        key: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// On-disk content does not parse as the record type.
    ///
    /// `line` is set for log stores (1-based) and `None` for per-record files.
    #[error("failed to deserialize {}{}: {source}", path.display(), line.map(|l| format!(" line {l}")).unwrap_or_default())]
    Deserialization {
        /// File that failed to parse.
        path: PathBuf,
        /// Offending line, for line-delimited files.
        line: Option<usize>,
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be encoded.
    #[error("failed to serialize record: {source}")]
    Serialization {
        /// The underlying encode error.
        #[source]
        source: serde_json::Error,
    },

    /// A filesystem operation failed.
    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved.
        path: PathBuf,
        /// The original I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An operation failed.
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds an [`Error::Io`] for `operation` on `path`.
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<PathBuf>,
    ) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            operation,
            path,
            source,
        }
    }
}

/// Result type alias for flatstore operations.
pub type Result<T> = std::result::Result<T, Error>;
