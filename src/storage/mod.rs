//! Storage layer.
//!
//! Every store composes the same three pieces:
//! - **Collection**: [`RecordList`], the in-memory source of truth for reads
//! - **Persistence**: a directory of per-record files or a single line-delimited file
//! - **Naming**: [`resolve_name`], which maps a record type to its on-disk name
//!
//! Mutations update the collection and the disk synchronously, in a fixed
//! order per operation. Nothing is cached, batched or locked.

pub mod list;
pub mod naming;
pub mod persistence;
pub mod traits;

pub use list::{Identity, LoadedObserver, RecordList};
pub use naming::{pluralize, resolve_name};
pub use persistence::{DirectoryStore, DirectoryStoreBuilder, LogStore, LogStoreBuilder};
pub use traits::RecordStore;

use crate::{Error, Result};
use std::fs;
use std::path::Path;

/// Creates `path` and any missing parents. Succeeds when it already exists.
pub(crate) fn ensure_dir(path: &Path, operation: &'static str) -> Result<()> {
    fs::create_dir_all(path).map_err(Error::io(operation, path))
}

/// Deletes a file, treating an already missing file as success.
///
/// Returns whether a file was actually removed.
pub(crate) fn remove_file_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io("delete_record_file", path)(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");

        ensure_dir(&nested, "create_dir").unwrap();
        ensure_dir(&nested, "create_dir").unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn test_remove_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.json");

        assert!(!remove_file_if_exists(&path).unwrap());
    }

    #[test]
    fn test_remove_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("present.json");
        fs::write(&path, "{}").unwrap();

        assert!(remove_file_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}
