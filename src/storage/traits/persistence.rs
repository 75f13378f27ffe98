//! Record store trait.

use crate::models::Record;
use crate::storage::RecordList;
use crate::Result;

/// Operations shared by every flat-file store.
///
/// The in-memory list is the authoritative source for reads; the disk is a
/// mirror re-written synchronously by each mutating call.
pub trait RecordStore<T: Record> {
    /// Replaces the in-memory list with what is on disk, then notifies
    /// loaded observers.
    fn load(&mut self) -> Result<()>;

    /// Adds a record and persists it.
    fn add(&mut self, record: T) -> Result<()>;

    /// Replaces the matching record and persists the change.
    ///
    /// Returns whether a matching record was found in memory.
    fn update(&mut self, record: T) -> Result<bool>;

    /// Removes the matching record from memory and disk.
    ///
    /// Returns whether a matching record was found in memory.
    fn remove(&mut self, record: &T) -> Result<bool>;

    /// Removes every record from memory and disk.
    fn clear(&mut self) -> Result<()>;

    /// The in-memory records.
    fn records(&self) -> &RecordList<T>;

    /// Number of records held in memory.
    fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether the store holds no records.
    fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Iterates the in-memory records in order.
    fn iter(&self) -> std::slice::Iter<'_, T> {
        self.records().iter()
    }

    /// First record satisfying `predicate`.
    fn find<P>(&self, predicate: P) -> Option<&T>
    where
        P: FnMut(&&T) -> bool,
        Self: Sized,
    {
        self.records().find(predicate)
    }
}
