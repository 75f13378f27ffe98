//! In-memory record collection backing every store.

use std::fmt;
use std::sync::Arc;

/// Decides whether two records are the same logical record.
///
/// Used by [`RecordList::update`] and [`RecordList::remove`] to find the
/// element a caller-supplied record refers to.
pub type Identity<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// Callback invoked synchronously after a bulk load.
pub type LoadedObserver<T> = Box<dyn Fn(&[T]) + Send + Sync>;

/// An ordered, in-memory list of records.
///
/// Stores hold one of these and treat it as the single source of truth for
/// reads. It knows nothing about persistence.
pub struct RecordList<T> {
    items: Vec<T>,
    identity: Identity<T>,
    observers: Vec<LoadedObserver<T>>,
}

impl<T> RecordList<T> {
    /// Creates an empty list matching records with `identity`.
    pub fn new(identity: Identity<T>) -> Self {
        Self {
            items: Vec::new(),
            identity,
            observers: Vec::new(),
        }
    }

    /// Replaces the whole contents. Observers are not notified; call
    /// [`fire_loaded`](Self::fire_loaded) once the load is complete.
    pub fn replace_all(&mut self, items: Vec<T>) {
        self.items = items;
    }

    /// Appends a record.
    pub fn push(&mut self, record: T) {
        self.items.push(record);
    }

    /// Replaces the first record that matches `record` under the identity rule.
    ///
    /// Returns `false` and drops `record` when nothing matches.
    pub fn update(&mut self, record: T) -> bool {
        match self.position(&record) {
            Some(index) => {
                self.items[index] = record;
                true
            },
            None => false,
        }
    }

    /// Removes the first record that matches `record`.
    pub fn remove(&mut self, record: &T) -> bool {
        self.take(record).is_some()
    }

    /// Removes and returns the first record that matches `record`.
    pub fn take(&mut self, record: &T) -> Option<T> {
        self.position(record).map(|index| self.items.remove(index))
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Registers a callback run after every load.
    pub fn on_loaded(&mut self, observer: LoadedObserver<T>) {
        self.observers.push(observer);
    }

    /// Runs every loaded observer, in registration order.
    pub fn fire_loaded(&self) {
        for observer in &self.observers {
            observer(&self.items);
        }
    }

    /// Index of the first record matching `record`.
    pub fn position(&self, record: &T) -> Option<usize> {
        self.items.iter().position(|item| (self.identity)(item, record))
    }

    /// Whether a record matching `record` is present.
    pub fn contains(&self, record: &T) -> bool {
        self.position(record).is_some()
    }

    /// First record satisfying `predicate`.
    pub fn find<P>(&self, predicate: P) -> Option<&T>
    where
        P: FnMut(&&T) -> bool,
    {
        self.items.iter().find(predicate)
    }

    /// Record at `index`.
    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    /// All records, in order.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Iterates the records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'a, T> IntoIterator for &'a RecordList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: fmt::Debug> fmt::Debug for RecordList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordList")
            .field("items", &self.items)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: u32,
        label: &'static str,
    }

    fn by_id() -> RecordList<Item> {
        RecordList::new(Arc::new(|a: &Item, b: &Item| a.id == b.id))
    }

    #[test]
    fn test_update_replaces_matching_record() {
        let mut list = by_id();
        list.push(Item { id: 1, label: "old" });
        list.push(Item { id: 2, label: "other" });

        assert!(list.update(Item { id: 1, label: "new" }));
        assert_eq!(list.get(0).unwrap().label, "new");
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_update_without_match_leaves_list_alone() {
        let mut list = by_id();
        list.push(Item { id: 1, label: "old" });

        assert!(!list.update(Item { id: 9, label: "new" }));
        assert_eq!(list.as_slice(), &[Item { id: 1, label: "old" }]);
    }

    #[test]
    fn test_remove_first_match_only() {
        let mut list = RecordList::new(Arc::new(|a: &Item, b: &Item| a == b));
        list.push(Item { id: 1, label: "a" });
        list.push(Item { id: 1, label: "a" });

        assert!(list.remove(&Item { id: 1, label: "a" }));
        assert_eq!(list.len(), 1);
        assert!(!list.remove(&Item { id: 2, label: "a" }));
    }

    #[test]
    fn test_find_and_iterate() {
        let mut list = by_id();
        list.push(Item { id: 1, label: "a" });
        list.push(Item { id: 2, label: "b" });

        assert_eq!(list.find(|i| i.label == "b").map(|i| i.id), Some(2));
        let ids: Vec<u32> = (&list).into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_loaded_observers_fire_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut list = by_id();

        let first = Arc::clone(&seen);
        list.on_loaded(Box::new(move |items| {
            first.lock().unwrap().push(("first", items.len()));
        }));
        let second = Arc::clone(&seen);
        list.on_loaded(Box::new(move |items| {
            second.lock().unwrap().push(("second", items.len()));
        }));

        list.replace_all(vec![Item { id: 1, label: "a" }]);
        list.fire_loaded();

        assert_eq!(*seen.lock().unwrap(), vec![("first", 1), ("second", 1)]);
    }

    #[test]
    fn test_clear() {
        let mut list = by_id();
        list.push(Item { id: 1, label: "a" });
        list.clear();
        assert!(list.is_empty());
    }
}
