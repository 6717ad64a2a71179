//! MemTable implementation
//!
//! BTreeMap-based memtable with RwLock for concurrency.

use std::collections::BTreeMap;

use parking_lot::RwLock;

/// In-memory map of live entries
pub struct MemTable<V> {
    data: RwLock<BTreeMap<String, V>>,
}

impl<V: Clone> MemTable<V> {
    /// Create a new empty MemTable
    pub fn new() -> Self {
        Self::from_map(BTreeMap::new())
    }

    /// Create a MemTable holding recovered entries
    pub fn from_map(map: BTreeMap<String, V>) -> Self {
        Self {
            data: RwLock::new(map),
        }
    }

    /// Get a value by key (read lock)
    pub fn get(&self, key: &str) -> Option<V> {
        self.data.read().get(key).cloned()
    }

    /// Check whether a key is present (read lock)
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.read().contains_key(key)
    }

    /// Insert or overwrite, returning the previous value (write lock)
    pub fn put(&self, key: String, value: V) -> Option<V> {
        self.data.write().insert(key, value)
    }

    /// Remove a key, returning its value (write lock)
    pub fn delete(&self, key: &str) -> Option<V> {
        self.data.write().remove(key)
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Sorted copy of all keys
    pub fn keys(&self) -> Vec<String> {
        self.data.read().keys().cloned().collect()
    }

    /// Sorted point-in-time copy of all entries
    pub fn entries(&self) -> Vec<(String, V)> {
        self.data
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Point-in-time copy of the whole map
    pub fn snapshot(&self) -> BTreeMap<String, V> {
        self.data.read().clone()
    }
}

impl<V: Clone> Default for MemTable<V> {
    fn default() -> Self {
        Self::new()
    }
}
