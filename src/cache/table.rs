//! Cache implementation
//!
//! HashMap-based cache with RwLock for concurrency.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::record::Command;

/// Key → last-seen value
pub struct Cache {
    data: RwLock<HashMap<String, String>>,
}

impl Cache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
        }
    }

    /// Get the cached value for a key (read lock)
    pub fn get(&self, key: &str) -> Option<String> {
        self.data.read().get(key).cloned()
    }

    /// Insert or overwrite a value (write lock)
    pub fn insert(&self, key: String, value: String) {
        self.data.write().insert(key, value);
    }

    /// Evict a key (write lock)
    pub fn evict(&self, key: &str) {
        self.data.write().remove(key);
    }

    /// Apply a command: `Set` inserts, `Remove` evicts
    pub fn apply(&self, command: &Command) {
        match command {
            Command::Set { key, value } => self.insert(key.clone(), value.clone()),
            Command::Remove { key } => self.evict(key),
        }
    }

    /// Number of cached keys
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Drop every cached key
    pub fn clear(&self) {
        self.data.write().clear();
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new()
    }
}
