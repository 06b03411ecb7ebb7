//! In-memory key-value store implementation for testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::{KVError, KVResult, KVStore};

/// An in-memory key-value store backed by a HashMap.
///
/// Clones share the same underlying map, which lets tests hand one copy to a
/// recognizer and inspect the persisted blob through another.
#[derive(Clone)]
pub struct MemoryStore {
    data: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Return the number of stored keys.
    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    /// Return true if no keys are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> KVResult<Option<String>> {
        let data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> KVResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        data.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> KVResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        data.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();

        store.set("db", "{\"faces\":[]}").unwrap();
        assert_eq!(store.get("db").unwrap().as_deref(), Some("{\"faces\":[]}"));
        assert_eq!(store.get("nonexistent").unwrap(), None);

        store.delete("db").unwrap();
        assert_eq!(store.get("db").unwrap(), None);
        store.delete("db").unwrap();
    }

    #[test]
    fn test_overwrite() {
        let store = MemoryStore::new();
        store.set("db", "first").unwrap();
        store.set("db", "second").unwrap();
        assert_eq!(store.get("db").unwrap().as_deref(), Some("second"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_size_of() {
        let store = MemoryStore::new();
        assert_eq!(store.size_of("db").unwrap(), None);
        store.set("db", "héllo").unwrap();
        // Byte length, not char count.
        assert_eq!(store.size_of("db").unwrap(), Some(6));
    }

    #[test]
    fn test_clones_share_data() {
        let a = MemoryStore::new();
        let b = a.clone();
        a.set("k", "v").unwrap();
        assert_eq!(b.get("k").unwrap().as_deref(), Some("v"));
    }
}
