use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::{CoreError, LocalStorage};

/// Simple in-memory key space for tests and demos. Data is lost on drop.
pub struct InMemoryStorage {
    inner: Mutex<BTreeMap<String, String>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(BTreeMap::new()),
        }
    }

    /// Start with one pre-populated key.
    pub fn with_item<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        let mut map = BTreeMap::new();
        map.insert(key.into(), value.into());
        Self {
            inner: Mutex::new(map),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        let map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))?;
        Ok(map.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut map = self
            .inner
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))?;
        map.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Key space that does not exist in the current environment.
#[derive(Clone, Copy, Debug, Default)]
pub struct UnavailableStorage;

impl LocalStorage for UnavailableStorage {
    fn is_available(&self) -> bool {
        false
    }

    fn get_item(&self, _key: &str) -> Result<Option<String>, CoreError> {
        Err(CoreError::StorageUnavailable)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<(), CoreError> {
        Err(CoreError::StorageUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let storage = InMemoryStorage::new();
        assert!(storage.is_empty());
        assert_eq!(storage.get_item("bookings").unwrap(), None);

        storage.set_item("bookings", "[]").unwrap();
        assert_eq!(storage.get_item("bookings").unwrap().as_deref(), Some("[]"));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn set_overwrites() {
        let storage = InMemoryStorage::with_item("k", "[1]");
        storage.set_item("k", "[2]").unwrap();
        assert_eq!(storage.get_item("k").unwrap().as_deref(), Some("[2]"));
    }

    #[test]
    fn unavailable_rejects_everything() {
        let storage = UnavailableStorage;
        assert!(!storage.is_available());
        assert!(matches!(
            storage.get_item("k"),
            Err(CoreError::StorageUnavailable)
        ));
        assert!(matches!(
            storage.set_item("k", "[]"),
            Err(CoreError::StorageUnavailable)
        ));
    }
}
