//! Process-scoped store.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{KeyValueStore, StoreError};

/// In-memory store with an optional byte capacity.
///
/// Usage is measured as the sum of key and value lengths, the way browser
/// storage quotas are accounted.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: Mutex<HashMap<String, String>>,
  capacity: Option<usize>,
}

impl MemoryStore {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      entries: Mutex::new(HashMap::new()),
      capacity: Some(capacity),
    }
  }

  pub fn unbounded() -> Self {
    Self::default()
  }

  /// Bytes currently used.
  pub fn used_bytes(&self) -> usize {
    usage(&self.lock())
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<String, String>> {
    self.entries.lock().unwrap_or_else(|e| e.into_inner())
  }
}

fn usage(entries: &HashMap<String, String>) -> usize {
  entries.iter().map(|(k, v)| k.len() + v.len()).sum()
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    Ok(self.lock().get(key).cloned())
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut entries = self.lock();

    if let Some(capacity) = self.capacity {
      let replaced = entries.get(key).map(|v| key.len() + v.len()).unwrap_or(0);
      let needed = usage(&entries) - replaced + key.len() + value.len();
      if needed > capacity {
        return Err(StoreError::QuotaExceeded { needed, capacity });
      }
    }

    entries.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    self.lock().remove(key);
    Ok(())
  }

  fn clear(&self) -> Result<(), StoreError> {
    self.lock().clear();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_set_and_get() {
    let store = MemoryStore::unbounded();
    store.set("a", "1").unwrap();
    assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
    assert_eq!(store.get("b").unwrap(), None);
  }

  #[test]
  fn test_quota_counts_keys_and_values() {
    let store = MemoryStore::with_capacity(10);
    store.set("ab", "cdef").unwrap(); // 6 bytes
    assert_eq!(store.used_bytes(), 6);

    let err = store.set("gh", "ijk").unwrap_err(); // would be 11
    assert!(err.is_quota());
    assert_eq!(store.get("gh").unwrap(), None);
  }

  #[test]
  fn test_replacing_value_does_not_double_count() {
    let store = MemoryStore::with_capacity(10);
    store.set("ab", "cdefgh").unwrap(); // 8 bytes
    store.set("ab", "xyzxyzxy").unwrap(); // 10 bytes after replace
    assert_eq!(store.used_bytes(), 10);
  }

  #[test]
  fn test_remove_and_clear() {
    let store = MemoryStore::unbounded();
    store.set("a", "1").unwrap();
    store.set("b", "2").unwrap();
    store.remove("a").unwrap();
    assert_eq!(store.get("a").unwrap(), None);
    store.clear().unwrap();
    assert_eq!(store.get("b").unwrap(), None);
    assert_eq!(store.used_bytes(), 0);
  }
}
