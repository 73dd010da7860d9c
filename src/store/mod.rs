//! Key/value storage backends shared by the response cache and the token store.
//!
//! Two scopes exist, mirroring how a browser separates session and local storage:
//! - [`MemoryStore`]: lives as long as the process (session scope)
//! - [`SqliteStore`]: survives restarts (durable scope)
//!
//! Both can be bounded by a byte capacity; writes that would exceed it fail with
//! [`StoreError::QuotaExceeded`] so callers can evict and retry.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("storage quota exceeded: {needed} bytes needed, capacity is {capacity}")]
  QuotaExceeded { needed: usize, capacity: usize },
  #[error("storage backend failure: {0}")]
  Backend(String),
  #[error("failed to (de)serialize stored value: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl StoreError {
  pub fn is_quota(&self) -> bool {
    matches!(self, StoreError::QuotaExceeded { .. })
  }
}

/// String key/value store.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

  /// Insert or replace a value.
  fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

  fn remove(&self, key: &str) -> Result<(), StoreError>;

  /// Remove every key.
  fn clear(&self) -> Result<(), StoreError>;
}

/// Read a JSON-encoded value.
pub fn read_json<T: DeserializeOwned>(
  store: &dyn KeyValueStore,
  key: &str,
) -> Result<Option<T>, StoreError> {
  match store.get(key)? {
    Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
    None => Ok(None),
  }
}

/// Write a value as JSON.
pub fn write_json<T: Serialize + ?Sized>(
  store: &dyn KeyValueStore,
  key: &str,
  value: &T,
) -> Result<(), StoreError> {
  let raw = serde_json::to_string(value)?;
  store.set(key, &raw)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_json_helpers_roundtrip_through_store() {
    let store = MemoryStore::unbounded();
    write_json(&store, "k", &vec!["a", "b"]).unwrap();
    let value: Option<Vec<String>> = read_json(&store, "k").unwrap();
    assert_eq!(value, Some(vec!["a".to_string(), "b".to_string()]));
  }

  #[test]
  fn test_read_json_missing_key() {
    let store = MemoryStore::unbounded();
    let value: Option<u32> = read_json(&store, "missing").unwrap();
    assert_eq!(value, None);
  }

  #[test]
  fn test_read_json_rejects_garbage() {
    let store = MemoryStore::unbounded();
    store.set("k", "not json").unwrap();
    let err = read_json::<u32>(&store, "k").unwrap_err();
    assert!(matches!(err, StoreError::Serialization(_)));
    assert!(!err.is_quota());
  }
}
