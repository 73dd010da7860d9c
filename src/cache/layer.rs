//! Cache layer that keeps URL-keyed responses in a key/value store.

use chrono::{Duration, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use super::entry::CacheEntry;
use crate::store::{read_json, write_json, KeyValueStore, StoreError};

/// Key under which insertion order of cache keys is stored.
const URLS_KEY: &str = "cache_urls";

fn cache_key(url: &str) -> String {
  format!("cache_{}", url)
}

/// URL-keyed response cache with a fixed validity window.
///
/// Cloning is cheap; clones share the store and the write lock.
#[derive(Clone)]
pub struct ResponseCache {
  store: Arc<dyn KeyValueStore>,
  /// How long a stored response stays valid
  validity: Duration,
  /// Serializes read-modify-write cycles on `cache_urls`
  write_lock: Arc<Mutex<()>>,
}

impl ResponseCache {
  /// Create a cache over `store`, valid for one hour by default.
  pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
    Self {
      store,
      validity: Duration::hours(1),
      write_lock: Arc::new(Mutex::new(())),
    }
  }

  /// Set how long entries stay valid.
  pub fn with_validity(mut self, validity: Duration) -> Self {
    self.validity = validity;
    self
  }

  fn lock(&self) -> MutexGuard<'_, ()> {
    self.write_lock.lock().unwrap_or_else(|e| e.into_inner())
  }

  /// Look up a valid entry. Expired entries are removed.
  pub fn get(&self, url: &str) -> Result<Option<CacheEntry>, StoreError> {
    self.get_at(url, Utc::now().timestamp_millis())
  }

  pub fn get_at(&self, url: &str, now_millis: i64) -> Result<Option<CacheEntry>, StoreError> {
    let entry: Option<CacheEntry> = read_json(&*self.store, &cache_key(url))?;
    match entry {
      Some(entry) if entry.is_valid_at(now_millis) => Ok(Some(entry)),
      Some(_) => {
        debug!(url, "cache entry expired");
        self.remove(url)?;
        Ok(None)
      }
      None => Ok(None),
    }
  }

  /// Store a payload with a fresh timestamp.
  pub fn store(&self, url: &str, payload: &Value, etag: Option<String>) -> Result<(), StoreError> {
    self.store_at(url, payload, etag, Utc::now().timestamp_millis())
  }

  /// Store a payload stamped with `now_millis`.
  ///
  /// When the store is full, the oldest inserted entries are evicted one by
  /// one until the write fits. If nothing else is left to evict the write is
  /// abandoned and the quota error returned.
  pub fn store_at(
    &self,
    url: &str,
    payload: &Value,
    etag: Option<String>,
    now_millis: i64,
  ) -> Result<(), StoreError> {
    let _guard = self.lock();

    let key = cache_key(url);
    let mut urls: Vec<String> = read_json(&*self.store, URLS_KEY)?.unwrap_or_default();
    if !urls.contains(&key) {
      urls.push(key.clone());
    }

    let entry = CacheEntry::new(
      payload.clone(),
      now_millis,
      self.validity.num_milliseconds(),
    )
    .with_etag(etag);
    let raw = serde_json::to_string(&entry)?;

    loop {
      match self.try_write(&key, &raw, &urls) {
        Ok(()) => return Ok(()),
        Err(e) if e.is_quota() => {
          let Some(oldest) = urls.iter().position(|u| *u != key) else {
            warn!(url, "cache entry does not fit in storage, dropping it");
            self.store.remove(&key)?;
            urls.retain(|u| *u != key);
            // Best effort: the list may be what overflowed
            let _ = write_json(&*self.store, URLS_KEY, &urls);
            return Err(e);
          };
          let evicted = urls.remove(oldest);
          debug!(evicted = %evicted, "storage full, evicting oldest cache entry");
          self.store.remove(&evicted)?;
        }
        Err(e) => return Err(e),
      }
    }
  }

  fn try_write(&self, key: &str, raw: &str, urls: &[String]) -> Result<(), StoreError> {
    self.store.set(key, raw)?;
    write_json(&*self.store, URLS_KEY, urls)
  }

  /// Remove the entry for `url`, if any.
  pub fn remove(&self, url: &str) -> Result<(), StoreError> {
    let _guard = self.lock();

    let key = cache_key(url);
    self.store.remove(&key)?;

    let mut urls: Vec<String> = read_json(&*self.store, URLS_KEY)?.unwrap_or_default();
    let before = urls.len();
    urls.retain(|u| *u != key);
    if urls.len() != before {
      write_json(&*self.store, URLS_KEY, &urls)?;
    }
    Ok(())
  }

  /// URLs currently cached, oldest first.
  pub fn cached_urls(&self) -> Result<Vec<String>, StoreError> {
    let urls: Vec<String> = read_json(&*self.store, URLS_KEY)?.unwrap_or_default();
    Ok(
      urls
        .into_iter()
        .filter_map(|k| k.strip_prefix("cache_").map(String::from))
        .collect(),
    )
  }
}
