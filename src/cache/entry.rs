//! Cached response payload and its validity window.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cached response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
  /// The response body
  pub payload: Value,
  /// When the entry was written, in milliseconds since the epoch
  pub stored_at_millis: i64,
  /// How long the entry stays valid
  pub validity_millis: i64,
  /// ETag of the response the payload came from
  #[serde(default)]
  pub etag: Option<String>,
}

impl CacheEntry {
  pub fn new(payload: Value, stored_at_millis: i64, validity_millis: i64) -> Self {
    Self {
      payload,
      stored_at_millis,
      validity_millis,
      etag: None,
    }
  }

  pub fn with_etag(mut self, etag: Option<String>) -> Self {
    self.etag = etag;
    self
  }

  /// An entry is valid strictly before `stored_at + validity`.
  pub fn is_valid_at(&self, now_millis: i64) -> bool {
    now_millis < self.stored_at_millis.saturating_add(self.validity_millis)
  }

  /// Timestamp of the write, for `If-Modified-Since`.
  pub fn stored_at(&self) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(self.stored_at_millis).single()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_validity_boundary() {
    let entry = CacheEntry::new(json!({"a": 1}), 1_000, 500);
    assert!(entry.is_valid_at(1_000));
    assert!(entry.is_valid_at(1_499));
    assert!(!entry.is_valid_at(1_500));
    assert!(!entry.is_valid_at(2_000));
  }

  #[test]
  fn test_zero_validity_is_never_valid() {
    let entry = CacheEntry::new(json!(null), 1_000, 0);
    assert!(!entry.is_valid_at(1_000));
  }

  #[test]
  fn test_stored_at_timestamp() {
    let entry = CacheEntry::new(json!(null), 1_600_000_000_000, 0);
    assert_eq!(
      entry.stored_at().map(|t| t.timestamp()),
      Some(1_600_000_000)
    );
  }

  #[test]
  fn test_deserialize_without_etag() {
    let raw = r#"{"payload":[1,2],"stored_at_millis":5,"validity_millis":10}"#;
    let entry: CacheEntry = serde_json::from_str(raw).unwrap();
    assert_eq!(entry.etag, None);
    assert_eq!(entry.payload, json!([1, 2]));
  }
}
