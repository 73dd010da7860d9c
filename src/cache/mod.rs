//! Response cache for GET requests.
//!
//! Entries are JSON payloads keyed by URL with a fixed validity window:
//! - Entries live under `cache_<url>` in a [`KeyValueStore`](crate::store::KeyValueStore)
//! - Insertion order is tracked under `cache_urls` for eviction
//! - A full store evicts the oldest entries until the new write fits

mod entry;
mod layer;

pub use entry::CacheEntry;
pub use layer::ResponseCache;
