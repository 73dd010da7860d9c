//! Durable store backed by SQLite.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use super::{KeyValueStore, StoreError};

/// Schema for the key/value table.
const STORE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

/// SQLite-based key/value store.
pub struct SqliteStore {
  conn: Mutex<Connection>,
  capacity: Option<usize>,
}

impl SqliteStore {
  /// Open or create the store at the default location.
  pub fn open(capacity: Option<usize>) -> color_eyre::Result<Self> {
    let path = Self::default_path()?;
    Self::open_at(&path, capacity)
  }

  /// Open or create the store at `path`.
  pub fn open_at(path: &Path, capacity: Option<usize>) -> color_eyre::Result<Self> {
    use color_eyre::eyre::eyre;

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create store directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open store at {}: {}", path.display(), e))?;

    let store = Self::from_connection(conn, capacity)?;
    tracing::debug!(path = %path.display(), "opened durable store");
    Ok(store)
  }

  /// Store living only in memory; used by tests.
  #[cfg(test)]
  pub fn in_memory(capacity: Option<usize>) -> color_eyre::Result<Self> {
    let conn = Connection::open_in_memory()?;
    Self::from_connection(conn, capacity)
  }

  fn from_connection(conn: Connection, capacity: Option<usize>) -> color_eyre::Result<Self> {
    conn
      .execute_batch(STORE_SCHEMA)
      .map_err(|e| color_eyre::eyre::eyre!("Failed to run store migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
      capacity,
    })
  }

  /// Get the default database path.
  fn default_path() -> color_eyre::Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("gitsprint").join("store.db"))
  }

  fn lock(&self) -> MutexGuard<'_, Connection> {
    self.conn.lock().unwrap_or_else(|e| e.into_inner())
  }
}

fn backend(e: rusqlite::Error) -> StoreError {
  StoreError::Backend(e.to_string())
}

impl KeyValueStore for SqliteStore {
  fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
    let conn = self.lock();
    conn
      .query_row(
        "SELECT value FROM kv_store WHERE key = ?",
        params![key],
        |row| row.get(0),
      )
      .optional()
      .map_err(backend)
  }

  fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
    let conn = self.lock();

    if let Some(capacity) = self.capacity {
      let others: i64 = conn
        .query_row(
          "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
           FROM kv_store WHERE key != ?",
          params![key],
          |row| row.get(0),
        )
        .map_err(backend)?;
      let needed = others as usize + key.len() + value.len();
      if needed > capacity {
        return Err(StoreError::QuotaExceeded { needed, capacity });
      }
    }

    conn
      .execute(
        "INSERT OR REPLACE INTO kv_store (key, value, updated_at)
         VALUES (?, ?, datetime('now'))",
        params![key, value],
      )
      .map_err(backend)?;
    Ok(())
  }

  fn remove(&self, key: &str) -> Result<(), StoreError> {
    self
      .lock()
      .execute("DELETE FROM kv_store WHERE key = ?", params![key])
      .map_err(backend)?;
    Ok(())
  }

  fn clear(&self) -> Result<(), StoreError> {
    self
      .lock()
      .execute("DELETE FROM kv_store", [])
      .map_err(backend)?;
    Ok(())
  }
}
