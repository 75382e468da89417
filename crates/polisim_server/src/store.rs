//! Sqlite-backed cache store: the persistence capability injected into
//! the core cache layer.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension};

use polisim_core::cache::CacheStore;
use polisim_core::error::StoreError;

fn init_db(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS cache_entries (
            key TEXT PRIMARY KEY,
            payload BLOB NOT NULL,
            written_at TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// Entries are content-addressed and never mutated: a replace carries
/// an identical payload by determinism of the pipeline, so
/// last-writer-wins is safe across concurrent workers.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        init_db(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl CacheStore for SqliteStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError(e.to_string()))?;
        conn.query_row(
            "SELECT payload FROM cache_entries WHERE key = ?1",
            [key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| StoreError(e.to_string()))
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let conn = self.conn.lock().map_err(|e| StoreError(e.to_string()))?;
        let now = jiff::Timestamp::now().to_string();
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries (key, payload, written_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now],
        )
        .map_err(|e| StoreError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_payloads() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(dir.path().join("cache.db")).unwrap();

        assert_eq!(store.read("missing").unwrap(), None);
        store.write("k1", b"payload").unwrap();
        assert_eq!(store.read("k1").unwrap(), Some(b"payload".to_vec()));

        // Replacement is last-writer-wins.
        store.write("k1", b"payload2").unwrap();
        assert_eq!(store.read("k1").unwrap(), Some(b"payload2".to_vec()));
    }
}
