//! sqlite-adapter: SQLite implementation of the `LocalStorage` port.
//!
//! Purpose
//! - Provide a durable, file-based key space so the record stores survive
//!   process restarts (the analogue of browser local storage).
//! - Each collection is one row: the storage key and its serialized JSON array.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Writes replace the whole value; there is no per-record schema.

use std::path::Path;
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use domain::{CoreError, LocalStorage};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

/// SQLite-backed key space.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        let conn = Connection::open(path).map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Private in-memory database; handy for tests and throwaway runs.
    pub fn in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().map_err(map_sqerr)?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open at `path`, creating parent directories first.
    pub fn open_creating_dirs<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            let _ = std::fs::create_dir_all(dir);
        }
        Self::new(path)
    }

    /// Keys currently stored, sorted.
    pub fn keys(&self) -> Result<Vec<String>, CoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key FROM kv_store ORDER BY key")
            .map_err(map_sqerr)?;
        let mut rows = stmt.query([]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            out.push(row.get::<_, String>(0).map_err(map_sqerr)?);
        }
        Ok(out)
    }

    /// Last write time of `key`, if present.
    pub fn updated_at(&self, key: &str) -> Result<Option<SystemTime>, CoreError> {
        let conn = self.lock()?;
        let secs: Option<i64> = conn
            .query_row(
                "SELECT updated_at FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sqerr)?;
        Ok(secs.map(|s| secs_to_system_time(s as u64)))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, CoreError> {
        self.conn
            .lock()
            .map_err(|_| CoreError::Storage("mutex poisoned".into()))
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        );
        "#,
    )
    .map_err(map_sqerr)?;
    Ok(())
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Storage(format!("sqlite error: {e}"))
}

fn system_time_to_secs(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs()
}

fn secs_to_system_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

impl LocalStorage for SqliteStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(map_sqerr)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO kv_store(key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, system_time_to_secs(SystemTime::now()) as i64],
        )
        .map_err(map_sqerr)?;
        debug!(%key, bytes = value.len(), "sqlite kv write");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::store::RecordStore;
    use domain::{CollectionConfig, Record};

    fn tmp_db() -> (SqliteStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.db");
        let storage = SqliteStorage::new(path).unwrap();
        (storage, dir)
    }

    #[test]
    fn set_get_roundtrip() {
        let (storage, _dir) = tmp_db();
        assert_eq!(storage.get_item("bookings").unwrap(), None);
        storage.set_item("bookings", r#"[{"bookingId":"B1"}]"#).unwrap();
        assert_eq!(
            storage.get_item("bookings").unwrap().as_deref(),
            Some(r#"[{"bookingId":"B1"}]"#)
        );
        assert!(storage.updated_at("bookings").unwrap().is_some());
        assert!(storage.updated_at("missing").unwrap().is_none());
    }

    #[test]
    fn set_replaces_existing_value() {
        let (storage, _dir) = tmp_db();
        storage.set_item("purchaseOrders", "[]").unwrap();
        storage.set_item("purchaseOrders", "[{}]").unwrap();
        assert_eq!(storage.get_item("purchaseOrders").unwrap().as_deref(), Some("[{}]"));
        assert_eq!(storage.keys().unwrap(), vec!["purchaseOrders".to_string()]);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("records.db");
        {
            let storage = SqliteStorage::open_creating_dirs(&path).unwrap();
            storage.set_item("bookings", "[1]").unwrap();
        }
        let reopened = SqliteStorage::new(&path).unwrap();
        assert_eq!(reopened.get_item("bookings").unwrap().as_deref(), Some("[1]"));
    }

    #[tokio::test]
    async fn record_store_over_sqlite() {
        let store = RecordStore::new(SqliteStorage::in_memory().unwrap(), CollectionConfig::bookings());
        let rec = Record::new()
            .with("bookingId", "BK-1")
            .with("status", "pending");
        assert!(store.append(rec.clone()).await.success);
        assert!(store.update_status("BK-1", "confirmed").await.success);

        let all = store.load().await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status(), Some("confirmed"));
        assert_eq!(store.storage().keys().unwrap(), vec!["bookings".to_string()]);
    }
}
