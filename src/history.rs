//! Chat history persistence
//!
//! A small key-value store holding one serialized transcript per product.
//! Values are opaque strings here; parsing and validation live with the
//! conversation that owns the key.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS chat_history (
    key TEXT PRIMARY KEY NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Storage unavailable: {0}")]
    Io(#[from] std::io::Error),
}

pub type HistoryResult<T> = Result<T, HistoryError>;

/// Key-value storage for saved transcripts
///
/// Missing keys are not an error: `get` returns `None`.
pub trait HistoryStore: Send + Sync {
    /// # Errors
    ///
    /// Fails when the backing store cannot be read.
    fn get(&self, key: &str) -> HistoryResult<Option<String>>;

    /// # Errors
    ///
    /// Fails when the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> HistoryResult<()>;

    /// # Errors
    ///
    /// Fails when the backing store cannot be written.
    fn remove(&self, key: &str) -> HistoryResult<()>;
}

impl<T: HistoryStore + ?Sized> HistoryStore for Arc<T> {
    fn get(&self, key: &str) -> HistoryResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> HistoryResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        (**self).remove(key)
    }
}

/// Thread-safe SQLite-backed history store
#[derive(Clone)]
pub struct HistoryDb {
    conn: Arc<Mutex<Connection>>,
}

impl HistoryDb {
    /// Open or create the database at the given path, creating parent directories
    ///
    /// # Errors
    ///
    /// Fails when the directory or database cannot be created.
    pub fn open<P: AsRef<Path>>(path: P) -> HistoryResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database
    ///
    /// # Errors
    ///
    /// Fails when SQLite cannot create the database.
    pub fn open_in_memory() -> HistoryResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn run_migrations(&self) -> HistoryResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Keys with a saved transcript, most recently written first
    ///
    /// # Errors
    ///
    /// Fails when the query fails.
    ///
    /// # Panics
    ///
    /// Panics if the connection lock is poisoned.
    pub fn keys(&self) -> HistoryResult<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare("SELECT key FROM chat_history ORDER BY updated_at DESC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<Result<Vec<String>, _>>()
            .map_err(HistoryError::from)
    }
}

impl HistoryStore for HistoryDb {
    fn get(&self, key: &str) -> HistoryResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM chat_history WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> HistoryResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO chat_history (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> HistoryResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM chat_history WHERE key = ?1", params![key])?;
        Ok(())
    }
}
