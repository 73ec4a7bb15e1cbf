use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

use crate::store::{KeyValueStore, StoreResult};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS kv_store (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL
)";

pub fn default_database_path() -> Result<PathBuf> {
    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("Neither HOME nor USERPROFILE is set")?;
    let path = PathBuf::from(home).join(".shopaudit").join("shopaudit.db");

    info!(action = "resolve", component = "database_path", path = ?path, "Database path resolved");
    Ok(path)
}

/// Device-local key/value store backed by a single SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let start_time = Instant::now();
        info!(action = "start", component = "database_open", path = ?path, "Opening store database");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory {:?}", parent))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;
        let store = Self::init(conn)?;

        info!(
            action = "complete",
            component = "database_open",
            duration_ms = start_time.elapsed().as_millis(),
            "Store database ready"
        );
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create kv_store table")?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        debug!(action = "get", component = "sqlite_store", key, found = value.is_some(), "Read key");
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        // Single statement upsert: the row is replaced as a whole or not at all.
        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        debug!(action = "set", component = "sqlite_store", key, bytes = value.len(), "Wrote key");
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let removed = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        debug!(action = "delete", component = "sqlite_store", key, removed, "Deleted key");
        Ok(())
    }
}
