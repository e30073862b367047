use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::{DataStore, KvStore, StorageError, ensure_dir};
use crate::models::AppData;

pub const DB_FILE_NAME: &str = "track.db";
/// Fixed key holding the entire snapshot in the `app_data` table
pub const SNAPSHOT_KEY: &str = "data";
/// Key under which a snapshot that could not be read is kept aside
pub const UNREADABLE_KEY: &str = "data.unreadable";
/// Legacy flat slot that predates the database
pub const LEGACY_KEY: &str = "track-data";

/// Sandboxed storage: one SQLite record, mirrored into a flat legacy slot
pub struct EmbeddedStore {
    db_path: PathBuf,
    conn: Mutex<Option<Connection>>,
    legacy: KvStore,
}

impl EmbeddedStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            db_path: data_dir.join(DB_FILE_NAME),
            conn: Mutex::new(None),
            legacy: KvStore::new(data_dir),
        }
    }

    pub fn legacy(&self) -> &KvStore {
        &self.legacy
    }

    /// Run `f` against the connection, opening it first if needed.
    ///
    /// A failed open leaves the slot empty so the next call retries.
    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut slot = self.conn.lock().unwrap_or_else(|e| e.into_inner());
        let conn = match slot.take() {
            Some(conn) => conn,
            None => Self::open(&self.db_path)?,
        };
        let result = f(&conn);
        *slot = Some(conn);
        result
    }

    /// Open or create the database and its single table
    fn open(db_path: &Path) -> Result<Connection, StorageError> {
        if let Some(parent) = db_path.parent() {
            ensure_dir(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS app_data (
                key             TEXT PRIMARY KEY,
                value           TEXT NOT NULL
            )",
            [],
        )?;
        Ok(conn)
    }

    fn read_primary(&self) -> Result<Option<Value>, StorageError> {
        let Some(raw) = self.read_record(SNAPSHOT_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Keep the text before the next save replaces it
                if let Err(keep_err) = self.write_record(UNREADABLE_KEY, &raw) {
                    log::warn!("Failed to keep unreadable record: {}", keep_err);
                }
                Err(e.into())
            }
        }
    }

    fn write_record(&self, key: &str, json: &str) -> Result<(), StorageError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO app_data (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                rusqlite::params![key, json],
            )?;
            Ok(())
        })
    }

    /// Raw text stored under `key`, if any
    pub fn read_record(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT value FROM app_data WHERE key = ?1",
                    rusqlite::params![key],
                    |row| row.get(0),
                )
                .optional()?)
        })
    }

    fn read_legacy(&self) -> Option<Value> {
        let raw = match self.legacy.get(LEGACY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to read legacy data slot: {}", e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Legacy data slot is not valid JSON: {}", e);
                None
            }
        }
    }
}

impl DataStore for EmbeddedStore {
    fn load(&self) -> Option<Value> {
        match self.read_primary() {
            Ok(Some(value)) => return Some(value),
            Ok(None) => {}
            Err(e) => log::warn!("Failed to read {}: {}", self.db_path.display(), e),
        }

        // One-time migration from the legacy slot into the database
        let value = self.read_legacy()?;
        log::info!("Adopting data from legacy slot '{}'", LEGACY_KEY);
        if let Err(e) = self.write_record(SNAPSHOT_KEY, &value.to_string()) {
            log::warn!("Failed to copy legacy data into {}: {}", self.db_path.display(), e);
        }
        Some(value)
    }

    fn save(&self, data: &AppData) -> bool {
        let json = match serde_json::to_string(data) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize data: {}", e);
                return false;
            }
        };

        let saved = match self.write_record(SNAPSHOT_KEY, &json) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Failed to save to {}: {}", self.db_path.display(), e);
                false
            }
        };

        // Best-effort backup copy
        if let Err(e) = self.legacy.set(LEGACY_KEY, &json) {
            log::debug!("Legacy mirror write failed: {}", e);
        }

        saved
    }

    fn keep_unreadable(&self, raw: &Value) -> bool {
        match self.write_record(UNREADABLE_KEY, &raw.to_string()) {
            Ok(()) => {
                log::warn!("Kept unreadable data under key '{}'", UNREADABLE_KEY);
                true
            }
            Err(e) => {
                log::warn!("Failed to keep unreadable data: {}", e);
                false
            }
        }
    }

    fn describe(&self) -> String {
        self.db_path.display().to_string()
    }
}
