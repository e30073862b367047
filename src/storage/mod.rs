//! Durable backing stores for the application snapshot.
//!
//! Two interchangeable implementations sit behind [`DataStore`]: a single JSON
//! file ([`FileStore`]) used by the desktop shell, and a SQLite record with a
//! flat key/value fallback ([`EmbeddedStore`]) for sandboxed installs. The
//! backend is chosen once by [`open_backend`].

pub mod embedded;
pub mod file;
pub mod kv;

use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{Config, StorageMode};
use crate::models::AppData;

pub use embedded::EmbeddedStore;
pub use file::FileStore;
pub use kv::KvStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    SqliteError(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Failed to create data directory {path:?}: {source}")]
    DirectoryError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Load/save capability shared by both storage modes.
///
/// Neither method fails: problems are logged, `load` reports them as "no
/// data" and `save` as `false`. Implementations are called from blocking
/// worker threads, never from the mutation path.
pub trait DataStore: Send + Sync {
    /// Raw persisted payload, `None` when nothing has been stored yet
    fn load(&self) -> Option<Value>;

    /// Replace the persisted snapshot; `false` on any failure
    fn save(&self, data: &AppData) -> bool;

    /// Preserve a payload that was loaded but could not be normalized, so
    /// the next save does not destroy it. `false` when nothing was kept.
    fn keep_unreadable(&self, _raw: &Value) -> bool {
        false
    }

    /// Where the data lives, for diagnostics
    fn describe(&self) -> String;
}

/// Create the backend selected by the configuration
pub fn open_backend(config: &Config) -> Arc<dyn DataStore> {
    let data_dir = config.get_data_dir();
    match config.storage {
        StorageMode::HostFile => {
            let store = FileStore::new(&data_dir);
            log::info!("Using host file storage at {}", store.data_path().display());
            Arc::new(store)
        }
        StorageMode::Sandboxed => {
            let store = EmbeddedStore::new(&data_dir);
            log::info!("Using embedded storage at {}", store.describe());
            Arc::new(store)
        }
    }
}

/// Create `dir` (and parents) if it does not exist yet
pub(crate) fn ensure_dir(dir: &std::path::Path) -> Result<(), StorageError> {
    if !dir.exists() {
        std::fs::create_dir_all(dir).map_err(|source| StorageError::DirectoryError {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    Ok(())
}
