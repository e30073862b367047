use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};

use super::{DataStore, StorageError, ensure_dir};
use crate::models::AppData;

/// Sub-directory of the data dir holding the snapshot file
pub const DATA_DIR_NAME: &str = "track-data";
pub const DATA_FILE_NAME: &str = "data.json";
/// Extension given to a data file that could not be read
pub const UNREADABLE_EXTENSION: &str = "json.corrupt";

/// Host-file storage: the whole snapshot in one pretty-printed JSON file
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    path: PathBuf,
}

impl FileStore {
    pub fn new(data_dir: &Path) -> Self {
        let dir = data_dir.join(DATA_DIR_NAME);
        let path = dir.join(DATA_FILE_NAME);
        Self { dir, path }
    }

    pub fn data_path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot file.
    ///
    /// A missing or unparsable file yields an empty payload rather than an error.
    pub fn load_data(&self) -> Value {
        match self.read_file() {
            Ok(Some(value)) => value,
            Ok(None) => empty_payload(),
            Err(e) => {
                log::warn!("Error loading data from {}: {}", self.path.display(), e);
                empty_payload()
            }
        }
    }

    /// Overwrite the snapshot file, returning `false` on failure
    pub fn save_data(&self, data: &AppData) -> bool {
        match self.write_file(data) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Error saving data to {}: {}", self.path.display(), e);
                false
            }
        }
    }

    /// Where an unreadable snapshot is moved before it can be overwritten
    pub fn unreadable_path(&self) -> PathBuf {
        self.path.with_extension(UNREADABLE_EXTENSION)
    }

    fn read_file(&self) -> Result<Option<Value>, StorageError> {
        ensure_dir(&self.dir)?;
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let target = self.unreadable_path();
                match fs::rename(&self.path, &target) {
                    Ok(()) => log::warn!("Moved unreadable data file to {}", target.display()),
                    Err(rename_err) => log::warn!(
                        "Failed to move unreadable data file to {}: {}",
                        target.display(),
                        rename_err
                    ),
                }
                Err(e.into())
            }
        }
    }

    fn write_file(&self, data: &AppData) -> Result<(), StorageError> {
        ensure_dir(&self.dir)?;
        let contents = serde_json::to_string_pretty(data)?;

        // Write next to the target and rename so readers never see a torn file
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn write_unreadable(&self, raw: &Value) -> Result<PathBuf, StorageError> {
        ensure_dir(&self.dir)?;
        let target = self.unreadable_path();
        fs::write(&target, serde_json::to_string_pretty(raw)?)?;
        Ok(target)
    }
}

impl DataStore for FileStore {
    fn load(&self) -> Option<Value> {
        Some(self.load_data())
    }

    fn save(&self, data: &AppData) -> bool {
        self.save_data(data)
    }

    fn keep_unreadable(&self, raw: &Value) -> bool {
        match self.write_unreadable(raw) {
            Ok(target) => {
                log::warn!("Kept unreadable data at {}", target.display());
                true
            }
            Err(e) => {
                log::warn!("Failed to keep unreadable data: {}", e);
                false
            }
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

fn empty_payload() -> Value {
    json!({ "projects": [], "days": {} })
}
