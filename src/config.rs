use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

pub const SIDEBAR_WIDTH_MIN: u16 = 200;
pub const SIDEBAR_WIDTH_MAX: u16 = 480;
pub const NOTES_HEIGHT_MIN: u16 = 80;
pub const NOTES_HEIGHT_MAX: u16 = 600;

/// Which durable store backs the application data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageMode {
    /// Single JSON file managed by the host process
    HostFile,
    /// Embedded database with a flat legacy slot
    Sandboxed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_storage")]
    pub storage: StorageMode,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

/// UI preferences, kept outside the application data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "default_sidebar_width")]
    pub sidebar_width: u16,
    #[serde(default = "default_notes_height")]
    pub notes_height: u16,
    #[serde(default)]
    pub onboarding_seen: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: default_storage(),
            data_dir: default_data_dir(),
            persist_debounce_ms: default_persist_debounce_ms(),
            preferences: Preferences::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            dark_mode: false,
            sidebar_width: default_sidebar_width(),
            notes_height: default_notes_height(),
            onboarding_seen: false,
        }
    }
}

impl Preferences {
    /// Flip dark mode and return the new value
    pub fn toggle_dark_mode(&mut self) -> bool {
        self.dark_mode = !self.dark_mode;
        self.dark_mode
    }

    pub fn set_sidebar_width(&mut self, width: u16) {
        self.sidebar_width = width.clamp(SIDEBAR_WIDTH_MIN, SIDEBAR_WIDTH_MAX);
    }

    pub fn set_notes_height(&mut self, height: u16) {
        self.notes_height = height.clamp(NOTES_HEIGHT_MIN, NOTES_HEIGHT_MAX);
    }
}

// Default value functions
fn default_storage() -> StorageMode {
    StorageMode::HostFile
}

fn default_data_dir() -> String {
    // This is a fallback - actual profile will be determined at load time
    Config::default_data_dir_for_profile(utils::Profile::Prod)
}

fn default_persist_debounce_ms() -> u64 {
    150
}

fn default_sidebar_width() -> u16 {
    280
}

fn default_notes_height() -> u16 {
    200
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and data paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;

            // Dev and prod data never mix, even if the file names another dir
            if profile == utils::Profile::Dev {
                config.data_dir = Self::default_data_dir_for_profile(profile);
            }

            Ok(config)
        } else {
            // Create default config and save it
            let mut config = Config::default();
            config.data_dir = Self::default_data_dir_for_profile(profile);
            if let Err(e) = config.save_with_profile(profile) {
                log::error!("Failed to save config file {:?}: {}", config_path, e);
                return Err(e);
            }
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save_with_profile(&mut self, profile: utils::Profile) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        let config_path = Self::get_config_path(profile)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default data directory for a specific profile
    fn default_data_dir_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.to_string_lossy().to_string()
        } else {
            // Fallback paths - platform-specific
            #[cfg(target_os = "macos")]
            {
                match profile {
                    utils::Profile::Dev => "~/Library/Application Support/track-dev".to_string(),
                    utils::Profile::Prod => "~/Library/Application Support/track".to_string(),
                }
            }
            #[cfg(not(target_os = "macos"))]
            {
                match profile {
                    utils::Profile::Dev => "~/.local/share/track-dev".to_string(),
                    utils::Profile::Prod => "~/.local/share/track".to_string(),
                }
            }
        }
    }

    /// Get the expanded data directory (with ~ expansion)
    pub fn get_data_dir(&self) -> PathBuf {
        utils::expand_path(&self.data_dir)
    }

    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }
}
