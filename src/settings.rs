//! Persistent settings
//!
//! Well-known object names, the content and ledger roots, and the remembered
//! player name. Stored as `settings.json` in the user config directory;
//! anything missing or unreadable falls back to defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::storage::{LocalStorage, StorageError};

/// Application directory name under the platform config/data dirs
pub const APP_DIR: &str = "soyboy";

/// Settings file name inside the config directory
pub const SETTINGS_FILE: &str = "settings.json";

/// Well-known names the pipeline looks up in the world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneNames {
    /// Parent of every placed level item
    pub container: String,
    /// The player object
    pub player: String,
    /// The primary view anchor (main camera)
    pub view_anchor: String,
}

impl Default for SceneNames {
    fn default() -> Self {
        Self {
            container: "Level".to_string(),
            player: "SoyBoy".to_string(),
            view_anchor: "Main Camera".to_string(),
        }
    }
}

/// Settings that survive between sessions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory scanned for level descriptors
    pub content_root: PathBuf,
    /// Per-user writable directory for score ledgers
    pub ledger_root: PathBuf,
    /// Descriptor file extension, without the dot
    pub descriptor_extension: String,
    pub names: SceneNames,
    /// Last player name entered (empty = none yet)
    pub player_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("assets/levels"),
            ledger_root: default_ledger_root(),
            descriptor_extension: "ron".to_string(),
            names: SceneNames::default(),
            player_name: String::new(),
        }
    }
}

/// `<data dir>/soyboy/scores`, or `./scores` when there is no data dir
pub fn default_ledger_root() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scores")
}

/// `<config dir>/soyboy/settings.json`
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join(SETTINGS_FILE)
}

impl Settings {
    /// Load settings from the default location
    pub fn load() -> Self {
        Self::load_from(default_settings_path())
    }

    /// Load settings from `path`, or return defaults if it is missing or broken
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let storage = LocalStorage::new();

        match storage.read_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(settings) => {
                    log::info!("Loaded settings from {}", path.display());
                    settings
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(e) if e.is_not_found() => {
                log::info!("No settings at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}, using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write settings as pretty JSON, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StorageError::Io(format!("failed to serialize settings: {}", e)))?;
        LocalStorage::new().write(path, json.as_bytes())
    }
}
