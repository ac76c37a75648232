// Application settings
// Loaded from ~/.config/pxlog/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Playback
    /// Replays longer than this many records run on a worker thread
    #[serde(rename = "playback.offloadThreshold")]
    pub offload_threshold: u64,

    #[serde(rename = "playback.defaultStep")]
    pub default_step: i64,

    #[serde(rename = "playback.tickMillis")]
    pub tick_millis: u64,

    // Snapshots
    /// Records between automatically built snapshots
    #[serde(rename = "snapshot.interval")]
    pub snapshot_interval: u64,

    // Palette
    #[serde(rename = "palette.path")]
    pub palette_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            offload_threshold: 20_000,
            default_step: 100,
            tick_millis: 16,
            snapshot_interval: 250_000,
            palette_path: None,
        }
    }
}

/// Drop lines starting with `//` so the file can carry comments.
fn strip_comments(contents: &str) -> String {
    contents
        .lines()
        .filter(|line| !line.trim().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pxlog");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, falling back to defaults
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("{}; using default settings", e);
                Self::default()
            }
        }
    }

    /// Load settings from an explicit path. Missing keys take their defaults.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let contents = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let settings = serde_json::from_str(&strip_comments(&contents))?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let write_err = |source| ConfigError::Write { path: path.to_path_buf(), source };

        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(write_err)
    }
}
