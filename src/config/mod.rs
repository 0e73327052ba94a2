//! Persisted viewer settings.
//!
//! The config is a flat TOML record. Every field carries a serde default
//! so files written by older builds, or edited by hand, still load.

use crate::capture::CameraType;
use crate::processing::{Comparator, TemperatureUnit, PALETTE_COUNT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Directory name under the user's config root.
pub const APP_DIR: &str = "thermal-viewer";
const CONFIG_FILE: &str = "config.toml";

/// Errors from loading or saving the config.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to write config file: {0}")]
    FileWriteError(String),
    #[error("failed to parse config: {0}")]
    ParseError(String),
    #[error("failed to serialize config: {0}")]
    SerializeError(String),
}

/// Settings that survive restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub camera_type: CameraType,
    pub palette_index: usize,
    pub threshold_c: f32,
    pub threshold_mode: Comparator,
    pub auto_exposure_lock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ffc_path: Option<PathBuf>,
    pub temperature_unit: TemperatureUnit,
    pub default_threshold_c: f32,
    pub default_threshold_f: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera_type: CameraType::SeekPro,
            palette_index: 2,
            threshold_c: 30.0,
            threshold_mode: Comparator::Greater,
            auto_exposure_lock: false,
            ffc_path: None,
            temperature_unit: TemperatureUnit::Celsius,
            default_threshold_c: 30.0,
            default_threshold_f: 86.0,
        }
    }
}

impl Config {
    /// Parses a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Ok(config.sanitized())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))
    }

    /// Replaces out-of-range values with defaults.
    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.palette_index >= PALETTE_COUNT {
            tracing::warn!(
                palette_index = self.palette_index,
                "Palette index out of range, using default"
            );
            self.palette_index = defaults.palette_index;
        }
        if !self.threshold_c.is_finite() {
            self.threshold_c = defaults.threshold_c;
        }
        self
    }
}

/// Load/save capability for the config record.
pub trait ConfigStore {
    fn load(&self) -> Result<Config, ConfigError>;
    fn save(&mut self, config: &Config) -> Result<(), ConfigError>;

    /// Loads the config, falling back to defaults on any failure.
    fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Config unavailable, using defaults");
                Config::default()
            }
        }
    }
}

/// `$XDG_CONFIG_HOME/thermal-viewer`, or `~/.config/thermal-viewer`.
pub fn default_config_dir() -> PathBuf {
    let root = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."));
    root.join(APP_DIR)
}

/// Config stored as a TOML file.
#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default per-user location.
    pub fn default_location() -> Self {
        Self::new(default_config_dir().join(CONFIG_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigStore for FileConfigStore {
    /// A missing file yields the defaults.
    fn load(&self) -> Result<Config, ConfigError> {
        if !self.path.exists() {
            tracing::info!(path = %self.path.display(), "No config file, using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Config::from_toml(&content)
    }

    fn save(&mut self, config: &Config) -> Result<(), ConfigError> {
        let content = config.to_toml()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::FileWriteError(e.to_string()))?;
        }
        std::fs::write(&self.path, content)
            .map_err(|e| ConfigError::FileWriteError(e.to_string()))?;
        tracing::debug!(path = %self.path.display(), "Config saved");
        Ok(())
    }
}

/// In-memory store, mainly for tests and headless runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    config: Option<Config>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            config: Some(config),
            ..Self::default()
        }
    }

    /// Makes every subsequent save fail.
    pub fn failing(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    /// Last saved (or seeded) config.
    pub fn saved(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    pub fn save_count(&self) -> usize {
        self.saves
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<Config, ConfigError> {
        Ok(self.config.clone().unwrap_or_default())
    }

    fn save(&mut self, config: &Config) -> Result<(), ConfigError> {
        if self.fail_saves {
            return Err(ConfigError::FileWriteError("store is read-only".to_string()));
        }
        self.config = Some(config.clone());
        self.saves += 1;
        Ok(())
    }
}
