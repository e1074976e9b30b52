//! Key-value settings store and the typed preferences read from it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::constants::{MAX_SIZE_PERCENT, MIN_SIZE_PERCENT};

pub const KEY_ALWAYS_ON_TOP: &str = "always-on-top";
pub const KEY_REMEMBER_POSITION: &str = "remember-position";
pub const KEY_REMEMBER_SIZE: &str = "remember-size";
pub const KEY_DEFAULT_WIDTH_PERCENT: &str = "default-width-percent";
pub const KEY_DEFAULT_HEIGHT_PERCENT: &str = "default-height-percent";
pub const KEY_DEBUG_MODE: &str = "debug-mode";
pub const KEY_SAVED_PANES: &str = "saved-panes";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings store is read-only")]
    ReadOnly,
}

pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError>;
}

/// In-memory store. Can be switched read-only to exercise write failures.
#[derive(Debug, Default, Clone)]
pub struct MemorySettings {
    values: BTreeMap<String, Value>,
    read_only: bool,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        if self.read_only {
            return Err(SettingsError::ReadOnly);
        }
        self.values.insert(key.to_string(), value);
        Ok(())
    }
}

/// Settings persisted as a single JSON object. Every write replaces the
/// whole file through a temporary sibling and a rename.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    values: Map<String, Value>,
}

impl JsonFileSettings {
    /// Open `path`, treating a missing file as empty.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let values = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Map::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| SettingsError::Json {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        Ok(Self { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self) -> Result<(), SettingsError> {
        let io_err = |source| SettingsError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let text = serde_json::to_string_pretty(&self.values).map_err(|source| {
            SettingsError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)
    }
}

impl SettingsStore for JsonFileSettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> Result<(), SettingsError> {
        self.values.insert(key.to_string(), value);
        self.write()
    }
}

/// `<config dir>/float-panes/settings.json`.
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("float-panes").join("settings.json"))
}

/// Preferences the manager reads from the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneSettings {
    pub always_on_top: bool,
    pub remember_position: bool,
    pub remember_size: bool,
    pub default_width_percent: u8,
    pub default_height_percent: u8,
    pub debug_mode: bool,
}

impl Default for PaneSettings {
    fn default() -> Self {
        Self {
            always_on_top: true,
            remember_position: true,
            remember_size: true,
            default_width_percent: 70,
            default_height_percent: 70,
            debug_mode: false,
        }
    }
}

impl PaneSettings {
    /// Read every key, falling back to the default for missing or
    /// mistyped values.
    pub fn load(store: &dyn SettingsStore) -> Self {
        let defaults = Self::default();
        Self {
            always_on_top: read_bool(store, KEY_ALWAYS_ON_TOP, defaults.always_on_top),
            remember_position: read_bool(store, KEY_REMEMBER_POSITION, defaults.remember_position),
            remember_size: read_bool(store, KEY_REMEMBER_SIZE, defaults.remember_size),
            default_width_percent: read_percent(
                store,
                KEY_DEFAULT_WIDTH_PERCENT,
                defaults.default_width_percent,
            ),
            default_height_percent: read_percent(
                store,
                KEY_DEFAULT_HEIGHT_PERCENT,
                defaults.default_height_percent,
            ),
            debug_mode: read_bool(store, KEY_DEBUG_MODE, defaults.debug_mode),
        }
    }
}

fn read_bool(store: &dyn SettingsStore, key: &str, default: bool) -> bool {
    match store.get(key) {
        None => default,
        Some(Value::Bool(value)) => value,
        Some(other) => {
            tracing::warn!(key, value = %other, "expected a boolean setting, using default");
            default
        }
    }
}

fn read_percent(store: &dyn SettingsStore, key: &str, default: u8) -> u8 {
    match store.get(key).map(|value| value.as_i64().ok_or(value)) {
        None => default,
        Some(Ok(value)) => {
            let clamped = value.clamp(i64::from(MIN_SIZE_PERCENT), i64::from(MAX_SIZE_PERCENT));
            if clamped != value {
                tracing::warn!(key, value, clamped, "size percent out of range");
            }
            clamped as u8
        }
        Some(Err(other)) => {
            tracing::warn!(key, value = %other, "expected an integer setting, using default");
            default
        }
    }
}
