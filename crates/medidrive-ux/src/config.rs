//! Session configuration, read from TOML.
//!
//! ```toml
//! [autosave]
//! debounce_ms = 800
//!
//! [toast]
//! auto_hide_ms = 1500
//!
//! [storage]
//! data_dir = "/var/lib/medidrive"
//!
//! [logging]
//! filter = "info,medidrive_log=debug"
//! ```
//!
//! Every section and key is optional.

use medidrive_log::{FileStorage, MemoryStorage, StateStorage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("failed to parse config: {source}")]
    Parse {
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub autosave: AutosaveConfig,
    pub toast: ToastConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub debounce_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { debounce_ms: 800 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastConfig {
    /// How long the rendering layer keeps a toast visible before calling
    /// `hide`.
    pub auto_hide_ms: u64,
}

impl Default for ToastConfig {
    fn default() -> Self {
        Self { auto_hide_ms: 1500 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for persisted state. Unset keeps state in memory only.
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Parse { source })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.autosave.debounce_ms)
    }

    pub fn toast_auto_hide(&self) -> Duration {
        Duration::from_millis(self.toast.auto_hide_ms)
    }

    /// Backend selected by `storage.data_dir`.
    pub fn storage_backend(&self) -> Arc<dyn StateStorage> {
        match &self.storage.data_dir {
            Some(dir) => Arc::new(FileStorage::new(dir)),
            None => Arc::new(MemoryStorage::new()),
        }
    }
}
