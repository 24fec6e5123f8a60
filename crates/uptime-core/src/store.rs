//! Persistence for [`MonitorConfig`].
//!
//! Stores expose a fallible `read`/`write` pair and the infallible
//! `load`/`save` wrappers the rest of the crate uses: a missing or broken
//! file yields the default configuration, a failed save is logged and the
//! in-memory state stays authoritative.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::MonitorConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("No config found at {location}")]
    NotFound { location: String },
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub trait ConfigStore: Send + Sync {
    /// Where this store keeps its data, for log lines.
    fn location(&self) -> String;

    fn read(&self) -> Result<MonitorConfig, StoreError>;

    fn write(&self, config: &MonitorConfig) -> Result<(), StoreError>;

    /// Read the persisted config, substituting the default on any failure.
    fn load(&self) -> MonitorConfig {
        match self.read() {
            Ok(config) => {
                info!(
                    location = %self.location(),
                    targets = config.targets.len(),
                    "Loaded monitor config"
                );
                config
            }
            Err(StoreError::NotFound { .. }) => {
                info!(location = %self.location(), "No persisted config, using defaults");
                MonitorConfig::default()
            }
            Err(e) => {
                warn!(location = %self.location(), error = %e, "Failed to load config, using defaults");
                MonitorConfig::default()
            }
        }
    }

    /// Best-effort write. Failures are logged, never returned.
    fn save(&self, config: &MonitorConfig) {
        match self.write(config) {
            Ok(()) => debug!(location = %self.location(), "Config saved"),
            Err(e) => warn!(location = %self.location(), error = %e, "Failed to save config"),
        }
    }
}

pub fn decode(text: &str) -> Result<MonitorConfig, StoreError> {
    let config: MonitorConfig = serde_json::from_str(text)?;
    config.validate().map_err(StoreError::Invalid)?;
    Ok(config)
}

pub fn encode(config: &MonitorConfig) -> Result<String, StoreError> {
    Ok(serde_json::to_string_pretty(config)?)
}

/// UTF-8 JSON file on local disk. Writes go to a sibling `.tmp` file that is
/// renamed over the target, so readers never see a half-written config.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.clone().into_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl ConfigStore for JsonFileStore {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    fn read(&self) -> Result<MonitorConfig, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    location: self.location(),
                })
            }
            Err(e) => return Err(self.io_error(e)),
        };
        decode(&text)
    }

    fn write(&self, config: &MonitorConfig) -> Result<(), StoreError> {
        let text = encode(config)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let tmp = self.temp_path();
        std::fs::write(&tmp, text.as_bytes()).map_err(|e| self.io_error(e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        Ok(())
    }
}

/// In-process store holding the serialized text. Used by `check` runs that
/// must not touch disk, and by tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    contents: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contents(text: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(text.into())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ConfigStore for MemoryStore {
    fn location(&self) -> String {
        "memory".into()
    }

    fn read(&self) -> Result<MonitorConfig, StoreError> {
        match self.contents() {
            Some(text) => decode(&text),
            None => Err(StoreError::NotFound {
                location: self.location(),
            }),
        }
    }

    fn write(&self, config: &MonitorConfig) -> Result<(), StoreError> {
        let text = encode(config)?;
        *self
            .contents
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(text);
        Ok(())
    }
}
