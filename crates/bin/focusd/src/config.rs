//! Configuration loading: a TOML file with environment variable overrides.
//!
//! Looks for `focusd.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use std::path::PathBuf;

use propbus_adapter_storage_file::{ConfigLocation, FileConfigStore, StorageError};
use propbus_app::services::config_service::SnapshotPolicy;
use propbus_domain::id::DeviceName;
use serde::Deserialize;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device identity.
    pub device: DeviceConfig,
    /// Where device configuration is persisted.
    pub storage: StorageConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Simulator behaviour.
    pub simulator: SimulatorConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Name announced to clients and used to key the stored configuration.
    pub name: String,
}

/// Config store location.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Fixed configuration file. Wins over `directory`.
    pub path: Option<PathBuf>,
    /// Directory holding `<device>_config.toml`; `~/.propbus` when unset.
    pub directory: Option<PathBuf>,
    /// When the fallback copy is rewritten.
    pub default_snapshot: SnapshotPolicy,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Restore the stored configuration before serving clients.
    pub load_config_on_start: bool,
}

impl Config {
    /// Load configuration from `focusd.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or the
    /// result does not validate.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("focusd.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(val) = var("FOCUSD_DEVICE") {
            self.device.name = val;
        }
        if let Some(val) = var("PROPBUS_CONFIG") {
            self.storage.path = Some(PathBuf::from(val));
        }
        if let Some(val) = var("FOCUSD_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.device_name()?;
        Ok(())
    }

    /// The validated device name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] for names that cannot key a
    /// configuration file.
    pub fn device_name(&self) -> Result<DeviceName, ConfigError> {
        DeviceName::new(self.device.name.as_str())
            .map_err(|err| ConfigError::Validation(format!("device name: {err}")))
    }

    /// Build the file config store.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NoHomeDirectory`] when neither a path nor a
    /// directory is configured and the home directory is unknown.
    pub fn config_store(&self) -> Result<FileConfigStore, StorageError> {
        if let Some(path) = &self.storage.path {
            return Ok(FileConfigStore::new(ConfigLocation::File(path.clone())));
        }
        match &self.storage.directory {
            Some(dir) => Ok(FileConfigStore::new(ConfigLocation::Directory(dir.clone()))),
            None => FileConfigStore::in_home(),
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: "Focuser Simulator".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "focusd=info,propbus_app=info,propbus_adapter_focuser_sim=info".to_string(),
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}
