// linkshelf Config Loader
// Loads the store configuration from a JSON file, falling back to defaults
// when the file is absent, then applies environment overrides.

use std::fs;
use std::path::{Path, PathBuf};

use crate::types::config::StoreConfig;
use crate::types::errors::ConfigError;

/// Environment variable that overrides `data_dir`.
pub const DATA_DIR_ENV: &str = "LINKSHELF_DATA_DIR";

/// Default config file name inside the working directory.
pub const CONFIG_FILE_NAME: &str = "linkshelf.json";

/// Trait defining the config loader interface.
pub trait ConfigLoaderTrait {
    fn load(&self) -> Result<StoreConfig, ConfigError>;
    fn save(&self, config: &StoreConfig) -> Result<(), ConfigError>;
    fn get_config_path(&self) -> &Path;
}

/// Loads `StoreConfig` from a JSON file on disk.
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Creates a new ConfigLoader.
    ///
    /// If `path_override` is `Some`, uses that path for the config file.
    /// Otherwise, uses `linkshelf.json` in the working directory.
    pub fn new(path_override: Option<String>) -> Self {
        let config_path = match path_override {
            Some(p) => PathBuf::from(p),
            None => PathBuf::from(CONFIG_FILE_NAME),
        };
        Self { config_path }
    }
}

/// Applies environment overrides through `lookup`, so tests can supply their
/// own environment. A blank value is ignored.
pub fn apply_env_overrides<F>(mut config: StoreConfig, lookup: F) -> StoreConfig
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(DATA_DIR_ENV).filter(|d| !d.trim().is_empty()) {
        config.data_dir = PathBuf::from(dir);
    }
    config
}

impl ConfigLoaderTrait for ConfigLoader {
    /// Loads the config file, applies `LINKSHELF_DATA_DIR`, and validates.
    ///
    /// A missing file yields the defaults. A malformed file or an invalid
    /// value is an error.
    fn load(&self) -> Result<StoreConfig, ConfigError> {
        let config = if self.config_path.exists() {
            let content = fs::read_to_string(&self.config_path)
                .map_err(|e| ConfigError::Io(format!("Failed to read config file: {}", e)))?;
            serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("Failed to parse config file: {}", e)))?
        } else {
            tracing::debug!(path = %self.config_path.display(), "no config file; using defaults");
            StoreConfig::default()
        };

        let config = apply_env_overrides(config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Writes `config` as pretty JSON, creating parent directories.
    fn save(&self, config: &StoreConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.config_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ConfigError::Io(format!("Failed to create config directory: {}", e))
                })?;
            }
        }

        let json = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))?;

        fs::write(&self.config_path, json)
            .map_err(|e| ConfigError::Io(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    fn get_config_path(&self) -> &Path {
        &self.config_path
    }
}
