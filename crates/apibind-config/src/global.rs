//! Global Configuration (~/.apibind/config.toml)
//!
//! Handles user-level configuration stored in `~/.apibind/config.toml`.
//! Uses the same sections as `apibind.toml`; project values win.

use crate::project::{BindingConfig, LoaderConfig};
use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Global user configuration from ~/.apibind/config.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    /// Declaration defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingConfig>,

    /// Library search settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderConfig>,
}

impl GlobalConfig {
    /// Load global configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the global configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(binding) = &self.binding {
            binding.validate("binding")?;
        }
        Ok(())
    }

    /// Get the global config file path (~/.apibind/config.toml)
    pub fn global_config_path() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".apibind").join("config.toml"))
    }

    /// Merge another global config into this one
    /// Other config takes precedence for non-None values
    pub fn merge(&mut self, other: &GlobalConfig) {
        if other.binding.is_some() {
            self.binding = other.binding.clone();
        }
        if other.loader.is_some() {
            self.loader = other.loader.clone();
        }
    }
}
