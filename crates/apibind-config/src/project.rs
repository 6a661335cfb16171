//! Project Configuration (apibind.toml)
//!
//! Handles project-level configuration stored in `apibind.toml` at the project root.

use crate::{ConfigError, ConfigResult, CONVENTIONS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Project configuration from apibind.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Declaration defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<BindingConfig>,

    /// Library search settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loader: Option<LoaderConfig>,
}

/// Declaration defaults shared by every declaration that does not override them
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct BindingConfig {
    /// Library set searched when a declaration names none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub libraries: Option<Vec<String>>,

    /// Character capacity of string-return buffers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_capacity: Option<usize>,

    /// Calling convention ("system" or "c")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convention: Option<String>,
}

/// Library search settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Extra directories searched before the platform defaults
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub search_paths: Vec<PathBuf>,
}

impl ProjectConfig {
    /// Load project configuration from a file
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

    /// Validate the project configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(binding) = &self.binding {
            binding.validate("binding")?;
        }
        Ok(())
    }

    /// Configured library set, if any
    pub fn libraries(&self) -> Option<&[String]> {
        self.binding
            .as_ref()
            .and_then(|b| b.libraries.as_deref())
    }

    /// Configured buffer capacity, if any
    pub fn buffer_capacity(&self) -> Option<usize> {
        self.binding.as_ref().and_then(|b| b.buffer_capacity)
    }

    /// Configured calling convention, if any
    pub fn convention(&self) -> Option<&str> {
        self.binding.as_ref().and_then(|b| b.convention.as_deref())
    }

    /// Configured search paths (empty when unset)
    pub fn search_paths(&self) -> &[PathBuf] {
        self.loader
            .as_ref()
            .map(|l| l.search_paths.as_slice())
            .unwrap_or(&[])
    }

    /// Get or create the `[binding]` section
    pub fn binding_mut(&mut self) -> &mut BindingConfig {
        self.binding.get_or_insert_with(BindingConfig::default)
    }

    /// Get or create the `[loader]` section
    pub fn loader_mut(&mut self) -> &mut LoaderConfig {
        self.loader.get_or_insert_with(LoaderConfig::default)
    }
}

impl BindingConfig {
    /// Validate the section; `section` prefixes field names in errors
    pub(crate) fn validate(&self, section: &str) -> ConfigResult<()> {
        if let Some(libraries) = &self.libraries {
            if libraries.iter().any(|lib| lib.trim().is_empty()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.libraries", section),
                    reason: "library names cannot be empty".to_string(),
                });
            }
        }

        if self.buffer_capacity == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: format!("{}.buffer_capacity", section),
                reason: "capacity must be greater than zero".to_string(),
            });
        }

        if let Some(convention) = &self.convention {
            if !CONVENTIONS.contains(&convention.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("{}.convention", section),
                    reason: format!("must be 'system' or 'c', got '{}'", convention),
                });
            }
        }

        Ok(())
    }
}
