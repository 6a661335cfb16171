//! Configuration Loader
//!
//! Handles loading and merging configuration from multiple sources with proper precedence.

use crate::global::GlobalConfig;
use crate::project::ProjectConfig;
use crate::{ConfigError, ConfigResult, DEFAULT_BUFFER_CAPACITY, DEFAULT_LIBRARIES};
use std::env;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = "apibind.toml";

/// Configuration loader
///
/// Loads configuration from multiple sources and merges them with proper precedence:
/// 1. Global config (~/.apibind/config.toml) - lowest priority
/// 2. Project config (./apibind.toml) - overrides global
/// 3. Environment variables (APIBIND_*) - overrides project
/// 4. Declaration options - highest priority (handled by the engine)
pub struct ConfigLoader {
    /// Cached global config path
    global_config_path: Option<PathBuf>,
}

/// Merged configuration result
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Project configuration (with environment overrides applied)
    pub project: ProjectConfig,

    /// Global configuration
    pub global: GlobalConfig,

    /// Project root directory (where apibind.toml was found)
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            global_config_path: None,
        }
    }

    /// Create a loader that reads the global config from `path` instead of the home directory
    pub fn with_global_path(path: PathBuf) -> Self {
        Self {
            global_config_path: Some(path),
        }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find apibind.toml, then loads and merges
    /// global config if it exists.
    pub fn load_from_directory(&mut self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project_config) = self.find_project_config(start_dir)?;

        // Global config is optional
        let global_config = self.load_global_config().unwrap_or_default();

        let project_config = self.apply_env_overrides(project_config)?;

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Load configuration from a specific project config file
    pub fn load_from_file(&mut self, config_path: &Path) -> ConfigResult<Config> {
        let project_config = ProjectConfig::load_from_file(config_path)?;
        let global_config = self.load_global_config().unwrap_or_default();
        let project_config = self.apply_env_overrides(project_config)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config {
            project: project_config,
            global: global_config,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    ///
    /// Returns (project_root, project_config); no file means default config
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(PROJECT_CONFIG_FILE);

            if config_path.exists() {
                let project_config = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project_config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }

    /// Load global configuration from ~/.apibind/config.toml
    fn load_global_config(&mut self) -> ConfigResult<GlobalConfig> {
        let path = match &self.global_config_path {
            Some(path) => path.clone(),
            None => {
                let path = GlobalConfig::global_config_path()?;
                self.global_config_path = Some(path.clone());
                path
            }
        };

        if !path.exists() {
            return Ok(GlobalConfig::default());
        }

        GlobalConfig::load_from_file(&path)
    }

    /// Apply environment variable overrides to project config
    ///
    /// - APIBIND_LIBRARIES: comma separated library set
    /// - APIBIND_BUFFER_CAPACITY: string buffer capacity
    /// - APIBIND_SEARCH_PATH: platform path list prepended to search paths
    fn apply_env_overrides(&self, mut config: ProjectConfig) -> ConfigResult<ProjectConfig> {
        if let Ok(libraries) = env::var("APIBIND_LIBRARIES") {
            let libraries: Vec<String> = libraries
                .split(',')
                .map(|lib| lib.trim().to_string())
                .filter(|lib| !lib.is_empty())
                .collect();
            if !libraries.is_empty() {
                config.binding_mut().libraries = Some(libraries);
            }
        }

        if let Ok(capacity) = env::var("APIBIND_BUFFER_CAPACITY") {
            let capacity = capacity
                .trim()
                .parse::<usize>()
                .map_err(|e| ConfigError::InvalidValue {
                    field: "APIBIND_BUFFER_CAPACITY".to_string(),
                    reason: e.to_string(),
                })?;
            config.binding_mut().buffer_capacity = Some(capacity);
        }

        if let Some(paths) = env::var_os("APIBIND_SEARCH_PATH") {
            let mut search_paths: Vec<PathBuf> = env::split_paths(&paths).collect();
            let loader = config.loader_mut();
            search_paths.append(&mut loader.search_paths);
            loader.search_paths = search_paths;
        }

        config.validate()?;
        Ok(config)
    }

    /// Get the global configuration directory (~/.apibind)
    pub fn global_config_dir() -> ConfigResult<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::HomeNotFound)?;
        Ok(home.join(".apibind"))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Effective library set (project > global > built-in default)
    pub fn libraries(&self) -> Vec<String> {
        self.project
            .libraries()
            .or_else(|| {
                self.global
                    .binding
                    .as_ref()
                    .and_then(|b| b.libraries.as_deref())
            })
            .map(|libs| libs.to_vec())
            .unwrap_or_else(|| DEFAULT_LIBRARIES.iter().map(|s| s.to_string()).collect())
    }

    /// Effective string buffer capacity
    pub fn buffer_capacity(&self) -> usize {
        self.project
            .buffer_capacity()
            .or_else(|| self.global.binding.as_ref().and_then(|b| b.buffer_capacity))
            .unwrap_or(DEFAULT_BUFFER_CAPACITY)
    }

    /// Effective calling convention name
    pub fn convention(&self) -> &str {
        self.project
            .convention()
            .or_else(|| {
                self.global
                    .binding
                    .as_ref()
                    .and_then(|b| b.convention.as_deref())
            })
            .unwrap_or("system")
    }

    /// Search paths, project entries first
    pub fn search_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.project.search_paths().to_vec();
        if let Some(loader) = &self.global.loader {
            paths.extend(loader.search_paths.iter().cloned());
        }
        paths
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a project config file was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }
}
