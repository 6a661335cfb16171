//! apibind Configuration System
//!
//! Provides configuration management for the binding engine:
//! - Project configuration (apibind.toml)
//! - Global user configuration (~/.apibind/config.toml)
//! - Configuration precedence and merging
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Global config (~/.apibind/config.toml)
//! 2. Project config (./apibind.toml)
//! 3. Environment variables (APIBIND_*)
//! 4. Explicit declaration options
//!
//! # Example
//!
//! ```no_run
//! use apibind_config::ConfigLoader;
//! use std::path::Path;
//!
//! let mut loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! println!("default libraries: {:?}", config.libraries());
//! ```

pub mod global;
pub mod loader;
pub mod project;

use std::path::PathBuf;
use thiserror::Error;

/// Libraries searched when neither configuration nor a declaration names any
pub const DEFAULT_LIBRARIES: &[&str] = &["user32", "kernel32"];

/// Output buffer capacity (in characters) used by the string-return adapters
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Calling convention names accepted in configuration files
pub const CONVENTIONS: &[&str] = &["system", "c"];

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Home directory not found")]
    HomeNotFound,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use global::GlobalConfig;
pub use loader::{Config, ConfigLoader};
pub use project::{BindingConfig, LoaderConfig, ProjectConfig};
