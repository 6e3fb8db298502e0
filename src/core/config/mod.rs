//! core::config
//!
//! Engine configuration loading.
//!
//! # Locations
//!
//! Searched in order by [`load_default`]:
//! 1. `$GITDOJO_CONFIG` if set
//! 2. `<config dir>/gitdojo/config.toml` (e.g. `~/.config/gitdojo/config.toml`)
//!
//! A missing file is not an error; defaults apply.
//!
//! # Example
//!
//! ```no_run
//! use gitdojo::core::config;
//!
//! let loaded = config::load_default().unwrap();
//! println!("author: {}", loaded.config.author());
//! ```

pub mod schema;

pub use schema::{AuthorConfig, ClockConfig, EngineConfig};

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "GITDOJO_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Result of loading configuration.
#[derive(Debug, Clone)]
pub struct ConfigLoadResult {
    /// The loaded configuration.
    pub config: EngineConfig,
    /// Where it came from, if a file was found.
    pub path: Option<PathBuf>,
}

/// Load from the default locations.
///
/// # Errors
///
/// Returns an error if a config file exists but cannot be read, parsed, or
/// validated.
pub fn load_default() -> Result<ConfigLoadResult, ConfigError> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return load(&path);
        }
        tracing::warn!(path = %path.display(), "{} points at a missing file, using defaults", CONFIG_ENV);
    }

    if let Some(path) = default_path() {
        if path.exists() {
            return load(&path);
        }
    }

    Ok(ConfigLoadResult {
        config: EngineConfig::default(),
        path: None,
    })
}

/// Load and validate a specific file.
pub fn load(path: &Path) -> Result<ConfigLoadResult, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = parse(&contents).map_err(|e| match e {
        ConfigError::ParseError { message, .. } => ConfigError::ParseError {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })?;
    tracing::debug!(path = %path.display(), "loaded engine config");
    Ok(ConfigLoadResult {
        config,
        path: Some(path.to_path_buf()),
    })
}

/// Parse and validate TOML text.
pub fn parse(contents: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
        path: PathBuf::new(),
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

/// `<config dir>/gitdojo/config.toml`.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("gitdojo").join("config.toml"))
}
