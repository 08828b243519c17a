//! Configuration loading
//!
//! TOML bootstrap config with a small, fixed surface: remote API base URL,
//! session token, log filter. Settings resolution priority:
//!
//! 1. Command-line arguments
//! 2. Environment variables (handled by clap's env fallbacks in the binary)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Built-in default for the remote API base URL
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Built-in default tracing filter
pub const DEFAULT_LOG_FILTER: &str = "inshad=info";

/// Bootstrap configuration loaded from a TOML file.
///
/// These settings cannot change during a run; all fields are optional and
/// fall back to built-in defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    /// Remote conversion service base URL
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Session token for authenticated endpoints
    #[serde(default)]
    pub token: Option<String>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LoggingConfig {
    /// EnvFilter directive, e.g. "inshad=debug"
    #[serde(default)]
    pub filter: Option<String>,
}

impl TomlConfig {
    /// Platform default config file path (`<config dir>/inshad/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("inshad").join("config.toml"))
    }

    /// Load from an explicit path; the file must exist and parse
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
    }

    /// Load from the default path, falling back to built-in defaults when the
    /// file is absent. A present-but-broken file is a hard error.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) if path.exists() => {
                debug!("Loading config from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Fully resolved settings after merging CLI arguments over file config
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_base_url: String,
    pub token: Option<String>,
    pub log_filter: String,
}

impl Settings {
    /// Merge CLI-provided overrides (which already absorbed env vars via
    /// clap) over file config, then built-in defaults.
    pub fn resolve(
        cli_base_url: Option<String>,
        cli_token: Option<String>,
        config: &TomlConfig,
    ) -> Self {
        let api_base_url = cli_base_url
            .or_else(|| config.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());
        let token = cli_token.or_else(|| config.token.clone());
        let log_filter = config
            .logging
            .filter
            .clone()
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
        Self {
            api_base_url,
            token,
            log_filter,
        }
    }
}
