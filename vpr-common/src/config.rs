//! Configuration loading and data folder resolution
//!
//! Settings come from four tiers, highest priority first:
//! 1. Command-line argument
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::model::Quotas;
use crate::{Error, Result};

/// Environment variable overriding the data folder
pub const DATA_DIR_ENV: &str = "VPR_DATA_DIR";

/// Environment variable overriding the prompt source folder
pub const SOURCE_DIR_ENV: &str = "VPR_SOURCE_DIR";

/// Bootstrap configuration loaded from TOML
///
/// Every field is optional; anything absent falls through to the compiled
/// defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Bind address for the HTTP server
    #[serde(default)]
    pub host: Option<String>,

    /// HTTP server port
    #[serde(default)]
    pub port: Option<u16>,

    /// Folder holding the database and recordings
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Folder holding the JSONL/TXT prompt sources
    #[serde(default)]
    pub source_dir: Option<PathBuf>,

    /// `*` or comma-separated list of allowed origins
    #[serde(default)]
    pub cors_origins: Option<String>,

    /// Request body cap for uploads
    #[serde(default)]
    pub max_upload_bytes: Option<usize>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-language category maxima
    #[serde(default)]
    pub quotas: Quotas,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Platform config file location: `<config_dir>/voxprivacy/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("voxprivacy").join("config.toml"))
}

/// Parse TOML config text
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// Load the TOML config
///
/// An explicitly requested file must exist. The platform default file is
/// optional: when missing, a warning is logged and defaults are used.
pub fn load_toml_config(explicit: Option<&Path>) -> Result<TomlConfig> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            path.to_path_buf()
        }
        None => match default_config_path() {
            Some(path) if path.exists() => path,
            other => {
                warn!(
                    "No config file found{}; using defaults",
                    other
                        .map(|p| format!(" at {}", p.display()))
                        .unwrap_or_default()
                );
                return Ok(TomlConfig::default());
            }
        },
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config = parse_toml_config(&content)?;
    info!("Loaded config file: {}", path.display());
    Ok(config)
}

/// Resolve the data folder
///
/// Priority: CLI argument → `env_var_name` → TOML `data_dir` → OS default.
pub fn resolve_data_dir(cli_arg: Option<&Path>, env_var_name: &str, toml: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &toml.data_dir {
        return path.clone();
    }

    default_data_dir()
}

/// Resolve the prompt source folder
///
/// Priority: CLI argument → `env_var_name` → TOML `source_dir` → `<data_dir>/source`.
pub fn resolve_source_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    toml: &TomlConfig,
    data_dir: &Path,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    toml.source_dir
        .clone()
        .unwrap_or_else(|| data_dir.join("source"))
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("voxprivacy"))
        .unwrap_or_else(|| PathBuf::from("./voxprivacy_data"))
}

/// Split a CORS origin setting; `*` means any origin
pub fn parse_cors_origins(value: &str) -> Vec<String> {
    if value.trim() == "*" {
        return vec!["*".to_string()];
    }
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(String::from)
        .collect()
}
