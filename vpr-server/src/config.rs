//! Server configuration
//!
//! Merges command-line/environment overrides with the TOML file and the
//! compiled defaults into one resolved `ServerConfig`.

use std::path::{Path, PathBuf};
use vpr_common::config::{
    parse_cors_origins, resolve_data_dir, resolve_source_dir, TomlConfig, DATA_DIR_ENV,
    SOURCE_DIR_ENV,
};
use vpr_common::Quotas;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// HTTP layer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpOptions {
    /// Allowed CORS origins; `["*"]` allows any
    pub cors_origins: Vec<String>,
    /// Request body cap
    pub max_upload_bytes: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            cors_origins: vec!["*".to_string()],
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Values given on the command line or through clap-managed env vars
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub source_dir: Option<PathBuf>,
    pub cors_origins: Option<String>,
}

/// Fully resolved server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub source_dir: PathBuf,
    pub http: HttpOptions,
    pub quotas: Quotas,
    pub log_level: String,
}

impl ServerConfig {
    /// Resolve every setting: CLI → ENV → TOML → default
    pub fn resolve(cli: &CliOverrides, toml: TomlConfig) -> Self {
        let data_dir = resolve_data_dir(cli.data_dir.as_deref(), DATA_DIR_ENV, &toml);
        let source_dir =
            resolve_source_dir(cli.source_dir.as_deref(), SOURCE_DIR_ENV, &toml, &data_dir);

        let cors_origins = cli
            .cors_origins
            .as_deref()
            .or(toml.cors_origins.as_deref())
            .map(parse_cors_origins)
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| HttpOptions::default().cors_origins);

        Self {
            host: cli
                .host
                .clone()
                .or(toml.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: cli.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            data_dir,
            source_dir,
            http: HttpOptions {
                cors_origins,
                max_upload_bytes: toml.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            },
            quotas: toml.quotas,
            log_level: toml.logging.level,
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("db.sqlite3")
    }

    pub fn recordings_dir(&self) -> PathBuf {
        self.data_dir.join("recordings")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_beats_toml() {
        let cli = CliOverrides {
            port: Some(9100),
            data_dir: Some(PathBuf::from("/tmp/vpr-cli")),
            source_dir: Some(PathBuf::from("/tmp/vpr-src")),
            cors_origins: Some("http://a.test,http://b.test".to_string()),
            ..Default::default()
        };
        let toml = TomlConfig {
            host: Some("127.0.0.1".to_string()),
            port: Some(9000),
            cors_origins: Some("*".to_string()),
            max_upload_bytes: Some(1024),
            ..Default::default()
        };

        let config = ServerConfig::resolve(&cli, toml);

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9100);
        assert_eq!(config.bind_address(), "127.0.0.1:9100");
        assert_eq!(config.http.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.http.max_upload_bytes, 1024);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/vpr-cli/db.sqlite3"));
        assert_eq!(config.recordings_dir(), PathBuf::from("/tmp/vpr-cli/recordings"));
        assert_eq!(config.source_dir(), Path::new("/tmp/vpr-src"));
    }

    #[test]
    fn test_defaults() {
        let cli = CliOverrides {
            data_dir: Some(PathBuf::from("/tmp/vpr-defaults")),
            source_dir: Some(PathBuf::from("/tmp/vpr-defaults/source")),
            ..Default::default()
        };
        let config = ServerConfig::resolve(&cli, TomlConfig::default());

        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.http, HttpOptions::default());
        assert_eq!(config.quotas.total(), 60);
        assert_eq!(config.log_level, "info");
    }
}
