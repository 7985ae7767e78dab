//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub datasource: DatasourceConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Which flavor of the backend's HTTP API to speak
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendMode {
    /// Self-hosted backend: SQL text body, optional basic auth
    #[default]
    Private,
    /// Managed cloud backend: JSON body with an API key
    Cloud,
}

/// Backend connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatasourceConfig {
    #[serde(default = "default_host")]
    pub host: String,

    /// Port of the backend's HTTP endpoint; zero picks 443/80 by scheme
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub enable_https: bool,

    #[serde(default)]
    pub mode: BackendMode,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub tenant: String,

    /// Backend-side parallelism hint; zero means backend default
    #[serde(default)]
    pub target_partitions: u32,

    #[serde(default)]
    pub use_chunked_response: bool,

    /// API key for cloud mode
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub use_basic_auth: bool,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    8902
}

fn default_database() -> String {
    "public".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            enable_https: false,
            mode: BackendMode::default(),
            database: default_database(),
            tenant: String::new(),
            target_partitions: 0,
            use_chunked_response: false,
            api_key: String::new(),
            use_basic_auth: false,
            user: String::new(),
            password: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl DatasourceConfig {
    /// The backend's base URL, derived from scheme, host and port
    pub fn base_url(&self) -> String {
        if self.enable_https {
            let port = if self.port == 0 { 443 } else { self.port };
            format!("https://{}:{}", self.host, port)
        } else {
            let port = if self.port == 0 { 80 } else { self.port };
            format!("http://{}:{}", self.host, port)
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("timegrid").join("config.toml")),
            Some(PathBuf::from("/etc/timegrid/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("TIMEGRID_HOST") {
            self.datasource.host = host;
        }
        if let Ok(port) = std::env::var("TIMEGRID_PORT") {
            if let Ok(p) = port.parse() {
                self.datasource.port = p;
            }
        }
        if let Ok(database) = std::env::var("TIMEGRID_DATABASE") {
            self.datasource.database = database;
        }
        if let Ok(tenant) = std::env::var("TIMEGRID_TENANT") {
            self.datasource.tenant = tenant;
        }
        if let Ok(api_key) = std::env::var("TIMEGRID_API_KEY") {
            self.datasource.api_key = api_key;
        }
        if let Ok(user) = std::env::var("TIMEGRID_USER") {
            self.datasource.use_basic_auth = true;
            self.datasource.user = user;
        }
        if let Ok(password) = std::env::var("TIMEGRID_PASSWORD") {
            self.datasource.password = password;
        }

        if let Ok(level) = std::env::var("TIMEGRID_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("TIMEGRID_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# Timegrid Configuration
#
# Environment variables override these settings:
# - TIMEGRID_HOST
# - TIMEGRID_PORT
# - TIMEGRID_DATABASE
# - TIMEGRID_TENANT
# - TIMEGRID_API_KEY
# - TIMEGRID_USER / TIMEGRID_PASSWORD
# - TIMEGRID_LOG_LEVEL
# - TIMEGRID_LOG_FORMAT

[datasource]
# Backend host and HTTP port
host = "localhost"
port = 8902

# Use HTTPS for backend connections
enable_https = false

# Backend API flavor: "private" (SQL text body, optional basic auth)
# or "cloud" (JSON body with api_key)
mode = "private"

# Database to query
database = "public"

# Optional tenant
tenant = ""

# Backend-side parallelism hint (0 = backend default)
target_partitions = 0

# Request chunked responses from the backend
use_chunked_response = false

# API key (cloud mode only)
api_key = ""

# Basic auth credentials (private mode only)
use_basic_auth = false
user = ""
password = ""

# Request timeout in seconds
request_timeout_secs = 30

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.datasource.host, "localhost");
        assert_eq!(config.datasource.port, 8902);
        assert_eq!(config.datasource.mode, BackendMode::Private);
        assert_eq!(config.datasource.database, "public");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_base_url() {
        let mut ds = DatasourceConfig::default();
        assert_eq!(ds.base_url(), "http://localhost:8902");

        ds.enable_https = true;
        ds.port = 0;
        assert_eq!(ds.base_url(), "https://localhost:443");

        ds.enable_https = false;
        assert_eq!(ds.base_url(), "http://localhost:80");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[datasource]
host = "db.example.com"
port = 31007
mode = "cloud"
api_key = "secret"

[logging]
level = "debug"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.datasource.host, "db.example.com");
        assert_eq!(config.datasource.port, 31007);
        assert_eq!(config.datasource.mode, BackendMode::Cloud);
        assert_eq!(config.datasource.api_key, "secret");
        assert_eq!(config.logging.level, "debug");
        // Untouched sections keep their defaults
        assert_eq!(config.datasource.database, "public");
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not toml at all [").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_generated_default_config_parses() {
        let config: Config = toml::from_str(&generate_default_config()).unwrap();
        assert_eq!(config.datasource.port, 8902);
    }
}
