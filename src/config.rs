//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub use crate::backend::{BackendConfig, TableNames};

/// Longest accepted session lifetime (30 days)
pub const MAX_SESSION_TTL_MINUTES: i64 = 30 * 24 * 60;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Mark cookies `Secure` (enable behind HTTPS)
    #[serde(default)]
    pub cookie_secure: bool,

    /// Origins allowed to call the JSON API; empty means same-origin only
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cookie_secure: false,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Create config with custom host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Session lifetime settings
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_minutes")]
    pub ttl_minutes: i64,

    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

fn default_ttl_minutes() -> i64 {
    8 * 60
}

fn default_purge_interval() -> u64 {
    300
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_minutes: default_ttl_minutes(),
            purge_interval_secs: default_purge_interval(),
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

    /// First existing config file among the default locations
    pub fn find_default() -> Option<PathBuf> {
        let config_paths = [
            dirs::config_dir().map(|p| p.join("biportal").join("config.toml")),
            Some(PathBuf::from("/etc/biportal/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        config_paths.into_iter().flatten().find(|path| path.exists())
    }

    /// Load `path` with environment overrides, or the environment alone
    /// when there is no file. A file that cannot be read or parsed is an
    /// error, never a silent fallback.
    pub fn load_or_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_with_env(path),
            None => Ok(Self::from_env()),
        }
    }

    /// Check settings the server cannot start without
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::Missing("backend.url (BIPORTAL_SUPABASE_URL)"));
        }
        if self.backend.anon_key.trim().is_empty() {
            return Err(ConfigError::Missing("backend.anon_key (BIPORTAL_SUPABASE_KEY)"));
        }
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&self.session.ttl_minutes) {
            return Err(ConfigError::Invalid(format!(
                "session.ttl_minutes must be between 1 and {}, got {}",
                MAX_SESSION_TTL_MINUTES, self.session.ttl_minutes
            )));
        }
        if self.session.purge_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "session.purge_interval_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Server overrides
        if let Some(host) = var("BIPORTAL_HOST") {
            self.server.host = host;
        }
        if let Some(port) = var("BIPORTAL_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Some(secure) = var("BIPORTAL_COOKIE_SECURE") {
            self.server.cookie_secure = secure.to_lowercase() != "false" && secure != "0";
        }

        // Backend overrides
        if let Some(url) = var("BIPORTAL_SUPABASE_URL") {
            self.backend.url = url;
        }
        if let Some(key) = var("BIPORTAL_SUPABASE_KEY") {
            self.backend.anon_key = key;
        }

        // Logging overrides
        if let Some(level) = var("BIPORTAL_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("BIPORTAL_LOG_FORMAT") {
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

    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# biportal Configuration
#
# Environment variables override these settings:
# - BIPORTAL_HOST
# - BIPORTAL_PORT
# - BIPORTAL_COOKIE_SECURE
# - BIPORTAL_SUPABASE_URL
# - BIPORTAL_SUPABASE_KEY
# - BIPORTAL_LOG_LEVEL
# - BIPORTAL_LOG_FORMAT

[server]
# Portal host
host = "0.0.0.0"

# Portal port
port = 8080

# Mark cookies Secure (set to true behind HTTPS)
cookie_secure = false

# Origins allowed to call the JSON API
cors_origins = []

[backend]
# Supabase project URL
url = "https://your-project.supabase.co"

# Supabase anon (public) key
anon_key = ""

# Request timeout in milliseconds
request_timeout_ms = 10000

[backend.tables]
dashboards = "dashboards"
profiles = "usuarios"
roles = "user_roles"
permissions = "user_dashboard_permissions"

[session]
# Session lifetime in minutes
ttl_minutes = 480

# How often expired sessions are purged (seconds)
purge_interval_secs = 300

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}
