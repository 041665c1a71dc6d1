//! Configuration management
//!
//! Bootstrap configuration comes from an optional TOML file with built-in
//! defaults for every field, overridable from the command line.
//!
//! Priority: CLI arguments > TOML file > built-in defaults.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Complete application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to SQLite database file (relative or absolute)
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Authentication configuration (token signing, seed credentials)
    #[serde(default)]
    pub auth: AuthConfig,

    /// Enqueue rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign access tokens
    #[serde(default = "default_secret_key")]
    pub secret_key: String,

    /// Token lifetime in minutes
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,

    /// Seeded admin account
    #[serde(default = "default_admin_username")]
    pub admin_username: String,
    #[serde(default = "default_admin_password")]
    pub admin_password: String,

    /// Password granting the host role without a stored account
    #[serde(default = "default_host_password")]
    pub host_password: String,

    /// Shared password granting the user role without a stored account
    #[serde(default = "default_shared_user_password")]
    pub shared_user_password: String,
}

/// Sliding-window rate limit for enqueue requests
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum enqueues per actor within the window
    #[serde(default = "default_rate_limit_count")]
    pub max_count: usize,

    /// Window length in seconds
    #[serde(default = "default_rate_limit_window_seconds")]
    pub window_seconds: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("jukebox.db")
}

fn default_port() -> u16 {
    5730
}

fn default_secret_key() -> String {
    "dev-secret-change-me".to_string()
}

fn default_token_ttl_minutes() -> i64 {
    60 * 24
}

fn default_admin_username() -> String {
    "admin".to_string()
}

fn default_admin_password() -> String {
    "admin1234".to_string()
}

fn default_host_password() -> String {
    "host1234".to_string()
}

fn default_shared_user_password() -> String {
    "jukebox1234".to_string()
}

fn default_rate_limit_count() -> usize {
    10
}

fn default_rate_limit_window_seconds() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: default_secret_key(),
            token_ttl_minutes: default_token_ttl_minutes(),
            admin_username: default_admin_username(),
            admin_password: default_admin_password(),
            host_password: default_host_password(),
            shared_user_password: default_shared_user_password(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_count: default_rate_limit_count(),
            window_seconds: default_rate_limit_window_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            port: default_port(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub port: Option<u16>,
}

impl Config {
    /// Load configuration from an optional TOML file plus CLI overrides
    ///
    /// A missing file path means built-in defaults for everything.
    pub async fn load(toml_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match toml_path {
            Some(path) => {
                let toml_str = tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::Config(format!("failed to read config file {:?}: {}", path, e))
                })?;
                let config: Config = toml::from_str(&toml_str)
                    .map_err(|e| Error::Config(format!("failed to parse TOML: {}", e)))?;
                info!("Loaded configuration from {:?}", path);
                config
            }
            None => Config::default(),
        };

        if let Some(database_path) = overrides.database_path {
            config.database_path = database_path;
        }
        if let Some(port) = overrides.port {
            config.port = port;
        }

        Ok(config)
    }
}
