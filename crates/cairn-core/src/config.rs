//! Configuration parsing.
//!
//! Settings load from a TOML file (`cairn.toml` by default); every section
//! and field has a default so a missing file yields a working development
//! configuration. The server binary applies CLI overrides on top.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholder secret baked into the defaults. The server warns loudly at
/// startup when it is still in use.
pub const DEV_TOKEN_SECRET: &str = "cairn-dev-secret-do-not-deploy";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,

    #[serde(default)]
    pub activity: ActivityConfig,
}

impl Config {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a field fails validation.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_secret.is_empty() {
            return Err(ConfigError::Validation(
                "auth.token_secret must not be empty".to_string(),
            ));
        }
        if self.pagination.max_limit == 0 || self.pagination.default_limit == 0 {
            return Err(ConfigError::Validation(
                "pagination limits must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// True while the baked-in development secret is still configured.
    #[must_use]
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.token_secret == DEV_TOKEN_SECRET
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

fn default_bind() -> SocketAddr {
    ([127, 0, 0, 1], 8080).into()
}

/// SQLite settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("cairn.db")
}

/// Token settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_token_secret")]
    pub token_secret: String,

    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: default_token_secret(),
            token_ttl_hours: default_token_ttl_hours(),
        }
    }
}

fn default_token_secret() -> String {
    DEV_TOKEN_SECRET.to_string()
}

const fn default_token_ttl_hours() -> i64 {
    24
}

/// List-endpoint pagination bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_limit")]
    pub default_limit: u64,

    #[serde(default = "default_max_limit")]
    pub max_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_page_limit(),
            max_limit: default_max_limit(),
        }
    }
}

const fn default_page_limit() -> u64 {
    10
}

const fn default_max_limit() -> u64 {
    100
}

/// Activity recorder settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Bound of the fire-and-forget queue; entries offered while it is
    /// full are dropped with a warning.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self { queue_capacity: default_queue_capacity() }
    }
}

const fn default_queue_capacity() -> usize {
    1024
}
