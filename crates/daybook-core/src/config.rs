//! Daybook Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for development. Environment values always win
//! over file values.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable pointing at an optional TOML config file
pub const CONFIG_PATH_VAR: &str = "DAYBOOK_CONFIG";

/// Longest accepted token lifetime (ten years)
pub const MAX_TOKEN_TTL_HOURS: u64 = 24 * 365 * 10;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Document store connection
    pub database: DatabaseConfig,

    /// Token signing and password hashing
    pub auth: AuthConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration the way the server binary does:
    /// TOML file from `DAYBOOK_CONFIG` if set, then environment overrides,
    /// then validation of required values.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(path)?.with_env_override()?,
            Err(_) => Self::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_env(|key| std::env::var(key).ok())
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup.
    ///
    /// Only keys the lookup returns are applied; everything else keeps its
    /// current value.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }
        if let Some(origins) = lookup("CORS_ORIGINS") {
            self.server.cors_origins = origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // Document store
        if let Some(url) = lookup("DB_URI") {
            self.database.url = url;
        }
        if let Some(user) = lookup("DB_USER") {
            self.database.username = user;
        }
        if let Some(pass) = lookup("DB_PASS") {
            self.database.password = pass;
        }
        if let Some(ns) = lookup("DB_NAMESPACE") {
            self.database.namespace = ns;
        }
        if let Some(name) = lookup("DB_NAME") {
            self.database.database = name;
        }
        if let Some(secs) = lookup("DB_QUERY_TIMEOUT_SECS") {
            self.database.query_timeout_secs = parse_value("DB_QUERY_TIMEOUT_SECS", secs)?;
        }

        // Auth
        if let Some(secret) = lookup("SECRET_KEY") {
            self.auth.secret_key = secret;
        }
        if let Some(hours) = lookup("ACCESS_TOKEN_TTL_HOURS") {
            self.auth.access_token_ttl_hours = parse_value("ACCESS_TOKEN_TTL_HOURS", hours)?;
        }
        if let Some(hours) = lookup("REFRESH_TOKEN_TTL_HOURS") {
            self.auth.refresh_token_ttl_hours = parse_value("REFRESH_TOKEN_TTL_HOURS", hours)?;
        }
        if let Some(kib) = lookup("PASSWORD_MEMORY_KIB") {
            self.auth.password_memory_kib = parse_value("PASSWORD_MEMORY_KIB", kib)?;
        }
        if let Some(cost) = lookup("PASSWORD_TIME_COST") {
            self.auth.password_time_cost = parse_value("PASSWORD_TIME_COST", cost)?;
        }
        if let Some(threads) = lookup("PASSWORD_PARALLELISM") {
            self.auth.password_parallelism = parse_value("PASSWORD_PARALLELISM", threads)?;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(json) = lookup("LOG_JSON") {
            self.logging.json_format = parse_value("LOG_JSON", json)?;
        }

        Ok(self)
    }

    /// Check that values without a usable default are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.secret_key.trim().is_empty() {
            return Err(ConfigError::MissingRequired("SECRET_KEY".to_string()));
        }
        for (key, hours) in [
            ("ACCESS_TOKEN_TTL_HOURS", self.auth.access_token_ttl_hours),
            ("REFRESH_TOKEN_TTL_HOURS", self.auth.refresh_token_ttl_hours),
        ] {
            if !(1..=MAX_TOKEN_TTL_HOURS).contains(&hours) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: hours.to_string(),
                });
            }
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Allowed origins for CORS (empty means any origin)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_origins: vec![],
        }
    }
}

/// Document store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SurrealDB WebSocket URL
    pub url: String,

    /// SurrealDB username
    pub username: String,

    /// SurrealDB password
    pub password: String,

    /// SurrealDB namespace
    pub namespace: String,

    /// SurrealDB database name
    pub database: String,

    /// Upper bound for every single query, in seconds
    pub query_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8001".to_string(),
            username: "root".to_string(),
            password: "root".to_string(),
            namespace: "daybook".to_string(),
            database: "daybook".to_string(),
            query_timeout_secs: 100,
        }
    }
}

/// Token signing and password hashing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared HMAC secret used to sign and verify every token
    pub secret_key: String,

    /// Access token lifetime in hours
    pub access_token_ttl_hours: u64,

    /// Refresh token lifetime in hours
    pub refresh_token_ttl_hours: u64,

    /// Argon2 memory cost in KiB
    pub password_memory_kib: u32,

    /// Argon2 iterations
    pub password_time_cost: u32,

    /// Argon2 lanes
    pub password_parallelism: u32,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            access_token_ttl_hours: 24,
            refresh_token_ttl_hours: 168,
            password_memory_kib: 65536, // 64 MB
            password_time_cost: 3,
            password_parallelism: 4,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
