//! Daybook Core - configuration shared by the Daybook crates
//!
//! Holds the application configuration tree and its loaders:
//! - Server binding and CORS settings
//! - Document store connection settings
//! - Token signing and password hashing parameters
//! - Logging settings

pub mod config;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig,
    MAX_TOKEN_TTL_HOURS,
};
