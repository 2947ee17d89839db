//! Configuration system for Keymark.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `KEYMARK_SERVER_HOST` - Server bind address
//! - `KEYMARK_SERVER_PORT` - Server port
//! - `KEYMARK_DATABASE_TYPE` - Database backend ("sqlite" or "postgres")
//! - `KEYMARK_DATABASE_URL` - Database connection URL (routed to the
//!   matching backend by its scheme)
//! - `KEYMARK_LOG_LEVEL` - Log level (trace, debug, info, warn, error)
//! - `KEYMARK_LOG_FILE` - Optional log file path (stderr if unset)

use config::Config;
use serde::Deserialize;
use std::env;
use std::sync::OnceLock;

use crate::errors::{ServiceError, ServiceResult};

/// Global configuration singleton.
static CONFIG: OnceLock<KeymarkConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KeymarkConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5050,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database type: "sqlite" or "postgres"
    pub db_type: String,
    /// SQLite connection URL
    pub sqlite_url: String,
    /// PostgreSQL connection URL
    pub postgres_url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: "sqlite".to_string(),
            sqlite_url: "sqlite://keymark.db".to_string(),
            postgres_url: "postgres://localhost/keymark".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Optional log file path; logs go to stderr when unset
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl KeymarkConfig {
    /// Load configuration from file and environment.
    ///
    /// Configuration is loaded in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    fn load() -> ServiceResult<Self> {
        let builder = Config::builder()
            // Start with defaults
            .set_default("server.host", "0.0.0.0")
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_default("server.port", 5050)
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_default("database.db_type", "sqlite")
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_default("database.sqlite_url", "sqlite://keymark.db")
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_default("database.postgres_url", "postgres://localhost/keymark")
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_default("logging.level", "info")
            .map_err(|e| ServiceError::Config(e.to_string()))?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("KEYMARK_SERVER_HOST").ok())
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_override_option(
                "server.port",
                env::var("KEYMARK_SERVER_PORT")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_override_option("database.db_type", env::var("KEYMARK_DATABASE_TYPE").ok())
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_override_option(
                "database.sqlite_url",
                env::var("KEYMARK_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("sqlite")),
            )
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_override_option(
                "database.postgres_url",
                env::var("KEYMARK_DATABASE_URL")
                    .ok()
                    .filter(|url| url.starts_with("postgres")),
            )
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_override_option("logging.level", env::var("KEYMARK_LOG_LEVEL").ok())
            .map_err(|e| ServiceError::Config(e.to_string()))?
            .set_override_option("logging.file", env::var("KEYMARK_LOG_FILE").ok())
            .map_err(|e| ServiceError::Config(e.to_string()))?;

        let settings = builder
            .build()
            .map_err(|e| ServiceError::Config(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| ServiceError::Config(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.server.port == 0 {
            return Err(ServiceError::Config(
                "server.port must be greater than 0".to_string(),
            ));
        }

        match self.database.db_type.as_str() {
            "sqlite" | "postgres" => {}
            other => {
                return Err(ServiceError::Config(format!(
                    "database.db_type must be 'sqlite' or 'postgres', got '{other}'"
                )));
            }
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(ServiceError::Config(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }
}

/// Get the global configuration.
///
/// This loads the configuration on first access and caches it.
/// Returns an error if configuration loading or validation fails.
pub fn get_config() -> ServiceResult<&'static KeymarkConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = KeymarkConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is the same load.
    let _ = CONFIG.set(config.clone());

    Ok(CONFIG.get().expect("config was just set"))
}

/// Initialize configuration explicitly.
///
/// Call this early in the server binary to catch configuration errors
/// before opening any connections.
pub fn init_config() -> ServiceResult<&'static KeymarkConfig> {
    get_config()
}
