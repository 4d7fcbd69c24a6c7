//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub persistence: PersistenceConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
    /// Externally reachable base URL, used to build profile image URLs
    pub public_url: String,
    /// Mount the unauthenticated `DELETE /clear/v1` reset route (default: false)
    #[serde(default)]
    pub enable_clear: bool,
}

impl ServerConfig {
    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.public_url.trim_end_matches('/')
    }
}

/// Session token configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// HMAC key for session tokens (32+ bytes)
    pub session_secret: String,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
}

/// Snapshot persistence of the social graph
#[derive(Debug, Clone, Deserialize)]
pub struct PersistenceConfig {
    /// Restore on startup and save periodically
    pub enabled: bool,
    /// JSON snapshot file
    pub path: PathBuf,
    /// Save interval in seconds (default: 60)
    pub interval_seconds: u64,
}

/// Profile image storage
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Directory served under `/static`
    pub directory: PathBuf,
    /// Largest image accepted from a remote URL
    pub max_bytes: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (DREAMS__*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.public_url", "http://localhost:8080")?
            .set_default("server.enable_clear", false)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("persistence.enabled", true)?
            .set_default("persistence.path", "data/dreams.json")?
            .set_default("persistence.interval_seconds", 60)?
            .set_default("media.directory", "static")?
            .set_default("media.max_bytes", 5 * 1024 * 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("DREAMS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    pub(crate) fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if self.auth.session_secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.persistence.enabled && self.persistence.interval_seconds == 0 {
            return Err(crate::error::AppError::Config(
                "persistence.interval_seconds must be greater than 0".to_string(),
            ));
        }

        if let Err(error) = url::Url::parse(&self.server.public_url) {
            return Err(crate::error::AppError::Config(format!(
                "server.public_url is not a valid URL: {error}"
            )));
        }

        Ok(())
    }
}
