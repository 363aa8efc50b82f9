//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. A `.env` file is read first when present.

use serde::{Deserialize, Serialize};
use std::env;

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// HTTP server port
    pub port: u16,

    /// SQLite database file
    pub db_path: String,

    /// Maximum pooled connections
    pub db_max_connections: u32,

    /// JWT secret key for verifying tokens
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds (tokens minted by tooling/tests)
    pub jwt_access_lifetime_secs: i64,

    /// Emit JSON log lines instead of human-readable ones
    pub log_json: bool,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = ApiConfig {
            port: env::var("CHAIRSIDE_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHAIRSIDE_PORT".to_string()))?,

            db_path: env::var("CHAIRSIDE_DB_PATH")
                .unwrap_or_else(|_| "./chairside.db".to_string()),

            db_max_connections: env::var("CHAIRSIDE_DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHAIRSIDE_DB_MAX_CONNECTIONS".to_string()))?,

            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    // In production, this MUST be set via environment variable
                    "chairside-dev-secret-change-in-production".to_string()
                }),

            jwt_access_lifetime_secs: env::var("JWT_ACCESS_LIFETIME_SECS")
                .unwrap_or_else(|_| "3600".to_string()) // 1 hour
                .parse()
                .map_err(|_| ConfigError::InvalidValue("JWT_ACCESS_LIFETIME_SECS".to_string()))?,

            log_json: env::var("CHAIRSIDE_LOG_JSON")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("CHAIRSIDE_LOG_JSON".to_string()))?,
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "CHAIRSIDE_DB_MAX_CONNECTIONS".to_string(),
            ));
        }
        if config.jwt_secret.is_empty() {
            return Err(ConfigError::MissingRequired("JWT_SECRET".to_string()));
        }

        Ok(config)
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}
