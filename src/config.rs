//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use crate::engine::RetryPolicy;
use crate::token::TokenKind;

/// Upper bound on access token lifetime (one year)
pub const MAX_ACCESS_TOKEN_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Secret used by the token maker, at least 32 bytes
    pub token_symmetric_key: String,

    pub token_kind: TokenKind,

    /// Lifetime of issued access tokens
    pub access_token_duration: Duration,

    /// Attempts per transfer before a conflict is surfaced
    pub transfer_max_attempts: u32,

    /// First backoff delay between transfer attempts
    pub transfer_retry_base_delay: Duration,

    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::MissingEnv(key));
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let database_url = required("DATABASE_URL")?;

        let database_max_connections = or_default("DATABASE_MAX_CONNECTIONS", "10")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = or_default("HOST", "127.0.0.1");

        let port = or_default("PORT", "3000")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = or_default("ENVIRONMENT", "development");

        let token_symmetric_key = required("TOKEN_SYMMETRIC_KEY")?;

        let token_kind = or_default("TOKEN_KIND", "paseto")
            .parse()
            .map_err(|_| ConfigError::InvalidValue("TOKEN_KIND"))?;

        let access_token_duration = or_default("ACCESS_TOKEN_DURATION_SECS", "900")
            .parse::<u64>()
            .ok()
            .filter(|secs| (1..=MAX_ACCESS_TOKEN_DURATION_SECS).contains(secs))
            .map(Duration::from_secs)
            .ok_or(ConfigError::InvalidValue("ACCESS_TOKEN_DURATION_SECS"))?;

        let transfer_max_attempts = or_default("TRANSFER_MAX_ATTEMPTS", "3")
            .parse::<u32>()
            .ok()
            .filter(|attempts| *attempts >= 1)
            .ok_or(ConfigError::InvalidValue("TRANSFER_MAX_ATTEMPTS"))?;

        let transfer_retry_base_delay = or_default("TRANSFER_RETRY_BASE_DELAY_MS", "50")
            .parse()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidValue("TRANSFER_RETRY_BASE_DELAY_MS"))?;

        let log_format = match or_default("LOG_FORMAT", "pretty").to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            _ => return Err(ConfigError::InvalidValue("LOG_FORMAT")),
        };

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            token_symmetric_key,
            token_kind,
            access_token_duration,
            transfer_max_attempts,
            transfer_retry_base_delay,
            log_format,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Retry policy handed to the transfer engine
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.transfer_max_attempts, self.transfer_retry_base_delay)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}
