//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid port number")]
    InvalidPort,

    #[error("Invalid bind address: {0}")]
    InvalidBindAddress(String),

    #[error("Invalid request timeout")]
    InvalidTimeout,

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Invalid Redis URL format")]
    InvalidRedisUrl,

    #[error("Pool max_connections must be between 1 and 100")]
    InvalidPoolSize,

    #[error("Invalid card provider API key format")]
    InvalidCardApiKey,

    #[error("Invalid card provider webhook secret format")]
    InvalidCardWebhookSecret,

    #[error("Plan amount must be positive: {0}")]
    InvalidPlanAmount(&'static str),

    #[error("Provider base URL must use HTTPS in production: {0}")]
    ProviderUrlMustBeHttps(&'static str),

    #[error("Provider timeout must be between 1 and 120 seconds")]
    InvalidProviderTimeout,
}
