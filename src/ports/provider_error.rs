//! Error type shared by the billing provider ports.

use serde::{Deserialize, Serialize};

use crate::domain::billing::StepError;

/// Failure reported by a billing provider client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    /// Error code for categorization.
    pub code: ProviderErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's own error code, if it sent one.
    pub provider_code: Option<String>,
}

impl ProviderError {
    pub fn new(code: ProviderErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Connection failure or 5xx.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::NetworkError, message)
    }

    /// Call exceeded its deadline; the outcome on the provider is unknown.
    pub fn timeout(operation: &str) -> Self {
        Self::new(
            ProviderErrorCode::Timeout,
            format!("{} timed out", operation),
        )
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(ProviderErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorCode::InvalidRequest, message)
    }

    /// True when the provider could not be reached or did not answer in time.
    pub fn is_unavailable(&self) -> bool {
        self.code.is_unavailable()
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for StepError {
    fn from(err: ProviderError) -> Self {
        if err.is_unavailable() {
            StepError::ProviderUnavailable(err.to_string())
        } else {
            StepError::ProviderRejected(err.to_string())
        }
    }
}

/// Provider error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorCode {
    /// Network connectivity issue or provider 5xx.
    NetworkError,

    /// Deadline elapsed before the provider answered.
    Timeout,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// API credentials rejected.
    AuthenticationError,

    /// Request rejected as malformed or not allowed.
    InvalidRequest,

    /// Instrument declined.
    CardDeclined,

    /// Resource not found.
    NotFound,

    /// Unexpected response shape.
    Unknown,
}

impl ProviderErrorCode {
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ProviderErrorCode::NetworkError
                | ProviderErrorCode::Timeout
                | ProviderErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for ProviderErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProviderErrorCode::NetworkError => "network_error",
            ProviderErrorCode::Timeout => "timeout",
            ProviderErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            ProviderErrorCode::AuthenticationError => "authentication_error",
            ProviderErrorCode::InvalidRequest => "invalid_request",
            ProviderErrorCode::CardDeclined => "card_declined",
            ProviderErrorCode::NotFound => "not_found",
            ProviderErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
