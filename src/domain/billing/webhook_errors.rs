//! Webhook error types.
//!
//! Covers every way an inbound provider notification can fail, with HTTP
//! status mapping and retryability semantics. Providers redeliver on any
//! non-2xx response.

use axum::http::StatusCode;
use thiserror::Error;

use crate::domain::foundation::DomainError;

use super::errors::ApplyError;

/// Errors that occur during webhook processing.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// Signature did not match the raw body.
    #[error("Invalid signature")]
    InvalidSignature,

    /// Signature timestamp is older than the tolerance window.
    #[error("Timestamp out of range")]
    TimestampOutOfRange,

    /// Signature timestamp is in the future beyond clock skew tolerance.
    #[error("Invalid timestamp")]
    InvalidTimestamp,

    /// A required verification header was not sent.
    #[error("Missing header: {0}")]
    MissingHeader(&'static str),

    /// Failed to parse the signature header or the verified body.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Required field missing from a verified payload.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Event references a subscription the ledger does not know.
    #[error("Unknown subscription: {0}")]
    UnknownSubscription(String),

    /// Provider call failed or timed out during verification.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Ledger read or write failed.
    #[error("Ledger error: {0}")]
    Ledger(DomainError),
}

impl WebhookError {
    /// True when a redelivery of the same notification may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            WebhookError::ProviderUnavailable(_) => true,
            WebhookError::Ledger(err) => err.is_retryable(),
            _ => false,
        }
    }

    /// Maps the error to the response status returned to the provider.
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Auth failures
            WebhookError::InvalidSignature | WebhookError::TimestampOutOfRange => {
                StatusCode::UNAUTHORIZED
            }

            // Bad request
            WebhookError::InvalidTimestamp
            | WebhookError::MissingHeader(_)
            | WebhookError::ParseError(_)
            | WebhookError::MissingField(_) => StatusCode::BAD_REQUEST,

            WebhookError::UnknownSubscription(_) => StatusCode::NOT_FOUND,

            WebhookError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            WebhookError::Ledger(err) if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// True for failures of the authentication step itself.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidSignature
                | WebhookError::TimestampOutOfRange
                | WebhookError::InvalidTimestamp
                | WebhookError::MissingHeader(_)
        )
    }
}

impl From<ApplyError> for WebhookError {
    fn from(err: ApplyError) -> Self {
        match err {
            ApplyError::UnknownSubscription(id) => WebhookError::UnknownSubscription(id),
            ApplyError::Ledger(e) => WebhookError::Ledger(e),
        }
    }
}
