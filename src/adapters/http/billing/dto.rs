//! HTTP DTOs for billing endpoints.
//!
//! These types define the JSON request/response structure for the billing API.

use serde::{Deserialize, Serialize};

use crate::application::handlers::billing::{
    ConfirmWalletSubscriptionResult, ProvisionCardSubscriptionResult,
    StartWalletSubscriptionResult, WebhookOutcome,
};
use crate::domain::billing::{Payment, PaymentMethod, PaymentStatus, PaymentType};

// ════════════════════════════════════════════════════════════════════════════════
// Request DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Request to start a card subscription.
#[derive(Debug, Clone, Deserialize)]
pub struct CardSubscriptionRequest {
    /// Tokenized card instrument from the provider's client SDK.
    pub payment_method_id: String,
    pub payment_type: PaymentType,
    /// Overrides the configured price for `payment_type`.
    #[serde(default)]
    pub price_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartWalletSubscriptionRequest {
    pub payment_type: PaymentType,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmWalletSubscriptionRequest {
    pub subscription_id: String,
    #[serde(default = "default_wallet_payment_type")]
    pub payment_type: PaymentType,
}

fn default_wallet_payment_type() -> PaymentType {
    PaymentType::Yearly
}

// ════════════════════════════════════════════════════════════════════════════════
// Response DTOs
// ════════════════════════════════════════════════════════════════════════════════

/// Payment ledger record.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub user_id: String,
    pub provider_subscription_id: String,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub invoice_id: Option<String>,
    /// ISO 8601.
    pub create_date: String,
    /// ISO 8601.
    pub expire_date: String,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id.to_string(),
            user_id: payment.user_id.to_string(),
            provider_subscription_id: payment.provider_subscription_id,
            amount: payment.amount,
            payment_method: payment.payment_method,
            payment_type: payment.payment_type,
            status: payment.status,
            invoice_id: payment.invoice_id,
            create_date: payment.create_date.as_datetime().to_rfc3339(),
            expire_date: payment.expire_date.as_datetime().to_rfc3339(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CardSubscriptionResponse {
    pub payment: PaymentResponse,
    pub customer_id: String,
    /// Raw provider status, e.g. `incomplete`.
    pub subscription_status: String,
    /// Set when this request made the instrument the default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_payment_method_id: Option<String>,
}

impl From<ProvisionCardSubscriptionResult> for CardSubscriptionResponse {
    fn from(result: ProvisionCardSubscriptionResult) -> Self {
        Self {
            payment: result.payment.into(),
            customer_id: result.customer_id,
            subscription_status: result.subscription_status,
            default_payment_method_id: result.promoted_instrument_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletSubscriptionResponse {
    pub subscription_id: String,
    pub status: String,
    pub approval_url: Option<String>,
}

impl From<StartWalletSubscriptionResult> for WalletSubscriptionResponse {
    fn from(result: StartWalletSubscriptionResult) -> Self {
        Self {
            subscription_id: result.subscription_id,
            status: result.status,
            approval_url: result.approval_url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WalletConfirmationResponse {
    pub payment: PaymentResponse,
    pub created: bool,
}

impl From<ConfirmWalletSubscriptionResult> for WalletConfirmationResponse {
    fn from(result: ConfirmWalletSubscriptionResult) -> Self {
        Self {
            payment: result.payment.into(),
            created: result.created,
        }
    }
}

/// Acknowledgement returned to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    /// `applied`, `ignored` or `unsupported`.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<WebhookOutcome> for WebhookAckResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        let (outcome, status, reason) = match outcome {
            WebhookOutcome::Applied(status) => ("applied", Some(status), None),
            WebhookOutcome::Ignored(reason) => ("ignored", None, Some(reason.to_string())),
            WebhookOutcome::Unsupported => ("unsupported", None, None),
        };
        Self {
            received: true,
            outcome,
            status,
            reason,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Response
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error response body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}
