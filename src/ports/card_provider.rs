//! Card provider port.
//!
//! Customer, instrument, and subscription calls against the card-processing
//! provider. Webhook signatures for this provider are checked locally by
//! `StripeWebhookVerifier`, so no verification call is needed here.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

use super::provider_error::ProviderError;

/// Port for the card-processing provider.
///
/// Implementations should send idempotency keys where the provider supports
/// them so that a retried step does not duplicate provider resources.
#[async_trait]
pub trait CardProvider: Send + Sync {
    /// Create a customer and return the provider's customer id.
    async fn create_customer(&self, request: CreateCustomerRequest)
        -> Result<String, ProviderError>;

    /// Attach a payment instrument to a customer.
    async fn attach_instrument(
        &self,
        instrument_id: &str,
        customer_id: &str,
    ) -> Result<(), ProviderError>;

    /// Make an attached instrument the customer's default for invoices.
    async fn set_default_instrument(
        &self,
        customer_id: &str,
        instrument_id: &str,
    ) -> Result<(), ProviderError>;

    /// Start a recurring subscription for a customer.
    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionIntent, ProviderError>;
}

/// Request to create a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// Internal user ID (stored as provider metadata).
    pub user_id: UserId,
    pub email: String,
    pub name: String,
    /// Idempotency key for safe retries.
    pub idempotency_key: String,
}

/// Request to create a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSubscriptionRequest {
    pub customer_id: String,
    /// Provider price the subscription bills.
    pub price_id: String,
    pub idempotency_key: String,
}

/// Subscription as returned by the provider right after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionIntent {
    pub id: String,
    /// Raw provider status, e.g. `incomplete` or `active`.
    pub status: String,
    /// Unix timestamp.
    pub current_period_start: i64,
    pub latest_invoice_id: Option<String>,
    /// Minor units; `None` if the provider omitted the plan.
    pub plan_amount: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn CardProvider) {}

    #[test]
    fn subscription_intent_deserializes_without_optional_fields() {
        let json = r#"{"id":"sub_1","status":"incomplete","current_period_start":1705276800,
                       "latest_invoice_id":null,"plan_amount":null}"#;
        let intent: SubscriptionIntent = serde_json::from_str(json).unwrap();
        assert_eq!(intent.id, "sub_1");
        assert!(intent.plan_amount.is_none());
    }
}
