//! Wallet provider webhook event types.
//!
//! Subscription events carry the subscription as `resource`; sale events
//! carry the sale and point at the subscription through
//! `billing_agreement_id`.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::lifecycle_event::{LifecycleEvent, LifecycleEventType, ObservedStatus, Provider};
use super::webhook_errors::WebhookError;

/// Wallet provider webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PayPalEvent {
    pub id: String,
    pub event_type: String,
    /// RFC 3339 creation time.
    pub create_time: String,
    #[serde(default)]
    pub resource_type: Option<String>,
    pub resource: serde_json::Value,
}

/// `resource` of `BILLING.SUBSCRIPTION.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalSubscriptionResource {
    pub id: String,
    pub status: Option<String>,
}

/// `resource` of `PAYMENT.SALE.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct PayPalSaleResource {
    pub id: String,
    pub state: Option<String>,
    pub billing_agreement_id: Option<String>,
}

/// Wallet provider event types the ledger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayPalEventType {
    SubscriptionCreated,
    SubscriptionActivated,
    SubscriptionReactivated,
    SubscriptionCancelled,
    SubscriptionExpired,
    SubscriptionSuspended,
    SubscriptionPaymentFailed,
    SaleCompleted,
    Unknown,
}

impl PayPalEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "BILLING.SUBSCRIPTION.CREATED" => Self::SubscriptionCreated,
            "BILLING.SUBSCRIPTION.ACTIVATED" => Self::SubscriptionActivated,
            "BILLING.SUBSCRIPTION.RE-ACTIVATED" => Self::SubscriptionReactivated,
            "BILLING.SUBSCRIPTION.CANCELLED" => Self::SubscriptionCancelled,
            "BILLING.SUBSCRIPTION.EXPIRED" => Self::SubscriptionExpired,
            "BILLING.SUBSCRIPTION.SUSPENDED" => Self::SubscriptionSuspended,
            "BILLING.SUBSCRIPTION.PAYMENT.FAILED" => Self::SubscriptionPaymentFailed,
            "PAYMENT.SALE.COMPLETED" => Self::SaleCompleted,
            _ => Self::Unknown,
        }
    }

    /// Lifecycle meaning of this event type, if any.
    ///
    /// A suspension can be undone by the merchant, so it is not mapped to a
    /// terminal status.
    pub fn lifecycle_type(&self) -> Option<LifecycleEventType> {
        match self {
            Self::SubscriptionCreated => Some(LifecycleEventType::SubscriptionCreated),
            Self::SubscriptionActivated | Self::SubscriptionReactivated => {
                Some(LifecycleEventType::SubscriptionConfirmedActive)
            }
            Self::SubscriptionCancelled | Self::SubscriptionExpired => {
                Some(LifecycleEventType::SubscriptionCancelled)
            }
            Self::SubscriptionPaymentFailed => Some(LifecycleEventType::InvoicePaymentFailed),
            Self::SaleCompleted => Some(LifecycleEventType::InvoicePaymentSucceeded),
            Self::SubscriptionSuspended | Self::Unknown => None,
        }
    }
}

impl PayPalEvent {
    pub fn parsed_type(&self) -> PayPalEventType {
        PayPalEventType::parse(&self.event_type)
    }

    fn resource<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.resource.clone())
            .map_err(|e| WebhookError::ParseError(format!("{}: {}", self.event_type, e)))
    }

    /// Maps the event to a lifecycle event, or `None` for types the ledger
    /// does not track.
    pub fn to_lifecycle_event(
        &self,
        raw_payload: serde_json::Value,
    ) -> Result<Option<LifecycleEvent>, WebhookError> {
        let parsed = self.parsed_type();
        let Some(event_type) = parsed.lifecycle_type() else {
            return Ok(None);
        };

        let occurred_at = Timestamp::parse_rfc3339(&self.create_time)
            .ok_or_else(|| WebhookError::ParseError("invalid create_time".to_string()))?;

        let event = if parsed == PayPalEventType::SaleCompleted {
            let sale: PayPalSaleResource = self.resource()?;
            let Some(subscription_id) = sale.billing_agreement_id else {
                return Ok(None);
            };
            LifecycleEvent::new(Provider::Wallet, &self.id, event_type, subscription_id, occurred_at)
                .with_observed_status(ObservedStatus::from_provider(sale.state.as_deref()))
                .with_invoice_id(Some(sale.id))
        } else {
            let sub: PayPalSubscriptionResource = self.resource()?;
            LifecycleEvent::new(Provider::Wallet, &self.id, event_type, sub.id, occurred_at)
                .with_observed_status(ObservedStatus::from_provider(sub.status.as_deref()))
        };

        Ok(Some(event.with_raw_payload(raw_payload)))
    }
}
