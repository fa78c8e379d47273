//! Provider-agnostic lifecycle events.
//!
//! Each provider notification that matters to the ledger is normalized into
//! exactly one `LifecycleEventType`, so the state machine never inspects
//! provider payload shapes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::Timestamp;

/// Billing provider that emitted an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    /// Card-processing provider (HMAC-signed webhooks).
    Card,
    /// Wallet-based provider (verified through its API).
    Wallet,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Card => "card",
            Provider::Wallet => "wallet",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of lifecycle change the ledger reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEventType {
    /// Subscription was created on the provider side.
    SubscriptionCreated,
    /// Post-creation update; carries the provider's view of the status.
    SubscriptionConfirmedActive,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    /// Subscription was cancelled or expired on the provider side.
    SubscriptionCancelled,
}

impl LifecycleEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleEventType::SubscriptionCreated => "subscription_created",
            LifecycleEventType::SubscriptionConfirmedActive => "subscription_confirmed_active",
            LifecycleEventType::InvoicePaymentSucceeded => "invoice_payment_succeeded",
            LifecycleEventType::InvoicePaymentFailed => "invoice_payment_failed",
            LifecycleEventType::SubscriptionCancelled => "subscription_cancelled",
        }
    }
}

impl fmt::Display for LifecycleEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription status as reported inside the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "raw", rename_all = "snake_case")]
pub enum ObservedStatus {
    Active,
    Inactive(String),
    /// The event carried no subscription status.
    Unreported,
}

impl ObservedStatus {
    /// Maps a raw provider status string, case-insensitively.
    pub fn from_provider(raw: Option<&str>) -> Self {
        match raw {
            None => ObservedStatus::Unreported,
            Some(s) if s.eq_ignore_ascii_case("active") => ObservedStatus::Active,
            Some(s) => ObservedStatus::Inactive(s.to_string()),
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, ObservedStatus::Active)
    }
}

/// A verified, normalized provider event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub provider: Provider,
    /// Provider's own event id; only used for optional deduplication.
    pub event_id: String,
    pub event_type: LifecycleEventType,
    pub provider_subscription_id: String,
    pub observed_status: ObservedStatus,
    pub invoice_id: Option<String>,
    pub occurred_at: Timestamp,
    /// Original body kept for audit logging.
    pub raw_payload: serde_json::Value,
}

impl LifecycleEvent {
    pub fn new(
        provider: Provider,
        event_id: impl Into<String>,
        event_type: LifecycleEventType,
        provider_subscription_id: impl Into<String>,
        occurred_at: Timestamp,
    ) -> Self {
        Self {
            provider,
            event_id: event_id.into(),
            event_type,
            provider_subscription_id: provider_subscription_id.into(),
            observed_status: ObservedStatus::Unreported,
            invoice_id: None,
            occurred_at,
            raw_payload: serde_json::Value::Null,
        }
    }

    pub fn with_observed_status(mut self, status: ObservedStatus) -> Self {
        self.observed_status = status;
        self
    }

    pub fn with_invoice_id(mut self, invoice_id: Option<String>) -> Self {
        self.invoice_id = invoice_id;
        self
    }

    pub fn with_raw_payload(mut self, raw_payload: serde_json::Value) -> Self {
        self.raw_payload = raw_payload;
        self
    }

    /// Key for the processed-event cache, unique across providers.
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.provider, self.event_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observed_status_matches_active_case_insensitively() {
        assert!(ObservedStatus::from_provider(Some("active")).is_active());
        assert!(ObservedStatus::from_provider(Some("ACTIVE")).is_active());
    }

    #[test]
    fn observed_status_keeps_inactive_raw_value() {
        assert_eq!(
            ObservedStatus::from_provider(Some("incomplete")),
            ObservedStatus::Inactive("incomplete".to_string())
        );
        assert_eq!(ObservedStatus::from_provider(None), ObservedStatus::Unreported);
    }

    #[test]
    fn dedup_key_is_namespaced_by_provider() {
        let at = Timestamp::now();
        let card = LifecycleEvent::new(
            Provider::Card,
            "evt_1",
            LifecycleEventType::InvoicePaymentSucceeded,
            "sub_1",
            at,
        );
        let wallet = LifecycleEvent::new(
            Provider::Wallet,
            "evt_1",
            LifecycleEventType::InvoicePaymentSucceeded,
            "sub_1",
            at,
        );

        assert_eq!(card.dedup_key(), "card:evt_1");
        assert_ne!(card.dedup_key(), wallet.dedup_key());
    }
}
