//! Card provider webhook event types.
//!
//! Only fields relevant to reconciliation are captured; everything else in
//! the provider's schema is ignored.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::Timestamp;

use super::lifecycle_event::{LifecycleEvent, LifecycleEventType, ObservedStatus, Provider};
use super::webhook_errors::WebhookError;

/// Card provider webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    #[serde(rename = "type")]
    pub event_type: String,

    /// Unix timestamp of event creation.
    pub created: i64,

    pub data: StripeEventData,

    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeEventData {
    /// Polymorphic on `type`.
    pub object: serde_json::Value,
}

/// A reference that may arrive either as a bare id or an expanded object.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum Expandable {
    Id(String),
    Object { id: String },
}

impl Expandable {
    pub fn id(&self) -> &str {
        match self {
            Expandable::Id(id) => id,
            Expandable::Object { id } => id,
        }
    }
}

/// `data.object` of `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionObject {
    pub id: String,
    pub status: Option<String>,
    pub latest_invoice: Option<Expandable>,
}

/// `data.object` of `invoice.*` events.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoiceObject {
    pub id: String,
    pub status: Option<String>,
    pub subscription: Option<Expandable>,
    /// Newer API versions nest the subscription under `parent`.
    pub parent: Option<StripeInvoiceParent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeInvoiceParent {
    pub subscription_details: Option<StripeSubscriptionDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeSubscriptionDetails {
    pub subscription: Option<Expandable>,
}

impl StripeInvoiceObject {
    pub fn subscription_id(&self) -> Option<&str> {
        self.subscription
            .as_ref()
            .or_else(|| {
                self.parent
                    .as_ref()
                    .and_then(|p| p.subscription_details.as_ref())
                    .and_then(|d| d.subscription.as_ref())
            })
            .map(Expandable::id)
    }
}

/// Card provider event types with a reconciliation meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeEventType {
    CustomerSubscriptionCreated,
    CustomerSubscriptionUpdated,
    CustomerSubscriptionDeleted,
    InvoicePaymentSucceeded,
    InvoicePaymentFailed,
    Unknown,
}

impl StripeEventType {
    pub fn parse(s: &str) -> Self {
        match s {
            "customer.subscription.created" => Self::CustomerSubscriptionCreated,
            "customer.subscription.updated" => Self::CustomerSubscriptionUpdated,
            "customer.subscription.deleted" => Self::CustomerSubscriptionDeleted,
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CustomerSubscriptionCreated => "customer.subscription.created",
            Self::CustomerSubscriptionUpdated => "customer.subscription.updated",
            Self::CustomerSubscriptionDeleted => "customer.subscription.deleted",
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::Unknown => "unknown",
        }
    }
}

impl StripeEvent {
    pub fn parsed_type(&self) -> StripeEventType {
        StripeEventType::parse(&self.event_type)
    }

    fn object<T: serde::de::DeserializeOwned>(&self) -> Result<T, WebhookError> {
        serde_json::from_value(self.data.object.clone())
            .map_err(|e| WebhookError::ParseError(format!("{}: {}", self.event_type, e)))
    }

    /// Maps the event to a lifecycle event, or `None` for types the ledger
    /// does not track.
    pub fn to_lifecycle_event(
        &self,
        raw_payload: serde_json::Value,
    ) -> Result<Option<LifecycleEvent>, WebhookError> {
        let occurred_at = Timestamp::from_unix_secs(self.created)
            .ok_or_else(|| WebhookError::ParseError("created out of range".to_string()))?;

        let event = match self.parsed_type() {
            StripeEventType::CustomerSubscriptionCreated => {
                self.subscription_event(LifecycleEventType::SubscriptionCreated, occurred_at)?
            }
            StripeEventType::CustomerSubscriptionUpdated => self
                .subscription_event(LifecycleEventType::SubscriptionConfirmedActive, occurred_at)?,
            StripeEventType::CustomerSubscriptionDeleted => {
                self.subscription_event(LifecycleEventType::SubscriptionCancelled, occurred_at)?
            }
            StripeEventType::InvoicePaymentSucceeded => {
                self.invoice_event(LifecycleEventType::InvoicePaymentSucceeded, occurred_at)?
            }
            StripeEventType::InvoicePaymentFailed => {
                self.invoice_event(LifecycleEventType::InvoicePaymentFailed, occurred_at)?
            }
            StripeEventType::Unknown => None,
        };

        Ok(event.map(|e| e.with_raw_payload(raw_payload)))
    }

    fn subscription_event(
        &self,
        event_type: LifecycleEventType,
        occurred_at: Timestamp,
    ) -> Result<Option<LifecycleEvent>, WebhookError> {
        let sub: StripeSubscriptionObject = self.object()?;
        Ok(Some(
            LifecycleEvent::new(Provider::Card, &self.id, event_type, sub.id, occurred_at)
                .with_observed_status(ObservedStatus::from_provider(sub.status.as_deref()))
                .with_invoice_id(sub.latest_invoice.map(|i| i.id().to_string())),
        ))
    }

    fn invoice_event(
        &self,
        event_type: LifecycleEventType,
        occurred_at: Timestamp,
    ) -> Result<Option<LifecycleEvent>, WebhookError> {
        let invoice: StripeInvoiceObject = self.object()?;
        let Some(subscription_id) = invoice.subscription_id().map(str::to_string) else {
            return Ok(None);
        };
        Ok(Some(
            LifecycleEvent::new(Provider::Card, &self.id, event_type, subscription_id, occurred_at)
                .with_observed_status(ObservedStatus::from_provider(invoice.status.as_deref()))
                .with_invoice_id(Some(invoice.id)),
        ))
    }
}

/// Builder for test card provider events.
#[cfg(test)]
pub struct StripeEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
}

#[cfg(test)]
impl Default for StripeEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "invoice.payment_succeeded".to_string(),
            created: 1_705_276_800,
            object: serde_json::json!({}),
        }
    }
}

#[cfg(test)]
impl StripeEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn event_type(mut self, event_type: &str) -> Self {
        self.event_type = event_type.to_string();
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "type": self.event_type,
            "created": self.created,
            "data": { "object": self.object },
            "livemode": false,
        })
    }

    pub fn build(self) -> StripeEvent {
        // Builder output always matches the envelope shape.
        serde_json::from_value(self.to_json()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lifecycle(builder: StripeEventBuilder) -> Option<LifecycleEvent> {
        let raw = builder.to_json();
        builder.build().to_lifecycle_event(raw).unwrap()
    }

    // ══════════════════════════════════════════════════════════════
    // Event Type Parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn event_type_round_trips_known_values() {
        for t in [
            StripeEventType::CustomerSubscriptionCreated,
            StripeEventType::CustomerSubscriptionUpdated,
            StripeEventType::CustomerSubscriptionDeleted,
            StripeEventType::InvoicePaymentSucceeded,
            StripeEventType::InvoicePaymentFailed,
        ] {
            assert_eq!(StripeEventType::parse(t.as_str()), t);
        }
        assert_eq!(
            StripeEventType::parse("charge.refunded"),
            StripeEventType::Unknown
        );
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Events
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn subscription_created_maps_status_and_invoice() {
        let event = lifecycle(
            StripeEventBuilder::new()
                .event_type("customer.subscription.created")
                .object(json!({"id": "sub_1", "status": "incomplete", "latest_invoice": "in_1"})),
        )
        .unwrap();

        assert_eq!(event.event_type, LifecycleEventType::SubscriptionCreated);
        assert_eq!(event.provider_subscription_id, "sub_1");
        assert_eq!(
            event.observed_status,
            ObservedStatus::Inactive("incomplete".to_string())
        );
        assert_eq!(event.invoice_id.as_deref(), Some("in_1"));
        assert_eq!(event.occurred_at.as_unix_secs(), 1_705_276_800);
    }

    #[test]
    fn subscription_updated_is_confirmation() {
        let event = lifecycle(
            StripeEventBuilder::new()
                .event_type("customer.subscription.updated")
                .object(json!({"id": "sub_1", "status": "active", "latest_invoice": {"id": "in_2"}})),
        )
        .unwrap();

        assert_eq!(event.event_type, LifecycleEventType::SubscriptionConfirmedActive);
        assert!(event.observed_status.is_active());
        assert_eq!(event.invoice_id.as_deref(), Some("in_2"));
    }

    #[test]
    fn subscription_deleted_is_cancellation() {
        let event = lifecycle(
            StripeEventBuilder::new()
                .event_type("customer.subscription.deleted")
                .object(json!({"id": "sub_1", "status": "canceled"})),
        )
        .unwrap();

        assert_eq!(event.event_type, LifecycleEventType::SubscriptionCancelled);
        assert_eq!(event.invoice_id, None);
    }

    // ══════════════════════════════════════════════════════════════
    // Invoice Events
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn invoice_succeeded_uses_invoice_subscription() {
        let event = lifecycle(
            StripeEventBuilder::new()
                .id("evt_9")
                .object(json!({"id": "in_5", "status": "paid", "subscription": "sub_7"})),
        )
        .unwrap();

        assert_eq!(event.event_type, LifecycleEventType::InvoicePaymentSucceeded);
        assert_eq!(event.event_id, "evt_9");
        assert_eq!(event.provider_subscription_id, "sub_7");
        assert_eq!(event.invoice_id.as_deref(), Some("in_5"));
    }

    #[test]
    fn invoice_reads_nested_parent_subscription() {
        let event = lifecycle(StripeEventBuilder::new().object(json!({
            "id": "in_5",
            "parent": {"subscription_details": {"subscription": "sub_nested"}}
        })))
        .unwrap();

        assert_eq!(event.provider_subscription_id, "sub_nested");
    }

    #[test]
    fn invoice_failed_maps_to_failure() {
        let event = lifecycle(
            StripeEventBuilder::new()
                .event_type("invoice.payment_failed")
                .object(json!({"id": "in_5", "subscription": "sub_7"})),
        )
        .unwrap();

        assert_eq!(event.event_type, LifecycleEventType::InvoicePaymentFailed);
    }

    #[test]
    fn one_off_invoice_is_not_tracked() {
        let event = lifecycle(StripeEventBuilder::new().object(json!({"id": "in_5"})));
        assert!(event.is_none());
    }

    #[test]
    fn unknown_type_is_not_tracked() {
        let event = lifecycle(
            StripeEventBuilder::new()
                .event_type("charge.refunded")
                .object(json!({"id": "ch_1"})),
        );
        assert!(event.is_none());
    }

    #[test]
    fn malformed_object_is_parse_error() {
        let builder = StripeEventBuilder::new()
            .event_type("customer.subscription.created")
            .object(json!({"status": "active"}));
        let raw = builder.to_json();

        let result = builder.build().to_lifecycle_event(raw);

        assert!(matches!(result, Err(WebhookError::ParseError(_))));
    }
}
