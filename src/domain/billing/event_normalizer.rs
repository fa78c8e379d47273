//! Maps authenticated provider payloads to lifecycle events.

use super::lifecycle_event::{LifecycleEvent, Provider};
use super::paypal_event::PayPalEvent;
use super::stripe_event::StripeEvent;
use super::webhook_errors::WebhookError;
use super::webhook_verifier::AuthenticatedPayload;

/// Result of normalizing one provider notification.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    Lifecycle(LifecycleEvent),
    /// Well-formed but without a ledger meaning; acknowledged and dropped.
    Unsupported {
        provider: Provider,
        event_id: String,
        event_type: String,
    },
}

/// Parses and normalizes a verified body.
pub fn normalize(payload: &AuthenticatedPayload) -> Result<NormalizedEvent, WebhookError> {
    let raw: serde_json::Value = serde_json::from_slice(payload.body())
        .map_err(|e| WebhookError::ParseError(e.to_string()))?;

    match payload.provider() {
        Provider::Card => {
            let event: StripeEvent = serde_json::from_value(raw.clone())
                .map_err(|e| WebhookError::ParseError(e.to_string()))?;
            Ok(match event.to_lifecycle_event(raw)? {
                Some(lifecycle) => NormalizedEvent::Lifecycle(lifecycle),
                None => NormalizedEvent::Unsupported {
                    provider: Provider::Card,
                    event_id: event.id,
                    event_type: event.event_type,
                },
            })
        }
        Provider::Wallet => {
            let event: PayPalEvent = serde_json::from_value(raw.clone())
                .map_err(|e| WebhookError::ParseError(e.to_string()))?;
            Ok(match event.to_lifecycle_event(raw)? {
                Some(lifecycle) => NormalizedEvent::Lifecycle(lifecycle),
                None => NormalizedEvent::Unsupported {
                    provider: Provider::Wallet,
                    event_id: event.id,
                    event_type: event.event_type,
                },
            })
        }
    }
}
