//! In-memory payment event publisher for testing.
//!
//! Captures every published status change for assertions. Can be told to
//! fail so callers can check that a publish error leaves the ledger alone.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::domain::billing::PaymentStatus;
use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{PaymentEventPublisher, PaymentStatusChanged};

/// Capturing publisher.
///
/// # Example
///
/// ```ignore
/// let publisher = Arc::new(InMemoryPaymentEventPublisher::new());
/// // ...apply events...
/// assert_eq!(publisher.event_count(), 1);
/// ```
#[derive(Default)]
pub struct InMemoryPaymentEventPublisher {
    published: RwLock<Vec<PaymentStatusChanged>>,
    fail: RwLock<bool>,
}

impl InMemoryPaymentEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    // === Test Helpers ===

    pub fn published_events(&self) -> Vec<PaymentStatusChanged> {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn event_count(&self) -> usize {
        self.published
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Events that moved a subscription into `status`.
    pub fn transitions_to(&self, status: PaymentStatus) -> Vec<PaymentStatusChanged> {
        self.published_events()
            .into_iter()
            .filter(|e| e.new_status == status)
            .collect()
    }

    /// Make every following publish fail.
    pub fn fail_publishes(&self, fail: bool) {
        *self.fail.write().unwrap_or_else(PoisonError::into_inner) = fail;
    }

    pub fn clear(&self) {
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl PaymentEventPublisher for InMemoryPaymentEventPublisher {
    async fn publish(&self, event: PaymentStatusChanged) -> Result<(), DomainError> {
        if *self.fail.read().unwrap_or_else(PoisonError::into_inner) {
            return Err(DomainError::new(
                ErrorCode::ExternalServiceError,
                "publisher unavailable",
            ));
        }
        self.published
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{LifecycleEventType, Provider};
    use crate::domain::foundation::{PaymentId, Timestamp, UserId};

    fn status_change(new_status: PaymentStatus) -> PaymentStatusChanged {
        PaymentStatusChanged {
            payment_id: PaymentId::new(),
            user_id: UserId::new(),
            provider: Provider::Wallet,
            provider_subscription_id: "I-1".to_string(),
            trigger: LifecycleEventType::SubscriptionConfirmedActive,
            previous_status: PaymentStatus::Pending,
            new_status,
            invoice_id: None,
            occurred_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn captures_published_events() {
        let publisher = InMemoryPaymentEventPublisher::new();
        publisher.publish(status_change(PaymentStatus::Active)).await.unwrap();
        publisher.publish(status_change(PaymentStatus::Cancelled)).await.unwrap();

        assert_eq!(publisher.event_count(), 2);
        assert_eq!(publisher.transitions_to(PaymentStatus::Active).len(), 1);
    }

    #[tokio::test]
    async fn failing_mode_returns_error_and_stores_nothing() {
        let publisher = InMemoryPaymentEventPublisher::new();
        publisher.fail_publishes(true);

        assert!(publisher.publish(status_change(PaymentStatus::Active)).await.is_err());
        assert_eq!(publisher.event_count(), 0);
    }

    #[tokio::test]
    async fn clear_removes_events() {
        let publisher = InMemoryPaymentEventPublisher::new();
        publisher.publish(status_change(PaymentStatus::Active)).await.unwrap();
        publisher.clear();
        assert_eq!(publisher.event_count(), 0);
    }
}
