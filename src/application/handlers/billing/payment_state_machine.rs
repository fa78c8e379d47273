//! PaymentStateMachine - applies lifecycle events to the ledger.
//!
//! Every event for one provider subscription runs under a per-subscription
//! lock, so the read, the transition decision and the write are atomic with
//! respect to other deliveries for the same subscription. Different
//! subscriptions proceed in parallel.

use std::sync::Arc;

use crate::application::KeyedMutex;
use crate::domain::billing::{
    evaluate, ApplyError, IgnoreReason, LifecycleEvent, Payment, PaymentStatus, StatusUpdate,
    TransitionDecision,
};
use crate::ports::{Ledger, PaymentEventPublisher, PaymentStatusChanged, ProcessedEventStore};

/// Result of applying one lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The ledger was written; carries the stored status.
    Applied(PaymentStatus),
    /// Nothing was written.
    Ignored(IgnoreReason),
}

/// Reconciles provider lifecycle events into payment status.
///
/// Share one instance (behind `Arc`) across all request handlers; the lock
/// registry lives inside it.
pub struct PaymentStateMachine {
    ledger: Arc<dyn Ledger>,
    publisher: Arc<dyn PaymentEventPublisher>,
    processed_events: Option<Arc<dyn ProcessedEventStore>>,
    locks: KeyedMutex<String>,
}

impl PaymentStateMachine {
    pub fn new(ledger: Arc<dyn Ledger>, publisher: Arc<dyn PaymentEventPublisher>) -> Self {
        Self {
            ledger,
            publisher,
            processed_events: None,
            locks: KeyedMutex::new(),
        }
    }

    /// Short-circuit redeliveries of events already applied.
    pub fn with_processed_event_store(mut self, store: Arc<dyn ProcessedEventStore>) -> Self {
        self.processed_events = Some(store);
        self
    }

    pub async fn apply(&self, event: &LifecycleEvent) -> Result<ApplyOutcome, ApplyError> {
        let subscription_id = event.provider_subscription_id.as_str();
        let _guard = self.locks.lock(&event.provider_subscription_id).await;

        // 1. Skip events the cache already saw
        if self.already_processed(event).await {
            tracing::debug!(
                provider = event.provider.as_str(),
                event_id = %event.event_id,
                subscription_id,
                "event already processed"
            );
            return Ok(ApplyOutcome::Ignored(IgnoreReason::StaleOrDuplicate));
        }

        // 2. Resolve the payment
        let payment = match self
            .ledger
            .find_payment_by_subscription_id(subscription_id)
            .await?
        {
            Some(payment) => payment,
            None => {
                tracing::warn!(
                    provider = event.provider.as_str(),
                    event_type = event.event_type.as_str(),
                    subscription_id,
                    "event for unknown subscription"
                );
                return Err(ApplyError::UnknownSubscription(subscription_id.to_string()));
            }
        };

        // 3. Decide
        let (to, invoice_id) = match evaluate(&payment, event) {
            TransitionDecision::Apply { to, invoice_id } => (to, invoice_id),
            TransitionDecision::Ignore(reason) => {
                tracing::debug!(
                    event_type = event.event_type.as_str(),
                    subscription_id,
                    status = %payment.status,
                    %reason,
                    "event ignored"
                );
                self.mark_processed(event).await;
                return Ok(ApplyOutcome::Ignored(reason));
            }
        };

        // 4. Compare-and-set write
        let mut update = StatusUpdate::against(&payment, to);
        if let Some(invoice_id) = invoice_id {
            update = update.with_invoice(invoice_id, event.occurred_at);
        }
        let updated = self
            .ledger
            .update_payment_status(&payment.id, update)
            .await?;

        tracing::info!(
            provider = event.provider.as_str(),
            event_type = event.event_type.as_str(),
            subscription_id,
            from = %payment.status,
            to = %updated.status,
            "payment status applied"
        );

        self.mark_processed(event).await;
        self.publish(&payment, &updated, event).await;

        Ok(ApplyOutcome::Applied(updated.status))
    }

    async fn already_processed(&self, event: &LifecycleEvent) -> bool {
        let Some(store) = &self.processed_events else {
            return false;
        };
        match store.contains(&event.dedup_key()).await {
            Ok(seen) => seen,
            Err(e) => {
                tracing::warn!(error = %e, "processed-event lookup failed; continuing");
                false
            }
        }
    }

    async fn mark_processed(&self, event: &LifecycleEvent) {
        if let Some(store) = &self.processed_events {
            if let Err(e) = store.mark_processed(&event.dedup_key()).await {
                tracing::warn!(error = %e, "failed to mark event processed");
            }
        }
    }

    async fn publish(&self, before: &Payment, after: &Payment, event: &LifecycleEvent) {
        let change = PaymentStatusChanged {
            payment_id: after.id,
            user_id: after.user_id,
            provider: event.provider,
            provider_subscription_id: after.provider_subscription_id.clone(),
            trigger: event.event_type,
            previous_status: before.status,
            new_status: after.status,
            invoice_id: after.invoice_id.clone(),
            occurred_at: event.occurred_at,
        };
        if let Err(e) = self.publisher.publish(change).await {
            tracing::warn!(
                error = %e,
                subscription_id = %after.provider_subscription_id,
                "failed to publish payment status change"
            );
        }
    }
}
