//! Publisher that writes status changes to the structured log.
//!
//! Default wiring when no downstream consumer is configured.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;
use crate::ports::{PaymentEventPublisher, PaymentStatusChanged};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingPaymentEventPublisher;

impl LoggingPaymentEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentEventPublisher for LoggingPaymentEventPublisher {
    async fn publish(&self, event: PaymentStatusChanged) -> Result<(), DomainError> {
        tracing::info!(
            target: "billing_reconciler::payment_events",
            payment_id = %event.payment_id,
            user_id = %event.user_id,
            provider = event.provider.as_str(),
            subscription_id = %event.provider_subscription_id,
            trigger = event.trigger.as_str(),
            previous_status = %event.previous_status,
            new_status = %event.new_status,
            invoice_id = event.invoice_id.as_deref().unwrap_or(""),
            "payment status changed"
        );
        Ok(())
    }
}
