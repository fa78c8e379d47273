//! PaymentEventPublisher port - fan-out after a status change.
//!
//! Subscribers (notifications, analytics) are outside the reconciliation
//! core. A publish failure never undoes the ledger write that preceded it.

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::billing::{LifecycleEventType, PaymentStatus, Provider};
use crate::domain::foundation::{DomainError, PaymentId, Timestamp, UserId};

/// Emitted once per applied transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentStatusChanged {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub provider: Provider,
    pub provider_subscription_id: String,
    pub trigger: LifecycleEventType,
    pub previous_status: PaymentStatus,
    pub new_status: PaymentStatus,
    pub invoice_id: Option<String>,
    pub occurred_at: Timestamp,
}

/// Port for publishing payment status changes.
#[async_trait]
pub trait PaymentEventPublisher: Send + Sync {
    async fn publish(&self, event: PaymentStatusChanged) -> Result<(), DomainError>;
}
