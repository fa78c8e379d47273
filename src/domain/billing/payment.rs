//! Payment ledger record.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    DomainError, ErrorCode, PaymentId, StateMachine, Timestamp, UserId, ValidationError,
};

use super::status::{PaymentMethod, PaymentStatus, PaymentType};

/// One attempted subscription cycle.
///
/// `provider_subscription_id` is unique across the ledger and never changes
/// after creation; every provider event is routed to its payment by it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub user_id: UserId,
    pub provider_subscription_id: String,
    /// Minor currency units.
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_type: PaymentType,
    pub status: PaymentStatus,
    pub invoice_id: Option<String>,
    /// Provider time of the event that recorded `invoice_id`. `None` until
    /// a webhook carries an invoice; older invoices never replace newer ones.
    pub invoice_observed_at: Option<Timestamp>,
    pub create_date: Timestamp,
    pub expire_date: Timestamp,
}

impl Payment {
    /// Applies a compare-and-set status update.
    ///
    /// Fails with `ConcurrentModification` when the stored status or invoice
    /// observation time no longer matches what the caller read, and with
    /// `InvalidStateTransition` when the state machine forbids the move.
    pub fn apply_update(&mut self, update: &StatusUpdate) -> Result<(), DomainError> {
        if self.status != update.expected_status {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                format!(
                    "Payment status changed concurrently: expected {}, found {}",
                    update.expected_status, self.status
                ),
            )
            .with_detail("payment_id", self.id.to_string()));
        }
        if self.invoice_observed_at != update.expected_invoice_observed_at {
            return Err(DomainError::new(
                ErrorCode::ConcurrentModification,
                "Payment invoice changed concurrently",
            )
            .with_detail("payment_id", self.id.to_string()));
        }

        self.status = self
            .status
            .transition_to(update.new_status)
            .map_err(|e| DomainError::new(ErrorCode::InvalidStateTransition, e.to_string()))?;

        if let Some(invoice_id) = &update.invoice_id {
            self.invoice_id = Some(invoice_id.clone());
            self.invoice_observed_at = update.invoice_observed_at;
        }
        Ok(())
    }
}

/// Fields for a new `PENDING` payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub user_id: UserId,
    pub provider_subscription_id: String,
    pub amount: i64,
    pub payment_method: PaymentMethod,
    pub payment_type: PaymentType,
    pub invoice_id: Option<String>,
    pub create_date: Timestamp,
}

impl NewPayment {
    pub fn pending(
        user_id: UserId,
        provider_subscription_id: impl Into<String>,
        amount: i64,
        payment_method: PaymentMethod,
        payment_type: PaymentType,
        create_date: Timestamp,
    ) -> Result<Self, ValidationError> {
        let provider_subscription_id = provider_subscription_id.into();
        if provider_subscription_id.trim().is_empty() {
            return Err(ValidationError::empty_field("provider_subscription_id"));
        }
        if amount < 0 {
            return Err(ValidationError::invalid_format(
                "amount",
                "amount cannot be negative",
            ));
        }

        Ok(Self {
            user_id,
            provider_subscription_id,
            amount,
            payment_method,
            payment_type,
            invoice_id: None,
            create_date,
        })
    }

    pub fn with_invoice_id(mut self, invoice_id: Option<String>) -> Self {
        self.invoice_id = invoice_id;
        self
    }

    /// End of the first billing period.
    pub fn expire_date(&self) -> Timestamp {
        self.create_date.add_days(self.payment_type.period_days())
    }

    /// Materializes the record under a freshly assigned id.
    pub fn into_payment(self, id: PaymentId) -> Payment {
        let expire_date = self.expire_date();
        Payment {
            id,
            user_id: self.user_id,
            provider_subscription_id: self.provider_subscription_id,
            amount: self.amount,
            payment_method: self.payment_method,
            payment_type: self.payment_type,
            status: PaymentStatus::Pending,
            invoice_id: self.invoice_id,
            invoice_observed_at: None,
            create_date: self.create_date,
            expire_date,
        }
    }
}

/// Atomic status write guarded by the status and invoice time the caller
/// observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub expected_status: PaymentStatus,
    pub expected_invoice_observed_at: Option<Timestamp>,
    pub new_status: PaymentStatus,
    /// Replaces the stored invoice id when present.
    pub invoice_id: Option<String>,
    /// Written together with `invoice_id`.
    pub invoice_observed_at: Option<Timestamp>,
}

impl StatusUpdate {
    /// Update for a payment that has never recorded a webhook invoice.
    pub fn new(expected_status: PaymentStatus, new_status: PaymentStatus) -> Self {
        Self {
            expected_status,
            expected_invoice_observed_at: None,
            new_status,
            invoice_id: None,
            invoice_observed_at: None,
        }
    }

    /// Update guarded by everything the caller read from `payment`.
    pub fn against(payment: &Payment, new_status: PaymentStatus) -> Self {
        Self {
            expected_invoice_observed_at: payment.invoice_observed_at,
            ..Self::new(payment.status, new_status)
        }
    }

    pub fn with_invoice(mut self, invoice_id: impl Into<String>, observed_at: Timestamp) -> Self {
        self.invoice_id = Some(invoice_id.into());
        self.invoice_observed_at = Some(observed_at);
        self
    }
}
