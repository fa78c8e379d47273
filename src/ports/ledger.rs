//! Ledger port - durable store of users and payments.
//!
//! # Design
//!
//! - **Single-row atomicity**: every write touches one row
//! - **Compare-and-set status**: status writes name the status they expect
//! - **Unique correlation key**: one payment per `provider_subscription_id`
//! - **Set-if-empty customer id**: guards customer creation across processes

use async_trait::async_trait;

use crate::domain::billing::{NewPayment, Payment, StatusUpdate, User};
use crate::domain::foundation::{DomainError, PaymentId, UserId};

/// Repository port for the payment ledger.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Find the payment a provider subscription belongs to.
    ///
    /// Returns `None` if no payment was provisioned for it.
    async fn find_payment_by_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Payment>, DomainError>;

    /// Find a user by ID.
    async fn find_user_by_id(&self, user_id: &UserId) -> Result<Option<User>, DomainError>;

    /// Insert a user.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the id already exists
    async fn create_user(&self, user: &User) -> Result<(), DomainError>;

    /// Insert a `PENDING` payment.
    ///
    /// # Errors
    ///
    /// - `DuplicateSubscription` if the provider subscription id is taken
    /// - `UserNotFound` if the owning user does not exist
    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, DomainError>;

    /// Atomically write a new status and optional invoice id.
    ///
    /// # Errors
    ///
    /// - `PaymentNotFound` if no such payment exists
    /// - `ConcurrentModification` if the stored status differs from
    ///   `update.expected_status`
    /// - `InvalidStateTransition` if the move is not allowed
    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        update: StatusUpdate,
    ) -> Result<Payment, DomainError>;

    /// Store the provider customer id if the user has none yet.
    ///
    /// Returns the id that is stored after the call, which is the existing
    /// one when another writer got there first.
    async fn update_user_customer_id(
        &self,
        user_id: &UserId,
        provider_customer_id: &str,
    ) -> Result<String, DomainError>;

    /// Replace the user's default payment instrument.
    async fn update_user_default_instrument(
        &self,
        user_id: &UserId,
        instrument_id: &str,
    ) -> Result<(), DomainError>;
}
