//! In-memory ledger.
//!
//! Holds users and payments behind one `tokio` lock, so every operation is
//! atomic the same way a single-row database write is. Useful for tests
//! and local development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::billing::{NewPayment, Payment, StatusUpdate, User};
use crate::domain::foundation::{DomainError, ErrorCode, PaymentId, UserId};
use crate::ports::Ledger;

#[derive(Debug, Default)]
struct LedgerState {
    users: HashMap<UserId, User>,
    payments: HashMap<PaymentId, Payment>,
    by_subscription: HashMap<String, PaymentId>,
}

/// In-memory implementation of `Ledger`.
///
/// Clones share storage. Read and write counters let tests assert that a
/// rejected request never touched the ledger.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
    reads: Arc<AtomicUsize>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of read operations served.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of write operations attempted.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub async fn payments(&self) -> Vec<Payment> {
        self.state.read().await.payments.values().cloned().collect()
    }

    pub async fn payment_count(&self) -> usize {
        self.state.read().await.payments.len()
    }

    /// Snapshot of a payment without counting as a read.
    pub async fn payment_for(&self, provider_subscription_id: &str) -> Option<Payment> {
        let state = self.state.read().await;
        state
            .by_subscription
            .get(provider_subscription_id)
            .and_then(|id| state.payments.get(id))
            .cloned()
    }

    /// Snapshot of a user without counting as a read.
    pub async fn user(&self, user_id: &UserId) -> Option<User> {
        self.state.read().await.users.get(user_id).cloned()
    }

    fn count_read(&self) {
        self.reads.fetch_add(1, Ordering::SeqCst);
    }

    fn count_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn user_not_found(user_id: &UserId) -> DomainError {
    DomainError::new(ErrorCode::UserNotFound, "User not found")
        .with_detail("user_id", user_id.to_string())
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn find_payment_by_subscription_id(
        &self,
        provider_subscription_id: &str,
    ) -> Result<Option<Payment>, DomainError> {
        self.count_read();
        Ok(self.payment_for(provider_subscription_id).await)
    }

    async fn find_user_by_id(&self, user_id: &UserId) -> Result<Option<User>, DomainError> {
        self.count_read();
        Ok(self.user(user_id).await)
    }

    async fn create_user(&self, user: &User) -> Result<(), DomainError> {
        self.count_write();
        let mut state = self.state.write().await;
        if state.users.contains_key(&user.id) {
            return Err(DomainError::validation("id", "User already exists"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn create_payment(&self, payment: NewPayment) -> Result<Payment, DomainError> {
        self.count_write();
        let mut state = self.state.write().await;

        if !state.users.contains_key(&payment.user_id) {
            return Err(user_not_found(&payment.user_id));
        }
        if state
            .by_subscription
            .contains_key(&payment.provider_subscription_id)
        {
            return Err(DomainError::new(
                ErrorCode::DuplicateSubscription,
                "A payment already exists for this subscription",
            )
            .with_detail("subscription_id", payment.provider_subscription_id));
        }

        let payment = payment.into_payment(PaymentId::new());
        state
            .by_subscription
            .insert(payment.provider_subscription_id.clone(), payment.id);
        state.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn update_payment_status(
        &self,
        payment_id: &PaymentId,
        update: StatusUpdate,
    ) -> Result<Payment, DomainError> {
        self.count_write();
        let mut state = self.state.write().await;
        let payment = state.payments.get_mut(payment_id).ok_or_else(|| {
            DomainError::new(ErrorCode::PaymentNotFound, "Payment not found")
                .with_detail("payment_id", payment_id.to_string())
        })?;

        // Work on a copy so a rejected update leaves the row untouched.
        let mut updated = payment.clone();
        updated.apply_update(&update)?;
        *payment = updated.clone();
        Ok(updated)
    }

    async fn update_user_customer_id(
        &self,
        user_id: &UserId,
        provider_customer_id: &str,
    ) -> Result<String, DomainError> {
        self.count_write();
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| user_not_found(user_id))?;

        let stored = user
            .provider_customer_id
            .get_or_insert_with(|| provider_customer_id.to_string());
        Ok(stored.clone())
    }

    async fn update_user_default_instrument(
        &self,
        user_id: &UserId,
        instrument_id: &str,
    ) -> Result<(), DomainError> {
        self.count_write();
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(user_id)
            .ok_or_else(|| user_not_found(user_id))?;
        user.default_payment_instrument_id = Some(instrument_id.to_string());
        Ok(())
    }
}
