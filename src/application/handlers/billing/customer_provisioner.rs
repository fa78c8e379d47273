//! CustomerProvisioner - ensures a user has a card provider customer.

use std::sync::Arc;
use std::time::Duration;

use crate::application::{call_provider, KeyedMutex};
use crate::domain::billing::{StepError, User};
use crate::domain::foundation::{DomainError, ErrorCode, UserId};
use crate::ports::{CardProvider, CreateCustomerRequest, Ledger};

/// Creates the provider customer at most once per user.
///
/// Calls for the same user are serialized in-process; the ledger's
/// set-if-empty write covers other processes. Share one instance.
pub struct CustomerProvisioner {
    ledger: Arc<dyn Ledger>,
    card_provider: Arc<dyn CardProvider>,
    provider_timeout: Duration,
    locks: KeyedMutex<UserId>,
}

impl CustomerProvisioner {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        card_provider: Arc<dyn CardProvider>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            card_provider,
            provider_timeout,
            locks: KeyedMutex::new(),
        }
    }

    /// Returns the user's provider customer id, creating it if needed.
    ///
    /// The user row is untouched when the provider call fails.
    pub async fn ensure_customer(&self, user: &User) -> Result<String, StepError> {
        if let Some(id) = &user.provider_customer_id {
            return Ok(id.clone());
        }

        let _guard = self.locks.lock(&user.id).await;

        // Re-read under the lock; a concurrent call may have finished first.
        let current = self
            .ledger
            .find_user_by_id(&user.id)
            .await?
            .ok_or_else(|| {
                DomainError::new(ErrorCode::UserNotFound, "User not found")
                    .with_detail("user_id", user.id.to_string())
            })?;
        if let Some(id) = current.provider_customer_id {
            return Ok(id);
        }

        let request = CreateCustomerRequest {
            user_id: current.id,
            email: current.email.clone(),
            name: current.name.clone(),
            idempotency_key: format!("customer-{}", current.id),
        };
        let created = call_provider(
            self.provider_timeout,
            "create_customer",
            self.card_provider.create_customer(request),
        )
        .await?;

        let stored = self
            .ledger
            .update_user_customer_id(&current.id, &created)
            .await?;
        if stored != created {
            tracing::warn!(
                user_id = %current.id,
                created_customer_id = %created,
                stored_customer_id = %stored,
                "customer created concurrently elsewhere; provider customer orphaned"
            );
        } else {
            tracing::info!(user_id = %current.id, customer_id = %stored, "provider customer created");
        }

        Ok(stored)
    }
}
