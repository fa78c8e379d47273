//! SubscriptionProvisioningOrchestrator - the card subscription saga.
//!
//! Customer -> instrument -> default -> provider subscription -> PENDING
//! payment. A failed step stops the saga and names itself in the error.
//! Completed provider-side steps are not rolled back; a failure after the
//! provider subscription exists is logged with its id for the sweep. A retry
//! under the same idempotency key that resolves to an already recorded
//! payment of the same user returns that payment.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use uuid::Uuid;

use crate::application::call_provider;
use crate::domain::billing::{
    NewPayment, Payment, PaymentMethod, PaymentType, ProvisioningError, ProvisioningStep,
    StepError,
};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{CardProvider, CreateSubscriptionRequest, Ledger};

use super::customer_provisioner::CustomerProvisioner;
use super::payment_method_binder::PaymentMethodBinder;

/// Provider price and ledger amount for one billing period.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlanPrice {
    pub price_id: String,
    /// Minor units, used when the provider omits the plan amount.
    pub amount: i64,
}

/// Configured plans per billing period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanCatalog {
    pub monthly: PlanPrice,
    pub yearly: PlanPrice,
}

impl PlanCatalog {
    pub fn plan(&self, payment_type: PaymentType) -> &PlanPrice {
        match payment_type {
            PaymentType::Monthly => &self.monthly,
            PaymentType::Yearly => &self.yearly,
        }
    }

    /// Billing period whose configured price id is `price_id`.
    pub fn payment_type_for(&self, price_id: &str) -> Option<PaymentType> {
        [PaymentType::Monthly, PaymentType::Yearly]
            .into_iter()
            .find(|t| self.plan(*t).price_id == price_id)
    }
}

/// Command to start a card subscription.
#[derive(Debug, Clone)]
pub struct ProvisionCardSubscriptionCommand {
    pub user_id: UserId,
    pub instrument_id: String,
    pub payment_type: PaymentType,
    /// Overrides the configured price for `payment_type`.
    pub price_id: Option<String>,
    /// Reused on client retries so the provider returns the same subscription.
    pub idempotency_key: Option<String>,
}

/// Result of a completed saga.
#[derive(Debug, Clone)]
pub struct ProvisionCardSubscriptionResult {
    pub payment: Payment,
    pub customer_id: String,
    /// Raw provider status right after creation.
    pub subscription_status: String,
    pub promoted_instrument_id: Option<String>,
}

pub struct SubscriptionProvisioningOrchestrator {
    ledger: Arc<dyn Ledger>,
    card_provider: Arc<dyn CardProvider>,
    customers: Arc<CustomerProvisioner>,
    binder: PaymentMethodBinder,
    plans: PlanCatalog,
    provider_timeout: Duration,
}

impl SubscriptionProvisioningOrchestrator {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        card_provider: Arc<dyn CardProvider>,
        customers: Arc<CustomerProvisioner>,
        plans: PlanCatalog,
        provider_timeout: Duration,
    ) -> Self {
        let binder =
            PaymentMethodBinder::new(ledger.clone(), card_provider.clone(), provider_timeout);
        Self {
            ledger,
            card_provider,
            customers,
            binder,
            plans,
            provider_timeout,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProvisionCardSubscriptionCommand,
    ) -> Result<ProvisionCardSubscriptionResult, ProvisioningError> {
        if cmd.instrument_id.trim().is_empty() {
            return Err(ProvisioningError::InvalidRequest(
                "instrument_id is required".to_string(),
            ));
        }

        let user = self
            .ledger
            .find_user_by_id(&cmd.user_id)
            .await
            .map_err(|e| self.fail(ProvisioningStep::EnsureCustomer, &cmd, e.into()))?
            .ok_or(ProvisioningError::UserNotFound(cmd.user_id))?;

        // 1. Customer
        let customer_id = self
            .customers
            .ensure_customer(&user)
            .await
            .map_err(|e| self.fail(ProvisioningStep::EnsureCustomer, &cmd, e))?;

        // 2. Instrument
        self.binder
            .bind_instrument(&cmd.instrument_id, &customer_id)
            .await
            .map_err(|e| self.fail(ProvisioningStep::BindInstrument, &cmd, e))?;

        // 3. Default instrument
        let promoted_instrument_id = self
            .binder
            .promote_default_if_needed(&user, &customer_id, &cmd.instrument_id)
            .await
            .map_err(|e| self.fail(ProvisioningStep::PromoteDefault, &cmd, e))?;

        // 4. Provider subscription
        let (price_id, payment_type) = match &cmd.price_id {
            Some(price_id) => (
                price_id.clone(),
                self.plans
                    .payment_type_for(price_id)
                    .unwrap_or(cmd.payment_type),
            ),
            None => (
                self.plans.plan(cmd.payment_type).price_id.clone(),
                cmd.payment_type,
            ),
        };
        let plan = self.plans.plan(payment_type);
        let request = CreateSubscriptionRequest {
            customer_id: customer_id.clone(),
            price_id,
            idempotency_key: cmd
                .idempotency_key
                .clone()
                .unwrap_or_else(|| format!("subscription-{}", Uuid::new_v4())),
        };
        let intent = call_provider(
            self.provider_timeout,
            "create_subscription",
            self.card_provider.create_subscription(request),
        )
        .await
        .map_err(|e| self.fail(ProvisioningStep::CreateSubscription, &cmd, e.into()))?;

        // 5. PENDING payment
        let create_date =
            Timestamp::from_unix_secs(intent.current_period_start).unwrap_or_else(Timestamp::now);
        let amount = intent.plan_amount.unwrap_or(plan.amount);
        let persisted = self
            .persist_pending(
                &cmd,
                payment_type,
                &intent.id,
                amount,
                create_date,
                intent.latest_invoice_id.clone(),
            )
            .await;
        let payment = match persisted {
            Ok(payment) => payment,
            Err(e) => {
                tracing::error!(
                    user_id = %cmd.user_id,
                    customer_id = %customer_id,
                    subscription_id = %intent.id,
                    error = %e,
                    "provider subscription created but payment not persisted; orphaned"
                );
                return Err(ProvisioningError::step_failed(
                    ProvisioningStep::PersistPendingPayment,
                    e,
                ));
            }
        };

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %payment.provider_subscription_id,
            payment_type = %payment.payment_type,
            "card subscription provisioned"
        );

        Ok(ProvisionCardSubscriptionResult {
            payment,
            customer_id,
            subscription_status: intent.status,
            promoted_instrument_id,
        })
    }

    async fn persist_pending(
        &self,
        cmd: &ProvisionCardSubscriptionCommand,
        payment_type: PaymentType,
        subscription_id: &str,
        amount: i64,
        create_date: Timestamp,
        invoice_id: Option<String>,
    ) -> Result<Payment, StepError> {
        let new_payment = NewPayment::pending(
            cmd.user_id,
            subscription_id,
            amount,
            PaymentMethod::Card,
            payment_type,
            create_date,
        )
        .map_err(DomainError::from)?
        .with_invoice_id(invoice_id);

        match self.ledger.create_payment(new_payment).await {
            Ok(payment) => Ok(payment),
            Err(e) if e.code == ErrorCode::DuplicateSubscription => {
                match self
                    .ledger
                    .find_payment_by_subscription_id(subscription_id)
                    .await?
                {
                    Some(existing) if existing.user_id == cmd.user_id => {
                        tracing::info!(
                            user_id = %cmd.user_id,
                            subscription_id,
                            "card subscription retry resolved to recorded payment"
                        );
                        Ok(existing)
                    }
                    _ => Err(e.into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    fn fail(
        &self,
        step: ProvisioningStep,
        cmd: &ProvisionCardSubscriptionCommand,
        cause: StepError,
    ) -> ProvisioningError {
        tracing::warn!(
            user_id = %cmd.user_id,
            %step,
            error = %cause,
            "card subscription provisioning failed"
        );
        ProvisioningError::step_failed(step, cause)
    }
}
