//! Wallet subscription handlers.
//!
//! The wallet flow has two halves. `StartWalletSubscriptionHandler` creates
//! the subscription at the provider and hands back the approval link. After
//! the customer approves, `ConfirmWalletSubscriptionHandler` fetches the
//! subscription and records the PENDING payment; activation then arrives by
//! webhook like any other lifecycle event.

use std::sync::Arc;
use std::time::Duration;

use crate::application::call_provider;
use crate::domain::billing::{
    NewPayment, Payment, PaymentMethod, PaymentType, ProvisioningError, ProvisioningStep,
    StepError,
};
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp, UserId};
use crate::ports::{Ledger, WalletProvider};

use super::provision_card_subscription::PlanCatalog;

// ════════════════════════════════════════════════════════════════════════════════
// Start
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct StartWalletSubscriptionCommand {
    pub user_id: UserId,
    pub payment_type: PaymentType,
}

#[derive(Debug, Clone)]
pub struct StartWalletSubscriptionResult {
    pub subscription_id: String,
    pub status: String,
    pub approval_url: Option<String>,
}

pub struct StartWalletSubscriptionHandler {
    ledger: Arc<dyn Ledger>,
    wallet_provider: Arc<dyn WalletProvider>,
    plans: PlanCatalog,
    provider_timeout: Duration,
}

impl StartWalletSubscriptionHandler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        wallet_provider: Arc<dyn WalletProvider>,
        plans: PlanCatalog,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            wallet_provider,
            plans,
            provider_timeout,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartWalletSubscriptionCommand,
    ) -> Result<StartWalletSubscriptionResult, ProvisioningError> {
        let step = ProvisioningStep::CreateSubscription;

        // 1. User must exist
        self.ledger
            .find_user_by_id(&cmd.user_id)
            .await
            .map_err(|e| ProvisioningError::step_failed(step, e.into()))?
            .ok_or(ProvisioningError::UserNotFound(cmd.user_id))?;

        // 2. Token
        let token = call_provider(
            self.provider_timeout,
            "generate_access_token",
            self.wallet_provider.generate_access_token(),
        )
        .await
        .map_err(|e| ProvisioningError::step_failed(step, e.into()))?;

        // 3. Subscription awaiting approval
        let plan_id = &self.plans.plan(cmd.payment_type).price_id;
        let subscription = call_provider(
            self.provider_timeout,
            "create_subscription",
            self.wallet_provider.create_subscription(&token, plan_id),
        )
        .await
        .map_err(|e| ProvisioningError::step_failed(step, e.into()))?;

        tracing::info!(
            user_id = %cmd.user_id,
            subscription_id = %subscription.id,
            status = %subscription.status,
            "wallet subscription created"
        );

        Ok(StartWalletSubscriptionResult {
            subscription_id: subscription.id,
            status: subscription.status,
            approval_url: subscription.approval_url,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Confirm
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct ConfirmWalletSubscriptionCommand {
    pub user_id: UserId,
    pub subscription_id: String,
    /// Used when the provider's plan id matches no configured plan.
    pub payment_type: PaymentType,
}

#[derive(Debug, Clone)]
pub struct ConfirmWalletSubscriptionResult {
    pub payment: Payment,
    /// False when an earlier confirmation already recorded the payment.
    pub created: bool,
}

pub struct ConfirmWalletSubscriptionHandler {
    ledger: Arc<dyn Ledger>,
    wallet_provider: Arc<dyn WalletProvider>,
    plans: PlanCatalog,
    provider_timeout: Duration,
}

impl ConfirmWalletSubscriptionHandler {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        wallet_provider: Arc<dyn WalletProvider>,
        plans: PlanCatalog,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            wallet_provider,
            plans,
            provider_timeout,
        }
    }

    pub async fn handle(
        &self,
        cmd: ConfirmWalletSubscriptionCommand,
    ) -> Result<ConfirmWalletSubscriptionResult, ProvisioningError> {
        if cmd.subscription_id.trim().is_empty() {
            return Err(ProvisioningError::InvalidRequest(
                "subscription_id is required".to_string(),
            ));
        }
        let persist = ProvisioningStep::PersistPendingPayment;

        // 1. User must exist
        self.ledger
            .find_user_by_id(&cmd.user_id)
            .await
            .map_err(|e| ProvisioningError::step_failed(persist, e.into()))?
            .ok_or(ProvisioningError::UserNotFound(cmd.user_id))?;

        // 2. Already recorded?
        let existing = self
            .ledger
            .find_payment_by_subscription_id(&cmd.subscription_id)
            .await
            .map_err(|e| ProvisioningError::step_failed(persist, e.into()))?;
        if let Some(payment) = existing {
            return Self::existing_payment(&cmd, payment);
        }

        // 3. Provider must know the subscription
        let fetch = ProvisioningStep::CreateSubscription;
        let token = call_provider(
            self.provider_timeout,
            "generate_access_token",
            self.wallet_provider.generate_access_token(),
        )
        .await
        .map_err(|e| ProvisioningError::step_failed(fetch, e.into()))?;
        let subscription = call_provider(
            self.provider_timeout,
            "get_subscription",
            self.wallet_provider
                .get_subscription(&token, &cmd.subscription_id),
        )
        .await
        .map_err(|e| ProvisioningError::step_failed(fetch, e.into()))?
        .ok_or_else(|| {
            ProvisioningError::step_failed(
                fetch,
                StepError::ProviderRejected(format!(
                    "subscription {} not found at provider",
                    cmd.subscription_id
                )),
            )
        })?;

        // 4. PENDING payment
        let payment_type = subscription
            .plan_id
            .as_deref()
            .and_then(|plan_id| self.plans.payment_type_for(plan_id))
            .unwrap_or(cmd.payment_type);
        let new_payment = NewPayment::pending(
            cmd.user_id,
            subscription.id.clone(),
            self.plans.plan(payment_type).amount,
            PaymentMethod::Wallet,
            payment_type,
            Timestamp::now(),
        )
        .map_err(|e| ProvisioningError::step_failed(persist, DomainError::from(e).into()))?;

        match self.ledger.create_payment(new_payment).await {
            Ok(payment) => {
                tracing::info!(
                    user_id = %cmd.user_id,
                    subscription_id = %payment.provider_subscription_id,
                    provider_status = %subscription.status,
                    "wallet payment recorded"
                );
                Ok(ConfirmWalletSubscriptionResult {
                    payment,
                    created: true,
                })
            }
            // A concurrent confirmation won the insert.
            Err(e) if e.code == ErrorCode::DuplicateSubscription => {
                let payment = self
                    .ledger
                    .find_payment_by_subscription_id(&cmd.subscription_id)
                    .await
                    .map_err(|e| ProvisioningError::step_failed(persist, e.into()))?
                    .ok_or_else(|| ProvisioningError::step_failed(persist, e.into()))?;
                Self::existing_payment(&cmd, payment)
            }
            Err(e) => Err(ProvisioningError::step_failed(persist, e.into())),
        }
    }

    fn existing_payment(
        cmd: &ConfirmWalletSubscriptionCommand,
        payment: Payment,
    ) -> Result<ConfirmWalletSubscriptionResult, ProvisioningError> {
        if payment.user_id != cmd.user_id {
            tracing::warn!(
                user_id = %cmd.user_id,
                owner_id = %payment.user_id,
                subscription_id = %cmd.subscription_id,
                "wallet subscription already belongs to another user"
            );
            return Err(ProvisioningError::step_failed(
                ProvisioningStep::PersistPendingPayment,
                StepError::Ledger(
                    DomainError::new(
                        ErrorCode::DuplicateSubscription,
                        "Subscription is recorded for another user",
                    )
                    .with_detail("subscription_id", cmd.subscription_id.clone()),
                ),
            ));
        }
        Ok(ConfirmWalletSubscriptionResult {
            payment,
            created: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;

    use crate::adapters::memory::InMemoryLedger;
    use crate::adapters::paypal::MockWalletProvider;
    use crate::application::handlers::billing::PlanPrice;
    use crate::domain::billing::{PaymentStatus, User};
    use crate::ports::{ProviderError, WalletSubscription};

    fn plans() -> PlanCatalog {
        PlanCatalog {
            monthly: PlanPrice {
                price_id: "P-MONTHLY".to_string(),
                amount: 10,
            },
            yearly: PlanPrice {
                price_id: "P-YEARLY".to_string(),
                amount: 100,
            },
        }
    }

    struct Fixture {
        ledger: InMemoryLedger,
        wallet: MockWalletProvider,
        start: StartWalletSubscriptionHandler,
        confirm: ConfirmWalletSubscriptionHandler,
        user: User,
    }

    async fn fixture() -> Fixture {
        let ledger = InMemoryLedger::new();
        let user = User::new("ada@example.com", "Ada");
        ledger.create_user(&user).await.unwrap();
        let wallet = MockWalletProvider::new();
        let timeout = Duration::from_secs(5);
        Fixture {
            start: StartWalletSubscriptionHandler::new(
                Arc::new(ledger.clone()),
                Arc::new(wallet.clone()),
                plans(),
                timeout,
            ),
            confirm: ConfirmWalletSubscriptionHandler::new(
                Arc::new(ledger.clone()),
                Arc::new(wallet.clone()),
                plans(),
                timeout,
            ),
            ledger,
            wallet,
            user,
        }
    }

    fn confirm_cmd(user_id: UserId, subscription_id: &str) -> ConfirmWalletSubscriptionCommand {
        ConfirmWalletSubscriptionCommand {
            user_id,
            subscription_id: subscription_id.to_string(),
            payment_type: PaymentType::Monthly,
        }
    }

    #[tokio::test]
    async fn start_returns_approval_link_without_ledger_write() {
        let f = fixture().await;

        let result = f
            .start
            .handle(StartWalletSubscriptionCommand {
                user_id: f.user.id,
                payment_type: PaymentType::Yearly,
            })
            .await
            .unwrap();

        assert_eq!(result.status, "APPROVAL_PENDING");
        assert!(result.approval_url.is_some());
        assert_eq!(f.ledger.payment_count().await, 0);
        assert_eq!(f.wallet.calls()[1].args, vec!["P-YEARLY"]);
    }

    #[tokio::test]
    async fn confirm_records_pending_payment_for_plan() {
        let f = fixture().await;
        let started = f
            .start
            .handle(StartWalletSubscriptionCommand {
                user_id: f.user.id,
                payment_type: PaymentType::Yearly,
            })
            .await
            .unwrap();

        let result = f
            .confirm
            .handle(confirm_cmd(f.user.id, &started.subscription_id))
            .await
            .unwrap();

        assert!(result.created);
        assert_eq!(result.payment.status, PaymentStatus::Pending);
        assert_eq!(result.payment.payment_method, PaymentMethod::Wallet);
        assert_eq!(result.payment.payment_type, PaymentType::Yearly);
        assert_eq!(result.payment.amount, 100);
    }

    #[tokio::test]
    async fn repeated_confirm_is_idempotent() {
        let f = fixture().await;
        f.wallet.insert_subscription(WalletSubscription {
            id: "I-1".to_string(),
            status: "ACTIVE".to_string(),
            plan_id: Some("P-MONTHLY".to_string()),
            approval_url: None,
        });

        let first = f.confirm.handle(confirm_cmd(f.user.id, "I-1")).await.unwrap();
        let second = f.confirm.handle(confirm_cmd(f.user.id, "I-1")).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.payment.id, second.payment.id);
        assert_eq!(f.ledger.payment_count().await, 1);
    }

    #[tokio::test]
    async fn confirm_by_another_user_conflicts() {
        let f = fixture().await;
        f.wallet.insert_subscription(WalletSubscription {
            id: "I-1".to_string(),
            status: "ACTIVE".to_string(),
            plan_id: None,
            approval_url: None,
        });
        f.confirm.handle(confirm_cmd(f.user.id, "I-1")).await.unwrap();
        let other = User::new("bob@example.com", "Bob");
        f.ledger.create_user(&other).await.unwrap();

        let err = f.confirm.handle(confirm_cmd(other.id, "I-1")).await.unwrap_err();

        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn subscription_unknown_to_provider_is_rejected() {
        let f = fixture().await;

        let err = f.confirm.handle(confirm_cmd(f.user.id, "I-NOPE")).await.unwrap_err();

        assert_eq!(err.failed_step(), Some(ProvisioningStep::CreateSubscription));
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(f.ledger.payment_count().await, 0);
    }

    #[tokio::test]
    async fn provider_outage_is_retryable() {
        let f = fixture().await;
        f.wallet
            .set_method_error("generate_access_token", ProviderError::network("down"));

        let err = f.confirm.handle(confirm_cmd(f.user.id, "I-1")).await.unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let f = fixture().await;

        let err = f
            .start
            .handle(StartWalletSubscriptionCommand {
                user_id: UserId::new(),
                payment_type: PaymentType::Monthly,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ProvisioningError::UserNotFound(_)));
        assert!(!f.wallet.was_called("generate_access_token"));
    }
}
