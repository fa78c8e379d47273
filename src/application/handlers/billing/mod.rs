//! Billing handlers.
//!
//! - `PaymentStateMachine` - reconciles lifecycle events into the ledger
//! - `HandleWebhookHandler` - verifies and dispatches provider notifications
//! - `SubscriptionProvisioningOrchestrator` - card subscription saga
//! - Wallet start/confirm handlers

mod customer_provisioner;
mod handle_webhook;
mod payment_method_binder;
mod payment_state_machine;
mod provision_card_subscription;
mod wallet_subscription;
mod wallet_webhook_verifier;

pub use customer_provisioner::CustomerProvisioner;
pub use handle_webhook::{HandleWebhookCommand, HandleWebhookHandler, WebhookOutcome};
pub use payment_method_binder::PaymentMethodBinder;
pub use payment_state_machine::{ApplyOutcome, PaymentStateMachine};
pub use provision_card_subscription::{
    PlanCatalog, PlanPrice, ProvisionCardSubscriptionCommand, ProvisionCardSubscriptionResult,
    SubscriptionProvisioningOrchestrator,
};
pub use wallet_subscription::{
    ConfirmWalletSubscriptionCommand, ConfirmWalletSubscriptionHandler,
    ConfirmWalletSubscriptionResult, StartWalletSubscriptionCommand,
    StartWalletSubscriptionHandler, StartWalletSubscriptionResult,
};
pub use wallet_webhook_verifier::{
    PayPalWebhookVerifier, WalletTransmissionHeaders, AUTH_ALGO_HEADER, CERT_URL_HEADER,
    TRANSMISSION_ID_HEADER, TRANSMISSION_SIG_HEADER, TRANSMISSION_TIME_HEADER,
};
