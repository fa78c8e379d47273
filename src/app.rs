//! Composition root: wires ports into handlers and handlers into routes.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use secrecy::SecretString;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::adapters::http::{billing_router, BillingAppState};
use crate::application::handlers::billing::{
    ConfirmWalletSubscriptionHandler, CustomerProvisioner, HandleWebhookHandler,
    PayPalWebhookVerifier, PaymentStateMachine, PlanCatalog, StartWalletSubscriptionHandler,
    SubscriptionProvisioningOrchestrator,
};
use crate::domain::billing::StripeWebhookVerifier;
use crate::ports::{CardProvider, Ledger, PaymentEventPublisher, ProcessedEventStore, WalletProvider};

/// Port implementations the service runs against.
#[derive(Clone)]
pub struct BillingPorts {
    pub ledger: Arc<dyn Ledger>,
    pub card_provider: Arc<dyn CardProvider>,
    pub wallet_provider: Arc<dyn WalletProvider>,
    pub publisher: Arc<dyn PaymentEventPublisher>,
    pub processed_events: Option<Arc<dyn ProcessedEventStore>>,
}

/// Secrets, plans and deadlines for the billing handlers.
#[derive(Debug, Clone)]
pub struct BillingSettings {
    pub card_webhook_secret: SecretString,
    pub card_webhook_tolerance_secs: i64,
    pub wallet_webhook_id: String,
    pub card_plans: PlanCatalog,
    pub wallet_plans: PlanCatalog,
    pub provider_timeout: Duration,
}

/// Builds every handler once so lock registries are shared by all requests.
pub fn build_state(ports: BillingPorts, settings: BillingSettings) -> BillingAppState {
    let mut state_machine = PaymentStateMachine::new(ports.ledger.clone(), ports.publisher);
    if let Some(store) = ports.processed_events {
        state_machine = state_machine.with_processed_event_store(store);
    }

    let webhooks = HandleWebhookHandler::new(
        StripeWebhookVerifier::new(settings.card_webhook_secret)
            .with_tolerance_secs(settings.card_webhook_tolerance_secs),
        PayPalWebhookVerifier::new(
            ports.wallet_provider.clone(),
            settings.wallet_webhook_id,
            settings.provider_timeout,
        ),
        Arc::new(state_machine),
    );

    let customers = Arc::new(CustomerProvisioner::new(
        ports.ledger.clone(),
        ports.card_provider.clone(),
        settings.provider_timeout,
    ));
    let card_subscriptions = SubscriptionProvisioningOrchestrator::new(
        ports.ledger.clone(),
        ports.card_provider,
        customers,
        settings.card_plans,
        settings.provider_timeout,
    );

    BillingAppState {
        webhooks: Arc::new(webhooks),
        card_subscriptions: Arc::new(card_subscriptions),
        start_wallet_subscription: Arc::new(StartWalletSubscriptionHandler::new(
            ports.ledger.clone(),
            ports.wallet_provider.clone(),
            settings.wallet_plans.clone(),
            settings.provider_timeout,
        )),
        confirm_wallet_subscription: Arc::new(ConfirmWalletSubscriptionHandler::new(
            ports.ledger,
            ports.wallet_provider,
            settings.wallet_plans,
            settings.provider_timeout,
        )),
    }
}

/// HTTP application with request ids, tracing and a request deadline.
pub fn router(state: BillingAppState, request_timeout: Duration) -> Router {
    Router::new()
        .nest("/api", billing_router())
        .route("/health", axum::routing::get(|| async { "ok" }))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}
