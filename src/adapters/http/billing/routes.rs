//! Axum router configuration for billing endpoints.

use axum::{routing::post, Router};

use super::handlers::{
    confirm_wallet_subscription, create_card_subscription, handle_card_webhook,
    handle_wallet_webhook, start_wallet_subscription, BillingAppState,
};

/// Provider notification routes.
///
/// No user authentication; every request is signature-verified.
///
/// # Routes
/// - `POST /card` - Card provider webhooks
/// - `POST /wallet` - Wallet provider webhooks
pub fn webhook_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/card", post(handle_card_webhook))
        .route("/wallet", post(handle_wallet_webhook))
}

/// Subscription provisioning routes. Require `X-User-Id`.
///
/// # Routes
/// - `POST /card` - Provision a card subscription
/// - `POST /wallet` - Start a wallet subscription
/// - `POST /wallet/confirm` - Record an approved wallet subscription
pub fn subscription_routes() -> Router<BillingAppState> {
    Router::new()
        .route("/card", post(create_card_subscription))
        .route("/wallet", post(start_wallet_subscription))
        .route("/wallet/confirm", post(confirm_wallet_subscription))
}

/// Complete billing router, mounted under `/api`.
pub fn billing_router() -> Router<BillingAppState> {
    Router::new()
        .nest("/webhooks", webhook_routes())
        .nest("/subscriptions", subscription_routes())
}
