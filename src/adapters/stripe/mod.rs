//! Stripe card provider adapter.
//!
//! Implements the `CardProvider` port against the Stripe REST API, plus a
//! configurable mock for tests. Webhook verification lives in the domain
//! (`StripeWebhookVerifier`) since it needs no network call.
//!
//! # Configuration
//!
//! - `BILLING_RECONCILER__CARD__API_KEY`: Stripe secret API key
//! - `BILLING_RECONCILER__CARD__WEBHOOK_SECRET`: Webhook signing secret (whsec_...)

mod mock_card_provider;
mod stripe_adapter;

pub use mock_card_provider::{MethodCall, MockCardProvider};
pub use stripe_adapter::{StripeCardAdapter, StripeConfig};
