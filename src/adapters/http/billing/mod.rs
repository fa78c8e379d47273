//! HTTP adapter for billing endpoints.
//!
//! - `POST /api/webhooks/card` - Card provider webhooks
//! - `POST /api/webhooks/wallet` - Wallet provider webhooks
//! - `POST /api/subscriptions/card` - Provision a card subscription
//! - `POST /api/subscriptions/wallet` - Start a wallet subscription
//! - `POST /api/subscriptions/wallet/confirm` - Confirm a wallet subscription

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{BillingApiError, BillingAppState};
pub use routes::billing_router;
