//! PayPal wallet provider adapter.
//!
//! Implements the `WalletProvider` port against the PayPal REST API, plus a
//! configurable mock for tests.

mod mock_wallet_provider;
mod paypal_adapter;

pub use mock_wallet_provider::MockWalletProvider;
pub use paypal_adapter::{PayPalConfig, PayPalWalletAdapter};
