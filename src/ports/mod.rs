//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence
//!
//! - `Ledger` - Users and payments
//! - `ProcessedEventStore` - Optional provider event deduplication
//!
//! ## Providers
//!
//! - `CardProvider` - Card-processing provider API
//! - `WalletProvider` - Wallet provider API, including webhook verification
//!
//! ## Fan-out
//!
//! - `PaymentEventPublisher` - Status change notifications

mod card_provider;
mod ledger;
mod payment_event_publisher;
mod processed_event_store;
mod provider_error;
mod wallet_provider;

pub use card_provider::{
    CardProvider, CreateCustomerRequest, CreateSubscriptionRequest, SubscriptionIntent,
};
pub use ledger::Ledger;
pub use payment_event_publisher::{PaymentEventPublisher, PaymentStatusChanged};
pub use processed_event_store::ProcessedEventStore;
pub use provider_error::{ProviderError, ProviderErrorCode};
pub use wallet_provider::{
    AccessToken, WalletProvider, WalletSubscription, WebhookVerificationRequest,
};
