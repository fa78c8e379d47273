//! Billing domain - payments, users, and the provider event lifecycle.
//!
//! Pure domain logic: the transition table, webhook signature checks, and
//! provider payload normalization. Persistence and provider calls live
//! behind the ports.

mod errors;
mod event_normalizer;
mod lifecycle_event;
mod payment;
mod paypal_event;
mod status;
mod stripe_event;
mod transition;
mod user;
mod webhook_errors;
mod webhook_verifier;

pub use errors::{ApplyError, ProvisioningError, ProvisioningStep, StepError};
pub use event_normalizer::{normalize, NormalizedEvent};
pub use lifecycle_event::{LifecycleEvent, LifecycleEventType, ObservedStatus, Provider};
pub use payment::{NewPayment, Payment, StatusUpdate};
pub use paypal_event::{PayPalEvent, PayPalEventType};
pub use status::{PaymentMethod, PaymentStatus, PaymentType};
pub use stripe_event::{StripeEvent, StripeEventType};
pub use transition::{evaluate, IgnoreReason, TransitionDecision};
pub use user::User;
pub use webhook_errors::WebhookError;
pub use webhook_verifier::{
    AuthenticatedPayload, SignatureHeader, StripeWebhookVerifier, DEFAULT_TOLERANCE_SECS,
    STRIPE_SIGNATURE_HEADER,
};
