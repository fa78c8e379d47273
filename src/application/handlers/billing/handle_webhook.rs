//! HandleWebhookHandler - verify, normalize, reconcile.
//!
//! Nothing is parsed or read from the ledger before the payload is
//! authenticated.

use std::sync::Arc;

use crate::domain::billing::{
    normalize, AuthenticatedPayload, IgnoreReason, NormalizedEvent, PaymentStatus,
    StripeWebhookVerifier, WebhookError, STRIPE_SIGNATURE_HEADER,
};

use super::payment_state_machine::{ApplyOutcome, PaymentStateMachine};
use super::wallet_webhook_verifier::{PayPalWebhookVerifier, WalletTransmissionHeaders};

/// One delivered provider notification, exactly as received.
#[derive(Debug, Clone)]
pub enum HandleWebhookCommand {
    Card {
        body: Vec<u8>,
        signature: Option<String>,
    },
    Wallet {
        body: Vec<u8>,
        headers: WalletTransmissionHeaders,
    },
}

/// How a verified notification was handled. Every variant is acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied(PaymentStatus),
    Ignored(IgnoreReason),
    /// Event type the ledger has no use for.
    Unsupported,
}

pub struct HandleWebhookHandler {
    card_verifier: StripeWebhookVerifier,
    wallet_verifier: PayPalWebhookVerifier,
    state_machine: Arc<PaymentStateMachine>,
}

impl HandleWebhookHandler {
    pub fn new(
        card_verifier: StripeWebhookVerifier,
        wallet_verifier: PayPalWebhookVerifier,
        state_machine: Arc<PaymentStateMachine>,
    ) -> Self {
        Self {
            card_verifier,
            wallet_verifier,
            state_machine,
        }
    }

    pub async fn handle(&self, cmd: HandleWebhookCommand) -> Result<WebhookOutcome, WebhookError> {
        let payload = self.authenticate(cmd).await.inspect_err(|e| {
            tracing::warn!(error = %e, "webhook rejected");
        })?;

        let event = match normalize(&payload)? {
            NormalizedEvent::Lifecycle(event) => event,
            NormalizedEvent::Unsupported {
                provider,
                event_id,
                event_type,
            } => {
                tracing::debug!(
                    provider = provider.as_str(),
                    event_id = %event_id,
                    event_type = %event_type,
                    "unsupported webhook event acknowledged"
                );
                return Ok(WebhookOutcome::Unsupported);
            }
        };

        match self.state_machine.apply(&event).await? {
            ApplyOutcome::Applied(status) => Ok(WebhookOutcome::Applied(status)),
            ApplyOutcome::Ignored(reason) => Ok(WebhookOutcome::Ignored(reason)),
        }
    }

    async fn authenticate(
        &self,
        cmd: HandleWebhookCommand,
    ) -> Result<AuthenticatedPayload, WebhookError> {
        match cmd {
            HandleWebhookCommand::Card { body, signature } => {
                let signature =
                    signature.ok_or(WebhookError::MissingHeader(STRIPE_SIGNATURE_HEADER))?;
                self.card_verifier.verify(&body, &signature)
            }
            HandleWebhookCommand::Wallet { body, headers } => {
                self.wallet_verifier.verify(&body, headers).await
            }
        }
    }
}
