//! PaymentMethodBinder - attaches instruments and promotes the default.

use std::sync::Arc;
use std::time::Duration;

use crate::application::call_provider;
use crate::domain::billing::{StepError, User};
use crate::domain::foundation::UserId;
use crate::ports::{CardProvider, Ledger};

pub struct PaymentMethodBinder {
    ledger: Arc<dyn Ledger>,
    card_provider: Arc<dyn CardProvider>,
    provider_timeout: Duration,
}

impl PaymentMethodBinder {
    pub fn new(
        ledger: Arc<dyn Ledger>,
        card_provider: Arc<dyn CardProvider>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            card_provider,
            provider_timeout,
        }
    }

    /// Attach the instrument to the customer at the provider.
    pub async fn bind_instrument(
        &self,
        instrument_id: &str,
        customer_id: &str,
    ) -> Result<(), StepError> {
        call_provider(
            self.provider_timeout,
            "attach_instrument",
            self.card_provider.attach_instrument(instrument_id, customer_id),
        )
        .await?;
        Ok(())
    }

    /// Make the instrument the customer's default and record it on the user.
    pub async fn promote_to_default(
        &self,
        user_id: &UserId,
        customer_id: &str,
        instrument_id: &str,
    ) -> Result<String, StepError> {
        call_provider(
            self.provider_timeout,
            "set_default_instrument",
            self.card_provider
                .set_default_instrument(customer_id, instrument_id),
        )
        .await?;

        self.ledger
            .update_user_default_instrument(user_id, instrument_id)
            .await?;
        Ok(instrument_id.to_string())
    }

    /// Promote only when the instrument is not already the stored default.
    ///
    /// Returns the promoted id, or `None` when nothing was done.
    pub async fn promote_default_if_needed(
        &self,
        user: &User,
        customer_id: &str,
        instrument_id: &str,
    ) -> Result<Option<String>, StepError> {
        if !user.needs_default_promotion(instrument_id) {
            return Ok(None);
        }
        self.promote_to_default(&user.id, customer_id, instrument_id)
            .await
            .map(Some)
    }
}
