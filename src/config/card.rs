//! Card provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::application::handlers::billing::{PlanCatalog, PlanPrice};

use super::error::ValidationError;

/// Card provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CardProviderConfig {
    /// Secret API key (`sk_...`)
    pub api_key: SecretString,

    /// Webhook signing secret (`whsec_...`)
    pub webhook_secret: SecretString,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Allowed age of a webhook signature, in seconds
    #[serde(default = "default_webhook_tolerance")]
    pub webhook_tolerance_secs: i64,

    pub monthly_price_id: String,
    pub monthly_amount: i64,
    pub yearly_price_id: String,
    pub yearly_amount: i64,
}

impl CardProviderConfig {
    pub fn is_test_mode(&self) -> bool {
        self.api_key.expose_secret().starts_with("sk_test_")
    }

    pub fn plans(&self) -> PlanCatalog {
        PlanCatalog {
            monthly: PlanPrice {
                price_id: self.monthly_price_id.clone(),
                amount: self.monthly_amount,
            },
            yearly: PlanPrice {
                price_id: self.yearly_price_id.clone(),
                amount: self.yearly_amount,
            },
        }
    }

    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        let api_key = self.api_key.expose_secret();
        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("CARD__API_KEY"));
        }
        if !api_key.starts_with("sk_") {
            return Err(ValidationError::InvalidCardApiKey);
        }
        if !self.webhook_secret.expose_secret().starts_with("whsec_") {
            return Err(ValidationError::InvalidCardWebhookSecret);
        }
        if self.monthly_price_id.is_empty() {
            return Err(ValidationError::MissingRequired("CARD__MONTHLY_PRICE_ID"));
        }
        if self.yearly_price_id.is_empty() {
            return Err(ValidationError::MissingRequired("CARD__YEARLY_PRICE_ID"));
        }
        if self.monthly_amount <= 0 {
            return Err(ValidationError::InvalidPlanAmount("CARD__MONTHLY_AMOUNT"));
        }
        if self.yearly_amount <= 0 {
            return Err(ValidationError::InvalidPlanAmount("CARD__YEARLY_AMOUNT"));
        }
        if production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::ProviderUrlMustBeHttps("CARD__BASE_URL"));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_webhook_tolerance() -> i64 {
    300
}
