//! Wallet provider configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::application::handlers::billing::{PlanCatalog, PlanPrice};

use super::error::ValidationError;

/// Wallet provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WalletProviderConfig {
    pub client_id: String,

    pub client_secret: SecretString,

    /// Webhook id registered at the provider; part of every verification call
    pub webhook_id: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub monthly_plan_id: String,
    pub monthly_amount: i64,
    pub yearly_plan_id: String,
    pub yearly_amount: i64,
}

impl WalletProviderConfig {
    pub fn plans(&self) -> PlanCatalog {
        PlanCatalog {
            monthly: PlanPrice {
                price_id: self.monthly_plan_id.clone(),
                amount: self.monthly_amount,
            },
            yearly: PlanPrice {
                price_id: self.yearly_plan_id.clone(),
                amount: self.yearly_amount,
            },
        }
    }

    pub fn validate(&self, production: bool) -> Result<(), ValidationError> {
        if self.client_id.is_empty() {
            return Err(ValidationError::MissingRequired("WALLET__CLIENT_ID"));
        }
        if self.client_secret.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("WALLET__CLIENT_SECRET"));
        }
        if self.webhook_id.is_empty() {
            return Err(ValidationError::MissingRequired("WALLET__WEBHOOK_ID"));
        }
        if self.monthly_plan_id.is_empty() {
            return Err(ValidationError::MissingRequired("WALLET__MONTHLY_PLAN_ID"));
        }
        if self.yearly_plan_id.is_empty() {
            return Err(ValidationError::MissingRequired("WALLET__YEARLY_PLAN_ID"));
        }
        if self.monthly_amount <= 0 {
            return Err(ValidationError::InvalidPlanAmount("WALLET__MONTHLY_AMOUNT"));
        }
        if self.yearly_amount <= 0 {
            return Err(ValidationError::InvalidPlanAmount("WALLET__YEARLY_AMOUNT"));
        }
        if production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::ProviderUrlMustBeHttps("WALLET__BASE_URL"));
        }
        Ok(())
    }
}

fn default_base_url() -> String {
    "https://api-m.paypal.com".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WalletProviderConfig {
        WalletProviderConfig {
            client_id: "client".to_string(),
            client_secret: SecretString::new("secret".to_string()),
            webhook_id: "WH-1".to_string(),
            base_url: default_base_url(),
            monthly_plan_id: "P-MONTHLY".to_string(),
            monthly_amount: 10,
            yearly_plan_id: "P-YEARLY".to_string(),
            yearly_amount: 100,
        }
    }

    #[test]
    fn test_valid_config() {
        assert!(config().validate(true).is_ok());
    }

    #[test]
    fn test_missing_webhook_id() {
        let config = WalletProviderConfig {
            webhook_id: String::new(),
            ..config()
        };
        assert_eq!(
            config.validate(false),
            Err(ValidationError::MissingRequired("WALLET__WEBHOOK_ID"))
        );
    }

    #[test]
    fn test_sandbox_url_allowed_outside_production() {
        let config = WalletProviderConfig {
            base_url: "http://localhost:9000".to_string(),
            ..config()
        };
        assert!(config.validate(false).is_ok());
        assert!(config.validate(true).is_err());
    }

    #[test]
    fn test_plans_map_billing_periods() {
        let plans = config().plans();
        assert_eq!(plans.yearly.price_id, "P-YEARLY");
        assert_eq!(plans.yearly.amount, 100);
    }
}
