//! Wallet provider port.
//!
//! The wallet provider authenticates with short-lived OAuth access tokens
//! and verifies webhook signatures server-side, so verification is a
//! provider call rather than a local HMAC check.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::provider_error::ProviderError;

/// Port for the wallet-based provider.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Exchange client credentials for an access token.
    async fn generate_access_token(&self) -> Result<AccessToken, ProviderError>;

    /// Create a subscription for a plan. The customer approves it out of band.
    async fn create_subscription(
        &self,
        token: &AccessToken,
        plan_id: &str,
    ) -> Result<WalletSubscription, ProviderError>;

    /// Fetch a subscription by id. Returns `None` if it does not exist.
    async fn get_subscription(
        &self,
        token: &AccessToken,
        subscription_id: &str,
    ) -> Result<Option<WalletSubscription>, ProviderError>;

    /// Ask the provider whether the transmission signature is authentic.
    async fn verify_webhook_signature(
        &self,
        token: &AccessToken,
        request: &WebhookVerificationRequest,
    ) -> Result<bool, ProviderError>;
}

/// Bearer token for wallet provider calls.
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::new(token.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Subscription as known to the wallet provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSubscription {
    pub id: String,
    /// Raw provider status, e.g. `APPROVAL_PENDING` or `ACTIVE`.
    pub status: String,
    pub plan_id: Option<String>,
    /// Link the customer follows to approve the subscription.
    pub approval_url: Option<String>,
}

/// Transmission headers plus the exact body that was delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookVerificationRequest {
    pub transmission_id: String,
    pub transmission_time: String,
    pub cert_url: String,
    pub auth_algo: String,
    pub transmission_sig: String,
    /// Webhook id configured for this endpoint at the provider.
    pub webhook_id: String,
    pub body: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn WalletProvider) {}

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("A21AAF-secret");
        assert_eq!(format!("{:?}", token), "AccessToken([REDACTED])");
        assert_eq!(token.expose(), "A21AAF-secret");
    }
}
