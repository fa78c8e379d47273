//! Wallet webhook authentication.
//!
//! The wallet provider signs with a certificate chain and offers a
//! verification endpoint, so the check is a provider round trip instead of
//! a local HMAC comparison.

use std::sync::Arc;
use std::time::Duration;

use crate::application::call_provider;
use crate::domain::billing::{AuthenticatedPayload, Provider, WebhookError};
use crate::ports::{ProviderErrorCode, WalletProvider, WebhookVerificationRequest};

pub const TRANSMISSION_ID_HEADER: &str = "paypal-transmission-id";
pub const TRANSMISSION_TIME_HEADER: &str = "paypal-transmission-time";
pub const CERT_URL_HEADER: &str = "paypal-cert-url";
pub const AUTH_ALGO_HEADER: &str = "paypal-auth-algo";
pub const TRANSMISSION_SIG_HEADER: &str = "paypal-transmission-sig";

/// Transmission headers delivered with a wallet webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletTransmissionHeaders {
    pub transmission_id: Option<String>,
    pub transmission_time: Option<String>,
    pub cert_url: Option<String>,
    pub auth_algo: Option<String>,
    pub transmission_sig: Option<String>,
}

impl WalletTransmissionHeaders {
    /// Builds the headers from a lookup such as an HTTP header map.
    pub fn from_lookup<'a>(lookup: impl Fn(&str) -> Option<&'a str>) -> Self {
        let get = |name: &str| lookup(name).map(str::to_string);
        Self {
            transmission_id: get(TRANSMISSION_ID_HEADER),
            transmission_time: get(TRANSMISSION_TIME_HEADER),
            cert_url: get(CERT_URL_HEADER),
            auth_algo: get(AUTH_ALGO_HEADER),
            transmission_sig: get(TRANSMISSION_SIG_HEADER),
        }
    }

    fn into_request(
        self,
        webhook_id: &str,
        body: &[u8],
    ) -> Result<WebhookVerificationRequest, WebhookError> {
        fn required(
            value: Option<String>,
            name: &'static str,
        ) -> Result<String, WebhookError> {
            value
                .filter(|v| !v.trim().is_empty())
                .ok_or(WebhookError::MissingHeader(name))
        }

        Ok(WebhookVerificationRequest {
            transmission_id: required(self.transmission_id, TRANSMISSION_ID_HEADER)?,
            transmission_time: required(self.transmission_time, TRANSMISSION_TIME_HEADER)?,
            cert_url: required(self.cert_url, CERT_URL_HEADER)?,
            auth_algo: required(self.auth_algo, AUTH_ALGO_HEADER)?,
            transmission_sig: required(self.transmission_sig, TRANSMISSION_SIG_HEADER)?,
            webhook_id: webhook_id.to_string(),
            body: body.to_vec(),
        })
    }
}

/// Verifier for wallet provider webhooks.
pub struct PayPalWebhookVerifier {
    wallet_provider: Arc<dyn WalletProvider>,
    webhook_id: String,
    provider_timeout: Duration,
}

impl PayPalWebhookVerifier {
    pub fn new(
        wallet_provider: Arc<dyn WalletProvider>,
        webhook_id: impl Into<String>,
        provider_timeout: Duration,
    ) -> Self {
        Self {
            wallet_provider,
            webhook_id: webhook_id.into(),
            provider_timeout,
        }
    }

    /// Authenticates `body` with the provider.
    ///
    /// # Errors
    ///
    /// - `MissingHeader` - a transmission header was not sent
    /// - `ParseError` - provider refused the body as malformed
    /// - `InvalidSignature` - provider did not confirm the signature
    /// - `ProviderUnavailable` - verification call failed or timed out
    pub async fn verify(
        &self,
        body: &[u8],
        headers: WalletTransmissionHeaders,
    ) -> Result<AuthenticatedPayload, WebhookError> {
        let request = headers.into_request(&self.webhook_id, body)?;

        let token = call_provider(
            self.provider_timeout,
            "generate_access_token",
            self.wallet_provider.generate_access_token(),
        )
        .await
        .map_err(|e| WebhookError::ProviderUnavailable(e.to_string()))?;

        let verified = call_provider(
            self.provider_timeout,
            "verify_webhook_signature",
            self.wallet_provider
                .verify_webhook_signature(&token, &request),
        )
        .await
        .map_err(|e| match e.code {
            ProviderErrorCode::InvalidRequest => WebhookError::ParseError(e.message),
            _ => WebhookError::ProviderUnavailable(e.to_string()),
        })?;

        if !verified {
            tracing::warn!(
                transmission_id = %request.transmission_id,
                "wallet webhook signature rejected by provider"
            );
            return Err(WebhookError::InvalidSignature);
        }

        Ok(AuthenticatedPayload::new(Provider::Wallet, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::adapters::paypal::MockWalletProvider;
    use crate::ports::ProviderError;

    fn headers() -> WalletTransmissionHeaders {
        WalletTransmissionHeaders {
            transmission_id: Some("tx-1".to_string()),
            transmission_time: Some("2024-01-15T10:00:00Z".to_string()),
            cert_url: Some("https://wallet.test/cert.pem".to_string()),
            auth_algo: Some("SHA256withRSA".to_string()),
            transmission_sig: Some("c2ln".to_string()),
        }
    }

    fn verifier(provider: &MockWalletProvider) -> PayPalWebhookVerifier {
        PayPalWebhookVerifier::new(
            Arc::new(provider.clone()),
            "WH-123",
            Duration::from_secs(5),
        )
    }

    const BODY: &[u8] = br#"{"id":"WH-EVT-1","event_type":"BILLING.SUBSCRIPTION.ACTIVATED"}"#;

    #[tokio::test]
    async fn confirmed_signature_yields_exact_body() {
        let provider = MockWalletProvider::new();

        let payload = verifier(&provider).verify(BODY, headers()).await.unwrap();

        assert_eq!(payload.provider(), Provider::Wallet);
        assert_eq!(payload.body(), BODY);
        assert_eq!(
            provider.calls()[1].args,
            vec!["tx-1".to_string(), "WH-123".to_string()]
        );
    }

    #[tokio::test]
    async fn rejected_signature_is_invalid() {
        let provider = MockWalletProvider::new();
        provider.set_signature_valid(false);

        let err = verifier(&provider).verify(BODY, headers()).await.unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
    }

    #[tokio::test]
    async fn missing_header_fails_before_provider_call() {
        let provider = MockWalletProvider::new();
        let mut headers = headers();
        headers.transmission_sig = None;

        let err = verifier(&provider).verify(BODY, headers).await.unwrap_err();

        assert!(matches!(err, WebhookError::MissingHeader(TRANSMISSION_SIG_HEADER)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn body_refused_by_provider_is_parse_error() {
        let provider = MockWalletProvider::new();
        provider.set_method_error(
            "verify_webhook_signature",
            ProviderError::invalid_request("body is not JSON"),
        );

        let err = verifier(&provider)
            .verify(b"not json", headers())
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::ParseError(_)));
    }

    #[tokio::test]
    async fn unsigned_garbage_is_rejected_as_unauthenticated() {
        let provider = MockWalletProvider::new();
        provider.set_signature_valid(false);

        let err = verifier(&provider)
            .verify(b"not json", headers())
            .await
            .unwrap_err();

        assert!(matches!(err, WebhookError::InvalidSignature));
        assert!(provider.was_called("verify_webhook_signature"));
    }

    #[tokio::test]
    async fn provider_outage_is_retryable() {
        let provider = MockWalletProvider::new();
        provider.set_method_error("verify_webhook_signature", ProviderError::network("down"));

        let err = verifier(&provider).verify(BODY, headers()).await.unwrap_err();

        assert!(matches!(err, WebhookError::ProviderUnavailable(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn headers_are_read_from_lookup() {
        let parsed = WalletTransmissionHeaders::from_lookup(|name| match name {
            TRANSMISSION_ID_HEADER => Some("tx-9"),
            AUTH_ALGO_HEADER => Some("SHA256withRSA"),
            _ => None,
        });

        assert_eq!(parsed.transmission_id.as_deref(), Some("tx-9"));
        assert_eq!(parsed.auth_algo.as_deref(), Some("SHA256withRSA"));
        assert!(parsed.cert_url.is_none());
    }
}
