//! Wallet provider adapter over the PayPal REST API.
//!
//! Every call takes a bearer token from `generate_access_token`, which uses
//! the OAuth2 client-credentials grant. Webhook signatures are checked by
//! posting the transmission headers and the exact delivered body to the
//! verification endpoint.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::ports::{
    AccessToken, ProviderError, ProviderErrorCode, WalletProvider, WalletSubscription,
    WebhookVerificationRequest,
};

const DEFAULT_BASE_URL: &str = "https://api-m.paypal.com";

/// PayPal API configuration.
#[derive(Clone)]
pub struct PayPalConfig {
    client_id: String,
    client_secret: SecretString,
    api_base_url: String,
}

impl PayPalConfig {
    pub fn new(client_id: impl Into<String>, client_secret: SecretString) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            api_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (sandbox or tests).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// PayPal implementation of `WalletProvider`.
pub struct PayPalWalletAdapter {
    config: PayPalConfig,
    http_client: reqwest::Client,
}

impl PayPalWalletAdapter {
    pub fn new(config: PayPalConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        operation: &'static str,
        response: reqwest::Response,
    ) -> Result<T, ProviderError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(operation, status = %status, "PayPal request failed");
            return Err(error_from_response(status, &body));
        }

        response.json().await.map_err(|e| {
            ProviderError::new(
                ProviderErrorCode::Unknown,
                format!("Failed to parse PayPal response: {}", e),
            )
        })
    }
}

#[async_trait]
impl WalletProvider for PayPalWalletAdapter {
    async fn generate_access_token(&self) -> Result<AccessToken, ProviderError> {
        let response = self
            .http_client
            .post(self.url("/v1/oauth2/token"))
            .basic_auth(
                &self.config.client_id,
                Some(self.config.client_secret.expose_secret()),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(transport_error)?;

        let token: TokenResponse = Self::read_json("generate_access_token", response).await?;
        Ok(AccessToken::new(token.access_token))
    }

    async fn create_subscription(
        &self,
        token: &AccessToken,
        plan_id: &str,
    ) -> Result<WalletSubscription, ProviderError> {
        let response = self
            .http_client
            .post(self.url("/v1/billing/subscriptions"))
            .bearer_auth(token.expose())
            .json(&CreateSubscriptionBody { plan_id })
            .send()
            .await
            .map_err(transport_error)?;

        let sub: PayPalSubscription = Self::read_json("create_subscription", response).await?;
        Ok(sub.into_wallet_subscription())
    }

    async fn get_subscription(
        &self,
        token: &AccessToken,
        subscription_id: &str,
    ) -> Result<Option<WalletSubscription>, ProviderError> {
        let path = format!("/v1/billing/subscriptions/{}", subscription_id);
        let response = self
            .http_client
            .get(self.url(&path))
            .bearer_auth(token.expose())
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let sub: PayPalSubscription = Self::read_json("get_subscription", response).await?;
        Ok(Some(sub.into_wallet_subscription()))
    }

    async fn verify_webhook_signature(
        &self,
        token: &AccessToken,
        request: &WebhookVerificationRequest,
    ) -> Result<bool, ProviderError> {
        // The event must be forwarded byte for byte; re-serializing changes the signed content.
        let body = std::str::from_utf8(&request.body)
            .map_err(|e| ProviderError::invalid_request(format!("body is not UTF-8: {}", e)))?;
        let webhook_event = RawValue::from_string(body.to_string())
            .map_err(|e| ProviderError::invalid_request(format!("body is not JSON: {}", e)))?;

        let payload = VerifySignatureBody {
            transmission_id: &request.transmission_id,
            transmission_time: &request.transmission_time,
            cert_url: &request.cert_url,
            auth_algo: &request.auth_algo,
            transmission_sig: &request.transmission_sig,
            webhook_id: &request.webhook_id,
            webhook_event: &webhook_event,
        };

        let response = self
            .http_client
            .post(self.url("/v1/notifications/verify-webhook-signature"))
            .bearer_auth(token.expose())
            .json(&payload)
            .send()
            .await
            .map_err(transport_error)?;

        let result: VerifySignatureResponse =
            Self::read_json("verify_webhook_signature", response).await?;
        Ok(result.verification_status == "SUCCESS")
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Wire shapes
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Serialize)]
struct CreateSubscriptionBody<'a> {
    plan_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct PayPalSubscription {
    id: String,
    status: String,
    #[serde(default)]
    plan_id: Option<String>,
    #[serde(default)]
    links: Vec<PayPalLink>,
}

#[derive(Debug, Deserialize)]
struct PayPalLink {
    href: String,
    rel: String,
}

impl PayPalSubscription {
    fn into_wallet_subscription(self) -> WalletSubscription {
        let approval_url = self
            .links
            .into_iter()
            .find(|l| l.rel == "approve")
            .map(|l| l.href);
        WalletSubscription {
            id: self.id,
            status: self.status,
            plan_id: self.plan_id,
            approval_url,
        }
    }
}

#[derive(Debug, Serialize)]
struct VerifySignatureBody<'a> {
    transmission_id: &'a str,
    transmission_time: &'a str,
    cert_url: &'a str,
    auth_algo: &'a str,
    transmission_sig: &'a str,
    webhook_id: &'a str,
    webhook_event: &'a RawValue,
}

#[derive(Debug, Deserialize)]
struct VerifySignatureResponse {
    verification_status: String,
}

#[derive(Debug, Deserialize)]
struct PayPalErrorBody {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

fn transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::new(ProviderErrorCode::Timeout, err.to_string())
    } else {
        ProviderError::network(err.to_string())
    }
}

fn error_from_response(status: StatusCode, body: &str) -> ProviderError {
    let code = match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderErrorCode::RateLimitExceeded,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderErrorCode::AuthenticationError,
        StatusCode::NOT_FOUND => ProviderErrorCode::NotFound,
        s if s.is_server_error() => ProviderErrorCode::NetworkError,
        _ => ProviderErrorCode::InvalidRequest,
    };

    let parsed = serde_json::from_str::<PayPalErrorBody>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|b| b.message.clone().or_else(|| b.error_description.clone()))
        .unwrap_or_else(|| format!("PayPal API error ({})", status));
    let error = ProviderError::new(code, message);

    match parsed.and_then(|b| b.name.or(b.error)) {
        Some(name) => error.with_provider_code(name),
        None => error,
    }
}
