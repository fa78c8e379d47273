//! Card provider adapter over the Stripe REST API.
//!
//! Form-encoded requests with basic auth. Creation calls carry an
//! `Idempotency-Key` header so a retried step returns the original object.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key);
//! let adapter = StripeCardAdapter::new(config);
//! ```

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::ports::{
    CardProvider, CreateCustomerRequest, CreateSubscriptionRequest, ProviderError,
    ProviderErrorCode, SubscriptionIntent,
};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Stripe implementation of `CardProvider`.
pub struct StripeCardAdapter {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeCardAdapter {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    async fn post_form<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        path: &str,
        params: &[(&str, String)],
        idempotency_key: Option<&str>,
    ) -> Result<T, ProviderError> {
        let mut request = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await.map_err(transport_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(operation, status = %status, "Stripe request failed");
            return Err(error_from_response(status, &body));
        }

        response.json().await.map_err(|e| {
            ProviderError::new(
                ProviderErrorCode::Unknown,
                format!("Failed to parse Stripe response: {}", e),
            )
        })
    }
}

#[async_trait]
impl CardProvider for StripeCardAdapter {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<String, ProviderError> {
        let params = [
            ("email", request.email.clone()),
            ("name", request.name.clone()),
            ("metadata[user_id]", request.user_id.to_string()),
        ];

        let customer: StripeObject = self
            .post_form(
                "create_customer",
                "/v1/customers",
                &params,
                Some(&request.idempotency_key),
            )
            .await?;
        Ok(customer.id)
    }

    async fn attach_instrument(
        &self,
        instrument_id: &str,
        customer_id: &str,
    ) -> Result<(), ProviderError> {
        let path = format!("/v1/payment_methods/{}/attach", instrument_id);
        let _: StripeObject = self
            .post_form(
                "attach_instrument",
                &path,
                &[("customer", customer_id.to_string())],
                None,
            )
            .await?;
        Ok(())
    }

    async fn set_default_instrument(
        &self,
        customer_id: &str,
        instrument_id: &str,
    ) -> Result<(), ProviderError> {
        let path = format!("/v1/customers/{}", customer_id);
        let _: StripeObject = self
            .post_form(
                "set_default_instrument",
                &path,
                &[(
                    "invoice_settings[default_payment_method]",
                    instrument_id.to_string(),
                )],
                None,
            )
            .await?;
        Ok(())
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionIntent, ProviderError> {
        let params = [
            ("customer", request.customer_id.clone()),
            ("items[0][price]", request.price_id.clone()),
            ("payment_behavior", "default_incomplete".to_string()),
        ];

        let sub: StripeSubscription = self
            .post_form(
                "create_subscription",
                "/v1/subscriptions",
                &params,
                Some(&request.idempotency_key),
            )
            .await?;
        Ok(sub.into_intent())
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Response shapes
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
struct StripeObject {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    id: String,
    status: String,
    current_period_start: i64,
    #[serde(default)]
    latest_invoice: Option<String>,
    #[serde(default)]
    plan: Option<StripePlan>,
}

#[derive(Debug, Deserialize)]
struct StripePlan {
    amount: Option<i64>,
}

impl StripeSubscription {
    fn into_intent(self) -> SubscriptionIntent {
        SubscriptionIntent {
            id: self.id,
            status: self.status,
            current_period_start: self.current_period_start,
            latest_invoice_id: self.latest_invoice,
            plan_amount: self.plan.and_then(|p| p.amount),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorBody,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
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
        StatusCode::PAYMENT_REQUIRED => ProviderErrorCode::CardDeclined,
        StatusCode::NOT_FOUND => ProviderErrorCode::NotFound,
        s if s.is_server_error() => ProviderErrorCode::NetworkError,
        _ => ProviderErrorCode::InvalidRequest,
    };

    match serde_json::from_str::<StripeErrorEnvelope>(body) {
        Ok(envelope) => {
            let message = envelope
                .error
                .message
                .unwrap_or_else(|| format!("Stripe API error ({})", status));
            let error = ProviderError::new(code, message);
            match envelope.error.code {
                Some(provider_code) => error.with_provider_code(provider_code),
                None => error,
            }
        }
        Err(_) => ProviderError::new(code, format!("Stripe API error ({})", status)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_to_public_api() {
        let config = StripeConfig::new(SecretString::new("sk_test_key".to_string()));
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn config_with_base_url() {
        let config = StripeConfig::new(SecretString::new("sk_test_key".to_string()))
            .with_base_url("http://localhost:12111");
        assert_eq!(config.api_base_url, "http://localhost:12111");
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Error Mapping Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[test]
    fn rate_limit_and_server_errors_are_unavailable() {
        assert!(error_from_response(StatusCode::TOO_MANY_REQUESTS, "").is_unavailable());
        assert!(error_from_response(StatusCode::BAD_GATEWAY, "").is_unavailable());
        assert!(error_from_response(StatusCode::SERVICE_UNAVAILABLE, "").is_unavailable());
    }

    #[test]
    fn client_errors_are_rejections() {
        assert!(!error_from_response(StatusCode::BAD_REQUEST, "").is_unavailable());
        assert!(!error_from_response(StatusCode::UNAUTHORIZED, "").is_unavailable());
    }

    #[test]
    fn declined_card_keeps_provider_code() {
        let body = r#"{"error":{"type":"card_error","code":"card_declined","message":"Your card was declined."}}"#;
        let error = error_from_response(StatusCode::PAYMENT_REQUIRED, body);

        assert_eq!(error.code, ProviderErrorCode::CardDeclined);
        assert_eq!(error.provider_code.as_deref(), Some("card_declined"));
        assert_eq!(error.message, "Your card was declined.");
    }

    #[test]
    fn unparseable_error_body_still_maps_status() {
        let error = error_from_response(StatusCode::NOT_FOUND, "<html>");
        assert_eq!(error.code, ProviderErrorCode::NotFound);
        assert!(error.provider_code.is_none());
    }

    #[test]
    fn subscription_response_maps_to_intent() {
        let json = r#"{
            "id": "sub_1",
            "object": "subscription",
            "status": "incomplete",
            "current_period_start": 1705276800,
            "latest_invoice": "in_1",
            "plan": {"id": "price_1", "amount": 1999}
        }"#;
        let sub: StripeSubscription = serde_json::from_str(json).unwrap();
        let intent = sub.into_intent();

        assert_eq!(intent.id, "sub_1");
        assert_eq!(intent.latest_invoice_id.as_deref(), Some("in_1"));
        assert_eq!(intent.plan_amount, Some(1999));
    }

    #[test]
    fn subscription_without_plan_has_no_amount() {
        let json = r#"{"id":"sub_2","status":"active","current_period_start":1705276800}"#;
        let sub: StripeSubscription = serde_json::from_str(json).unwrap();
        assert_eq!(sub.into_intent().plan_amount, None);
    }
}
