//! HTTP handlers for billing endpoints.
//!
//! These handlers connect Axum routes to the billing command handlers.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequestParts, Json, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::billing::{
    ConfirmWalletSubscriptionCommand, ConfirmWalletSubscriptionHandler, HandleWebhookCommand,
    HandleWebhookHandler, ProvisionCardSubscriptionCommand, StartWalletSubscriptionCommand,
    StartWalletSubscriptionHandler, SubscriptionProvisioningOrchestrator,
    WalletTransmissionHeaders,
};
use crate::domain::billing::{ProvisioningError, WebhookError, STRIPE_SIGNATURE_HEADER};
use crate::domain::foundation::UserId;

use super::dto::{
    CardSubscriptionRequest, CardSubscriptionResponse, ConfirmWalletSubscriptionRequest,
    ErrorResponse, StartWalletSubscriptionRequest, WalletConfirmationResponse,
    WalletSubscriptionResponse, WebhookAckResponse,
};

pub const USER_ID_HEADER: &str = "x-user-id";
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for billing routes.
///
/// Handlers that own lock registries are built once and shared, so every
/// request for the same subscription or user serializes on the same lock.
#[derive(Clone)]
pub struct BillingAppState {
    pub webhooks: Arc<HandleWebhookHandler>,
    pub card_subscriptions: Arc<SubscriptionProvisioningOrchestrator>,
    pub start_wallet_subscription: Arc<StartWalletSubscriptionHandler>,
    pub confirm_wallet_subscription: Arc<ConfirmWalletSubscriptionHandler>,
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity, set by the upstream gateway in `X-User-Id`.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_str(&parts.headers, USER_ID_HEADER)
            .and_then(|s| UserId::from_str(s).ok())
            .ok_or(AuthenticationRequired)?;
        Ok(AuthenticatedUser { user_id })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ════════════════════════════════════════════════════════════════════════════════
// Webhooks
// ════════════════════════════════════════════════════════════════════════════════

/// POST /webhooks/card - Card provider notifications
pub async fn handle_card_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = HandleWebhookCommand::Card {
        body: body.to_vec(),
        signature: header_str(&headers, STRIPE_SIGNATURE_HEADER).map(str::to_string),
    };
    dispatch_webhook(state, cmd).await
}

/// POST /webhooks/wallet - Wallet provider notifications
pub async fn handle_wallet_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = HandleWebhookCommand::Wallet {
        body: body.to_vec(),
        headers: WalletTransmissionHeaders::from_lookup(|name| header_str(&headers, name)),
    };
    dispatch_webhook(state, cmd).await
}

/// Runs the webhook on its own task so a dropped connection cannot cancel a
/// half-applied event.
async fn dispatch_webhook(
    state: BillingAppState,
    cmd: HandleWebhookCommand,
) -> Result<Json<WebhookAckResponse>, BillingApiError> {
    let handler = state.webhooks.clone();
    let joined = tokio::spawn(async move { handler.handle(cmd).await }).await;
    match joined {
        Ok(outcome) => Ok(Json(outcome?.into())),
        Err(e) => {
            tracing::error!(error = %e, "webhook task failed");
            Err(BillingApiError::Internal)
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Subscriptions
// ════════════════════════════════════════════════════════════════════════════════

/// POST /subscriptions/card - Provision a card subscription
pub async fn create_card_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    headers: HeaderMap,
    Json(request): Json<CardSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = ProvisionCardSubscriptionCommand {
        user_id: user.user_id,
        instrument_id: request.payment_method_id,
        payment_type: request.payment_type,
        price_id: request.price_id,
        idempotency_key: header_str(&headers, IDEMPOTENCY_KEY_HEADER).map(str::to_string),
    };

    let result = state.card_subscriptions.handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(CardSubscriptionResponse::from(result))))
}

/// POST /subscriptions/wallet - Create a wallet subscription awaiting approval
pub async fn start_wallet_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<StartWalletSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = StartWalletSubscriptionCommand {
        user_id: user.user_id,
        payment_type: request.payment_type,
    };

    let result = state.start_wallet_subscription.handle(cmd).await?;

    Ok((StatusCode::CREATED, Json(WalletSubscriptionResponse::from(result))))
}

/// POST /subscriptions/wallet/confirm - Record an approved wallet subscription
pub async fn confirm_wallet_subscription(
    State(state): State<BillingAppState>,
    user: AuthenticatedUser,
    Json(request): Json<ConfirmWalletSubscriptionRequest>,
) -> Result<impl IntoResponse, BillingApiError> {
    let cmd = ConfirmWalletSubscriptionCommand {
        user_id: user.user_id,
        subscription_id: request.subscription_id,
        payment_type: request.payment_type,
    };

    let result = state.confirm_wallet_subscription.handle(cmd).await?;

    let status = if result.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(WalletConfirmationResponse::from(result))))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts billing errors to HTTP responses.
#[derive(Debug)]
pub enum BillingApiError {
    Webhook(WebhookError),
    Provisioning(ProvisioningError),
    Internal,
}

impl From<WebhookError> for BillingApiError {
    fn from(err: WebhookError) -> Self {
        Self::Webhook(err)
    }
}

impl From<ProvisioningError> for BillingApiError {
    fn from(err: ProvisioningError) -> Self {
        Self::Provisioning(err)
    }
}

impl IntoResponse for BillingApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            BillingApiError::Webhook(err) => (err.status_code(), webhook_error_body(err)),
            BillingApiError::Provisioning(err) => {
                (err.status_code(), provisioning_error_body(err))
            }
            BillingApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("INTERNAL_ERROR", "Internal error"),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn webhook_error_body(err: &WebhookError) -> ErrorResponse {
    let code = match err {
        WebhookError::InvalidSignature => "INVALID_SIGNATURE",
        WebhookError::TimestampOutOfRange => "SIGNATURE_EXPIRED",
        WebhookError::InvalidTimestamp => "INVALID_TIMESTAMP",
        WebhookError::MissingHeader(_) => "MISSING_HEADER",
        WebhookError::ParseError(_) => "INVALID_PAYLOAD",
        WebhookError::MissingField(_) => "MISSING_FIELD",
        WebhookError::UnknownSubscription(_) => "UNKNOWN_SUBSCRIPTION",
        WebhookError::ProviderUnavailable(_) => "PROVIDER_UNAVAILABLE",
        WebhookError::Ledger(_) => "LEDGER_ERROR",
    };
    let message = match err {
        WebhookError::Ledger(_) => "Ledger unavailable".to_string(),
        other => other.to_string(),
    };
    ErrorResponse::new(code, message)
}

fn provisioning_error_body(err: &ProvisioningError) -> ErrorResponse {
    match err {
        ProvisioningError::UserNotFound(_) => ErrorResponse::new("USER_NOT_FOUND", err.to_string()),
        ProvisioningError::InvalidRequest(_) => {
            ErrorResponse::new("INVALID_REQUEST", err.to_string())
        }
        ProvisioningError::StepFailed { step, .. } => {
            ErrorResponse::new("PROVISIONING_FAILED", err.to_string()).with_details(
                serde_json::json!({
                    "step": step,
                    "retryable": err.is_retryable(),
                }),
            )
        }
    }
}
