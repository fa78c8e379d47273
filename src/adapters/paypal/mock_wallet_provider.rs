//! Mock wallet provider for testing.
//!
//! Holds subscriptions in memory, answers signature verification with a
//! configurable verdict, and records calls like `MockCardProvider`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{
    AccessToken, ProviderError, WalletProvider, WalletSubscription, WebhookVerificationRequest,
};

use crate::adapters::stripe::MethodCall;

#[derive(Clone)]
pub struct MockWalletProvider {
    inner: Arc<Mutex<MockState>>,
}

struct MockState {
    next_id: u32,
    subscriptions: HashMap<String, WalletSubscription>,
    signature_valid: bool,
    next_error: Option<ProviderError>,
    method_errors: HashMap<String, ProviderError>,
    delays: HashMap<String, Duration>,
    call_log: Vec<MethodCall>,
}

impl Default for MockWalletProvider {
    fn default() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockState {
                next_id: 0,
                subscriptions: HashMap::new(),
                signature_valid: true,
                next_error: None,
                method_errors: HashMap::new(),
                delays: HashMap::new(),
                call_log: Vec::new(),
            })),
        }
    }
}

impl MockWalletProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Store a subscription as if the provider already knew it.
    pub fn insert_subscription(&self, subscription: WalletSubscription) {
        self.state()
            .subscriptions
            .insert(subscription.id.clone(), subscription);
    }

    /// Change the status of a stored subscription.
    pub fn set_subscription_status(&self, subscription_id: &str, status: &str) {
        if let Some(sub) = self.state().subscriptions.get_mut(subscription_id) {
            sub.status = status.to_string();
        }
    }

    /// Verdict returned by `verify_webhook_signature`.
    pub fn set_signature_valid(&self, valid: bool) {
        self.state().signature_valid = valid;
    }

    pub fn set_error(&self, error: ProviderError) {
        self.state().next_error = Some(error);
    }

    pub fn set_method_error(&self, method: &str, error: ProviderError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    pub fn set_delay(&self, method: &str, delay: Duration) {
        self.state().delays.insert(method.to_string(), delay);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    async fn enter(&self, method: &str, args: Vec<String>) -> Result<(), ProviderError> {
        let delay = {
            let mut state = self.state();
            state.call_log.push(MethodCall {
                method: method.to_string(),
                args,
            });
            state.delays.get(method).copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl WalletProvider for MockWalletProvider {
    async fn generate_access_token(&self) -> Result<AccessToken, ProviderError> {
        self.enter("generate_access_token", Vec::new()).await?;
        Ok(AccessToken::new("mock-access-token"))
    }

    async fn create_subscription(
        &self,
        _token: &AccessToken,
        plan_id: &str,
    ) -> Result<WalletSubscription, ProviderError> {
        self.enter("create_subscription", vec![plan_id.to_string()])
            .await?;

        let mut state = self.state();
        state.next_id += 1;
        let id = format!("I-MOCK{:06}", state.next_id);
        let subscription = WalletSubscription {
            id: id.clone(),
            status: "APPROVAL_PENDING".to_string(),
            plan_id: Some(plan_id.to_string()),
            approval_url: Some(format!("https://wallet.test/approve?ba_token={}", id)),
        };
        state.subscriptions.insert(id, subscription.clone());
        Ok(subscription)
    }

    async fn get_subscription(
        &self,
        _token: &AccessToken,
        subscription_id: &str,
    ) -> Result<Option<WalletSubscription>, ProviderError> {
        self.enter("get_subscription", vec![subscription_id.to_string()])
            .await?;
        Ok(self.state().subscriptions.get(subscription_id).cloned())
    }

    async fn verify_webhook_signature(
        &self,
        _token: &AccessToken,
        request: &WebhookVerificationRequest,
    ) -> Result<bool, ProviderError> {
        self.enter(
            "verify_webhook_signature",
            vec![request.transmission_id.clone(), request.webhook_id.clone()],
        )
        .await?;
        Ok(self.state().signature_valid)
    }
}
