//! Mock card provider for testing.
//!
//! Configurable implementation of `CardProvider` for unit and integration
//! tests. Supports:
//! - Pre-configured subscription responses
//! - Idempotency-key replay, like the real provider
//! - Error injection, per method or for the next call
//! - Artificial latency, to exercise deadlines and races
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{
    CardProvider, CreateCustomerRequest, CreateSubscriptionRequest, ProviderError,
    SubscriptionIntent,
};

/// Mock card provider for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockCardProvider::new();
/// mock.set_method_error("create_subscription", ProviderError::network("down"));
/// mock.set_delay("create_customer", Duration::from_secs(5));
/// ```
#[derive(Default, Clone)]
pub struct MockCardProvider {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    next_id: u32,

    /// Created customer ids, in order.
    customers: Vec<String>,

    /// Instrument id -> customer id.
    attached: HashMap<String, String>,

    /// Customer id -> default instrument id.
    defaults: HashMap<String, String>,

    /// Subscriptions returned so far.
    subscriptions: Vec<SubscriptionIntent>,

    /// Next subscription to return.
    next_subscription: Option<SubscriptionIntent>,

    /// Idempotency key -> subscription created under it.
    by_idempotency_key: HashMap<String, SubscriptionIntent>,

    /// Error to return on next call.
    next_error: Option<ProviderError>,

    /// Specific errors by method name.
    method_errors: HashMap<String, ProviderError>,

    /// Latency by method name.
    delays: HashMap<String, Duration>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockCardProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set the subscription to return on next `create_subscription` call.
    pub fn set_subscription(&self, subscription: SubscriptionIntent) {
        self.state().next_subscription = Some(subscription);
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: ProviderError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method.
    pub fn set_method_error(&self, method: &str, error: ProviderError) {
        self.state().method_errors.insert(method.to_string(), error);
    }

    /// Delay responses of a specific method.
    pub fn set_delay(&self, method: &str, delay: Duration) {
        self.state().delays.insert(method.to_string(), delay);
    }

    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
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

    pub fn created_customers(&self) -> Vec<String> {
        self.state().customers.clone()
    }

    /// Customer the instrument is attached to, if any.
    pub fn attached_customer(&self, instrument_id: &str) -> Option<String> {
        self.state().attached.get(instrument_id).cloned()
    }

    pub fn default_instrument(&self, customer_id: &str) -> Option<String> {
        self.state().defaults.get(customer_id).cloned()
    }

    pub fn subscriptions(&self) -> Vec<SubscriptionIntent> {
        self.state().subscriptions.clone()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

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
impl CardProvider for MockCardProvider {
    async fn create_customer(
        &self,
        request: CreateCustomerRequest,
    ) -> Result<String, ProviderError> {
        self.enter(
            "create_customer",
            vec![request.user_id.to_string(), request.email.clone()],
        )
        .await?;

        let mut state = self.state();
        state.next_id += 1;
        let id = format!("cus_mock_{}", state.next_id);
        state.customers.push(id.clone());
        Ok(id)
    }

    async fn attach_instrument(
        &self,
        instrument_id: &str,
        customer_id: &str,
    ) -> Result<(), ProviderError> {
        self.enter(
            "attach_instrument",
            vec![instrument_id.to_string(), customer_id.to_string()],
        )
        .await?;

        self.state()
            .attached
            .insert(instrument_id.to_string(), customer_id.to_string());
        Ok(())
    }

    async fn set_default_instrument(
        &self,
        customer_id: &str,
        instrument_id: &str,
    ) -> Result<(), ProviderError> {
        self.enter(
            "set_default_instrument",
            vec![customer_id.to_string(), instrument_id.to_string()],
        )
        .await?;

        let mut state = self.state();
        if state.attached.get(instrument_id).map(String::as_str) != Some(customer_id) {
            return Err(ProviderError::invalid_request(format!(
                "instrument {} is not attached to {}",
                instrument_id, customer_id
            )));
        }
        state
            .defaults
            .insert(customer_id.to_string(), instrument_id.to_string());
        Ok(())
    }

    async fn create_subscription(
        &self,
        request: CreateSubscriptionRequest,
    ) -> Result<SubscriptionIntent, ProviderError> {
        self.enter(
            "create_subscription",
            vec![request.customer_id.clone(), request.price_id.clone()],
        )
        .await?;

        let mut state = self.state();
        if let Some(intent) = state.by_idempotency_key.get(&request.idempotency_key) {
            return Ok(intent.clone());
        }
        state.next_id += 1;
        let n = state.next_id;
        let intent = state.next_subscription.take().unwrap_or_else(|| SubscriptionIntent {
            id: format!("sub_mock_{}", n),
            status: "incomplete".to_string(),
            current_period_start: chrono::Utc::now().timestamp(),
            latest_invoice_id: Some(format!("in_mock_{}", n)),
            plan_amount: None,
        });
        state.subscriptions.push(intent.clone());
        state
            .by_idempotency_key
            .insert(request.idempotency_key, intent.clone());
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::ports::ProviderErrorCode;

    fn customer_request() -> CreateCustomerRequest {
        CreateCustomerRequest {
            user_id: UserId::new(),
            email: "ada@example.com".to_string(),
            name: "Ada".to_string(),
            idempotency_key: "customer-1".to_string(),
        }
    }

    #[tokio::test]
    async fn create_customer_returns_unique_ids() {
        let mock = MockCardProvider::new();
        let a = mock.create_customer(customer_request()).await.unwrap();
        let b = mock.create_customer(customer_request()).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(mock.created_customers(), vec![a, b]);
    }

    #[tokio::test]
    async fn default_requires_attachment() {
        let mock = MockCardProvider::new();
        let err = mock.set_default_instrument("cus_1", "pm_1").await.unwrap_err();
        assert_eq!(err.code, ProviderErrorCode::InvalidRequest);

        mock.attach_instrument("pm_1", "cus_1").await.unwrap();
        mock.set_default_instrument("cus_1", "pm_1").await.unwrap();
        assert_eq!(mock.default_instrument("cus_1").as_deref(), Some("pm_1"));
    }

    #[tokio::test]
    async fn method_error_only_affects_method() {
        let mock = MockCardProvider::new();
        mock.set_method_error("create_subscription", ProviderError::network("down"));

        assert!(mock.attach_instrument("pm_1", "cus_1").await.is_ok());
        let result = mock
            .create_subscription(CreateSubscriptionRequest {
                customer_id: "cus_1".to_string(),
                price_id: "price_1".to_string(),
                idempotency_key: "k".to_string(),
            })
            .await;
        assert!(result.is_err());
        assert!(mock.subscriptions().is_empty());
    }

    #[tokio::test]
    async fn same_idempotency_key_replays_subscription() {
        let mock = MockCardProvider::new();
        let request = CreateSubscriptionRequest {
            customer_id: "cus_1".to_string(),
            price_id: "price_1".to_string(),
            idempotency_key: "idem-1".to_string(),
        };

        let first = mock.create_subscription(request.clone()).await.unwrap();
        let second = mock.create_subscription(request).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(mock.subscriptions().len(), 1);
    }

    #[tokio::test]
    async fn next_error_is_consumed_once() {
        let mock = MockCardProvider::new();
        mock.set_error(ProviderError::network("blip"));

        assert!(mock.create_customer(customer_request()).await.is_err());
        assert!(mock.create_customer(customer_request()).await.is_ok());
    }

    #[tokio::test]
    async fn tracks_method_calls() {
        let mock = MockCardProvider::new();
        mock.attach_instrument("pm_1", "cus_1").await.unwrap();

        assert!(mock.was_called("attach_instrument"));
        assert_eq!(mock.calls()[0].args, vec!["pm_1", "cus_1"]);
        assert_eq!(mock.call_count("create_customer"), 0);
    }
}
