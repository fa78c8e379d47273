//! Billed user as seen by the provisioning flow.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::UserId;

/// A user and the provider-side identities bound to them.
///
/// `provider_customer_id` is written once by customer provisioning;
/// `default_payment_instrument_id` changes only through instrument promotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub provider_customer_id: Option<String>,
    pub default_payment_instrument_id: Option<String>,
}

impl User {
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            name: name.into(),
            provider_customer_id: None,
            default_payment_instrument_id: None,
        }
    }

    /// True when `instrument_id` is not already the stored default.
    pub fn needs_default_promotion(&self, instrument_id: &str) -> bool {
        self.default_payment_instrument_id.as_deref() != Some(instrument_id)
    }
}
