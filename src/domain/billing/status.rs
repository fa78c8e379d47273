//! Payment status state machine and the enums stored alongside it.
//!
//! `PENDING` is the only initial state. `CANCELLED` and `REJECTED` are
//! terminal: once a payment lands there no event can move it again.

use crate::domain::foundation::{StateMachine, ValidationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ledger status of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Provider subscription exists, first invoice not yet settled.
    Pending,

    /// Provider reports the subscription as paid and running.
    Active,

    /// Subscription ended by the customer or the provider.
    Cancelled,

    /// An invoice payment failed.
    Rejected,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Active => "ACTIVE",
            PaymentStatus::Cancelled => "CANCELLED",
            PaymentStatus::Rejected => "REJECTED",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            // From PENDING
            (Pending, Pending) // Re-affirmed by a created event
                | (Pending, Active)
                | (Pending, Cancelled)
                | (Pending, Rejected)
            // From ACTIVE
                | (Active, Active) // Renewal invoice
                | (Active, Cancelled)
                | (Active, Rejected)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Pending, Active, Cancelled, Rejected],
            Active => vec![Active, Cancelled, Rejected],
            Cancelled | Rejected => vec![],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "ACTIVE" => Ok(PaymentStatus::Active),
            "CANCELLED" => Ok(PaymentStatus::Cancelled),
            "REJECTED" => Ok(PaymentStatus::Rejected),
            other => Err(ValidationError::invalid_format(
                "status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

/// Instrument family the subscription is billed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    Wallet,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Card => "CARD",
            PaymentMethod::Wallet => "WALLET",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CARD" => Ok(PaymentMethod::Card),
            "WALLET" => Ok(PaymentMethod::Wallet),
            other => Err(ValidationError::invalid_format(
                "payment_method",
                format!("unknown payment method '{}'", other),
            )),
        }
    }
}

/// Billing period of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Monthly,
    Yearly,
}

impl PaymentType {
    /// Days covered by one billing cycle.
    pub fn period_days(&self) -> i64 {
        match self {
            PaymentType::Monthly => 30,
            PaymentType::Yearly => 365,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Monthly => "MONTHLY",
            PaymentType::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MONTHLY" => Ok(PaymentType::Monthly),
            "YEARLY" => Ok(PaymentType::Yearly),
            other => Err(ValidationError::invalid_format(
                "payment_type",
                format!("unknown payment type '{}'", other),
            )),
        }
    }
}
