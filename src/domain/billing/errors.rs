//! Errors for applying events and provisioning subscriptions.

use axum::http::StatusCode;
use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, UserId};

/// Failure to apply a lifecycle event.
///
/// Stale and duplicate events are not errors; they surface as
/// `ApplyOutcome::Ignored`.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("No payment for provider subscription '{0}'")]
    UnknownSubscription(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] DomainError),
}

impl ApplyError {
    pub fn is_retryable(&self) -> bool {
        match self {
            ApplyError::UnknownSubscription(_) => false,
            ApplyError::Ledger(err) => err.is_retryable(),
        }
    }
}

/// Saga steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisioningStep {
    EnsureCustomer,
    BindInstrument,
    PromoteDefault,
    CreateSubscription,
    PersistPendingPayment,
}

impl ProvisioningStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningStep::EnsureCustomer => "ensure_customer",
            ProvisioningStep::BindInstrument => "bind_instrument",
            ProvisioningStep::PromoteDefault => "promote_default",
            ProvisioningStep::CreateSubscription => "create_subscription",
            ProvisioningStep::PersistPendingPayment => "persist_pending_payment",
        }
    }
}

impl fmt::Display for ProvisioningStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single provisioning step.
#[derive(Debug, Error)]
pub enum StepError {
    /// Provider call failed transiently or timed out. The provider-side
    /// effect may or may not have happened.
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Provider refused the request.
    #[error("Provider rejected request: {0}")]
    ProviderRejected(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] DomainError),
}

impl StepError {
    pub fn is_retryable(&self) -> bool {
        match self {
            StepError::ProviderUnavailable(_) => true,
            StepError::ProviderRejected(_) => false,
            StepError::Ledger(err) => err.is_retryable(),
        }
    }
}

/// Failure of the provisioning saga.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The named step failed; earlier steps are not rolled back.
    #[error("Provisioning step '{step}' failed: {cause}")]
    StepFailed {
        step: ProvisioningStep,
        #[source]
        cause: StepError,
    },
}

impl ProvisioningError {
    pub fn step_failed(step: ProvisioningStep, cause: StepError) -> Self {
        ProvisioningError::StepFailed { step, cause }
    }

    /// The failed step, if the saga got that far.
    pub fn failed_step(&self) -> Option<ProvisioningStep> {
        match self {
            ProvisioningError::StepFailed { step, .. } => Some(*step),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ProvisioningError::StepFailed { cause, .. } => cause.is_retryable(),
            _ => false,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ProvisioningError::UserNotFound(_) => StatusCode::NOT_FOUND,
            ProvisioningError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ProvisioningError::StepFailed { cause, .. } => match cause {
                StepError::ProviderUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                StepError::ProviderRejected(_) => StatusCode::BAD_GATEWAY,
                StepError::Ledger(err) if err.code == ErrorCode::DuplicateSubscription => {
                    StatusCode::CONFLICT
                }
                StepError::Ledger(err) if err.code == ErrorCode::UserNotFound => {
                    StatusCode::NOT_FOUND
                }
                StepError::Ledger(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_failed_names_the_step() {
        let err = ProvisioningError::step_failed(
            ProvisioningStep::CreateSubscription,
            StepError::ProviderRejected("no such price".to_string()),
        );
        assert_eq!(
            err.to_string(),
            "Provisioning step 'create_subscription' failed: Provider rejected request: no such price"
        );
        assert_eq!(err.failed_step(), Some(ProvisioningStep::CreateSubscription));
    }

    #[test]
    fn unavailable_provider_is_retryable_and_503() {
        let err = ProvisioningError::step_failed(
            ProvisioningStep::EnsureCustomer,
            StepError::ProviderUnavailable("timed out".to_string()),
        );
        assert!(err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn duplicate_subscription_maps_to_conflict() {
        let err = ProvisioningError::step_failed(
            ProvisioningStep::PersistPendingPayment,
            StepError::Ledger(DomainError::new(ErrorCode::DuplicateSubscription, "exists")),
        );
        assert!(!err.is_retryable());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn missing_user_is_not_found() {
        let err = ProvisioningError::UserNotFound(UserId::new());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(err.failed_step(), None);
    }

    #[test]
    fn unknown_subscription_is_never_retried() {
        assert!(!ApplyError::UnknownSubscription("sub_1".to_string()).is_retryable());
        assert!(ApplyError::Ledger(DomainError::database("down")).is_retryable());
    }
}
