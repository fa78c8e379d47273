//! Transition table for applying lifecycle events to a payment.
//!
//! | Event                         | Required status   | Result    |
//! |-------------------------------|-------------------|-----------|
//! | subscription created          | PENDING           | PENDING   |
//! | subscription confirmed active | PENDING or ACTIVE | ACTIVE    |
//! | invoice payment succeeded     | non-terminal      | ACTIVE    |
//! | invoice payment failed        | non-terminal      | REJECTED  |
//! | subscription cancelled        | non-terminal      | CANCELLED |
//!
//! Anything else is ignored. An invoice id is recorded only when the event
//! is newer than the one that recorded the current invoice, so a late
//! delivery never rewinds it. A row that would leave both status and invoice
//! unchanged is ignored too, so re-applying an event never writes twice.

use serde::Serialize;
use std::fmt;

use crate::domain::foundation::StateMachine;

use super::lifecycle_event::{LifecycleEvent, LifecycleEventType};
use super::payment::Payment;
use super::status::PaymentStatus;

/// Why an event did not change the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// The current status does not satisfy the row's precondition, or the
    /// event was already reflected.
    StaleOrDuplicate,
    /// A confirmation arrived but the provider does not report it active.
    ProviderStatusNotActive,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::StaleOrDuplicate => f.write_str("stale_or_duplicate"),
            IgnoreReason::ProviderStatusNotActive => f.write_str("provider_status_not_active"),
        }
    }
}

/// Outcome of evaluating one event against one payment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionDecision {
    Apply {
        to: PaymentStatus,
        /// New invoice id to record, observed at the event's `occurred_at`.
        invoice_id: Option<String>,
    },
    Ignore(IgnoreReason),
}

/// Evaluates the transition table. Pure; performs no I/O.
pub fn evaluate(payment: &Payment, event: &LifecycleEvent) -> TransitionDecision {
    let current = payment.status;

    let target = match event.event_type {
        LifecycleEventType::SubscriptionCreated => PaymentStatus::Pending,
        LifecycleEventType::SubscriptionConfirmedActive => {
            if current.is_terminal() {
                return TransitionDecision::Ignore(IgnoreReason::StaleOrDuplicate);
            }
            if !event.observed_status.is_active() {
                return TransitionDecision::Ignore(IgnoreReason::ProviderStatusNotActive);
            }
            PaymentStatus::Active
        }
        LifecycleEventType::InvoicePaymentSucceeded => PaymentStatus::Active,
        LifecycleEventType::InvoicePaymentFailed => PaymentStatus::Rejected,
        LifecycleEventType::SubscriptionCancelled => PaymentStatus::Cancelled,
    };

    let to = match current.transition_to(target) {
        Ok(to) => to,
        Err(_) => return TransitionDecision::Ignore(IgnoreReason::StaleOrDuplicate),
    };

    let newer = payment
        .invoice_observed_at
        .map_or(true, |seen| event.occurred_at > seen);
    let invoice_id = match &event.invoice_id {
        Some(id) if newer && payment.invoice_id.as_deref() != Some(id.as_str()) => {
            Some(id.clone())
        }
        _ => None,
    };

    if to == current && invoice_id.is_none() {
        return TransitionDecision::Ignore(IgnoreReason::StaleOrDuplicate);
    }

    TransitionDecision::Apply { to, invoice_id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::billing::{
        NewPayment, ObservedStatus, PaymentMethod, PaymentType, Provider,
    };
    use crate::domain::foundation::{PaymentId, Timestamp, UserId};

    fn payment(status: PaymentStatus, invoice: Option<&str>) -> Payment {
        let mut payment = NewPayment::pending(
            UserId::new(),
            "sub_1",
            1000,
            PaymentMethod::Card,
            PaymentType::Monthly,
            Timestamp::now(),
        )
        .unwrap()
        .with_invoice_id(invoice.map(String::from))
        .into_payment(PaymentId::new());
        payment.status = status;
        payment
    }

    fn event(event_type: LifecycleEventType, invoice: Option<&str>) -> LifecycleEvent {
        LifecycleEvent::new(Provider::Card, "evt_1", event_type, "sub_1", Timestamp::now())
            .with_invoice_id(invoice.map(String::from))
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_unix_secs(1_700_000_000 + secs).unwrap()
    }

    fn recorded(status: PaymentStatus, invoice: &str, observed: i64) -> Payment {
        let mut p = payment(status, Some(invoice));
        p.invoice_observed_at = Some(at(observed));
        p
    }

    fn event_at(event_type: LifecycleEventType, invoice: &str, secs: i64) -> LifecycleEvent {
        let mut e = event(event_type, Some(invoice));
        e.occurred_at = at(secs);
        e
    }

    fn apply(to: PaymentStatus, invoice: Option<&str>) -> TransitionDecision {
        TransitionDecision::Apply {
            to,
            invoice_id: invoice.map(String::from),
        }
    }

    const STALE: TransitionDecision = TransitionDecision::Ignore(IgnoreReason::StaleOrDuplicate);

    // ══════════════════════════════════════════════════════════════
    // Subscription Created
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn created_on_pending_records_invoice() {
        let decision = evaluate(
            &payment(PaymentStatus::Pending, None),
            &event(LifecycleEventType::SubscriptionCreated, Some("in_1")),
        );
        assert_eq!(decision, apply(PaymentStatus::Pending, Some("in_1")));
    }

    #[test]
    fn created_on_pending_with_known_invoice_is_duplicate() {
        let decision = evaluate(
            &payment(PaymentStatus::Pending, Some("in_1")),
            &event(LifecycleEventType::SubscriptionCreated, Some("in_1")),
        );
        assert_eq!(decision, STALE);
    }

    #[test]
    fn created_after_activation_is_stale() {
        for status in [
            PaymentStatus::Active,
            PaymentStatus::Cancelled,
            PaymentStatus::Rejected,
        ] {
            let decision = evaluate(
                &payment(status, None),
                &event(LifecycleEventType::SubscriptionCreated, Some("in_9")),
            );
            assert_eq!(decision, STALE, "status {:?}", status);
        }
    }

    // ══════════════════════════════════════════════════════════════
    // Subscription Confirmed Active
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn confirmed_active_activates_pending() {
        let e = event(LifecycleEventType::SubscriptionConfirmedActive, None)
            .with_observed_status(ObservedStatus::Active);
        assert_eq!(
            evaluate(&payment(PaymentStatus::Pending, None), &e),
            apply(PaymentStatus::Active, None)
        );
    }

    #[test]
    fn confirmed_active_on_active_is_duplicate() {
        let e = event(LifecycleEventType::SubscriptionConfirmedActive, None)
            .with_observed_status(ObservedStatus::Active);
        assert_eq!(evaluate(&payment(PaymentStatus::Active, None), &e), STALE);
    }

    #[test]
    fn confirmed_with_inactive_provider_status_is_ignored() {
        let e = event(LifecycleEventType::SubscriptionConfirmedActive, None)
            .with_observed_status(ObservedStatus::Inactive("incomplete".to_string()));
        assert_eq!(
            evaluate(&payment(PaymentStatus::Pending, None), &e),
            TransitionDecision::Ignore(IgnoreReason::ProviderStatusNotActive)
        );
    }

    #[test]
    fn confirmed_on_terminal_is_stale_even_if_active() {
        let e = event(LifecycleEventType::SubscriptionConfirmedActive, None)
            .with_observed_status(ObservedStatus::Active);
        assert_eq!(evaluate(&payment(PaymentStatus::Rejected, None), &e), STALE);
    }

    // ══════════════════════════════════════════════════════════════
    // Invoice Events
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn succeeded_activates_pending() {
        let decision = evaluate(
            &payment(PaymentStatus::Pending, None),
            &event(LifecycleEventType::InvoicePaymentSucceeded, Some("in_1")),
        );
        assert_eq!(decision, apply(PaymentStatus::Active, Some("in_1")));
    }

    #[test]
    fn succeeded_with_new_invoice_renews_active() {
        let decision = evaluate(
            &payment(PaymentStatus::Active, Some("in_1")),
            &event(LifecycleEventType::InvoicePaymentSucceeded, Some("in_2")),
        );
        assert_eq!(decision, apply(PaymentStatus::Active, Some("in_2")));
    }

    #[test]
    fn succeeded_redelivery_is_duplicate() {
        let decision = evaluate(
            &payment(PaymentStatus::Active, Some("in_1")),
            &event(LifecycleEventType::InvoicePaymentSucceeded, Some("in_1")),
        );
        assert_eq!(decision, STALE);
    }

    #[test]
    fn late_older_invoice_does_not_rewind_active() {
        let decision = evaluate(
            &recorded(PaymentStatus::Active, "in_2", 200),
            &event_at(LifecycleEventType::InvoicePaymentSucceeded, "in_1", 100),
        );
        assert_eq!(decision, STALE);
    }

    #[test]
    fn invoice_with_same_timestamp_is_not_newer() {
        let decision = evaluate(
            &recorded(PaymentStatus::Active, "in_2", 200),
            &event_at(LifecycleEventType::InvoicePaymentSucceeded, "in_3", 200),
        );
        assert_eq!(decision, STALE);
    }

    #[test]
    fn newer_invoice_replaces_recorded_one() {
        let decision = evaluate(
            &recorded(PaymentStatus::Active, "in_1", 100),
            &event_at(LifecycleEventType::InvoicePaymentSucceeded, "in_2", 200),
        );
        assert_eq!(decision, apply(PaymentStatus::Active, Some("in_2")));
    }

    #[test]
    fn late_failure_still_rejects_but_keeps_newer_invoice() {
        let decision = evaluate(
            &recorded(PaymentStatus::Active, "in_2", 200),
            &event_at(LifecycleEventType::InvoicePaymentFailed, "in_1", 100),
        );
        assert_eq!(decision, apply(PaymentStatus::Rejected, None));
    }

    #[test]
    fn failed_rejects_active() {
        let decision = evaluate(
            &payment(PaymentStatus::Active, Some("in_1")),
            &event(LifecycleEventType::InvoicePaymentFailed, Some("in_2")),
        );
        assert_eq!(decision, apply(PaymentStatus::Rejected, Some("in_2")));
    }

    #[test]
    fn succeeded_after_rejection_is_stale() {
        let decision = evaluate(
            &payment(PaymentStatus::Rejected, Some("in_2")),
            &event(LifecycleEventType::InvoicePaymentSucceeded, Some("in_3")),
        );
        assert_eq!(decision, STALE);
    }

    // ══════════════════════════════════════════════════════════════
    // Cancellation
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn cancelled_ends_pending_and_active() {
        for status in [PaymentStatus::Pending, PaymentStatus::Active] {
            let decision = evaluate(
                &payment(status, None),
                &event(LifecycleEventType::SubscriptionCancelled, None),
            );
            assert_eq!(decision, apply(PaymentStatus::Cancelled, None));
        }
    }

    #[test]
    fn cancelled_does_not_overwrite_rejection() {
        let decision = evaluate(
            &payment(PaymentStatus::Rejected, None),
            &event(LifecycleEventType::SubscriptionCancelled, None),
        );
        assert_eq!(decision, STALE);
    }
}
