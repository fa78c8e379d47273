//! Billing Reconciler - payment lifecycle reconciliation engine
//!
//! Keeps a local payment ledger consistent with card and wallet
//! subscription providers: authenticates provider webhooks, applies
//! lifecycle events through a per-subscription state machine, and
//! provisions new subscriptions as a step-wise saga.

pub mod adapters;
pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
