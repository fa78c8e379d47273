//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors, state machine)
//! - `billing` - Payments, users, provider events, and the reconciliation table

pub mod billing;
pub mod foundation;
