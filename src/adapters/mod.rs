//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the domain to external systems:
//! - `postgres` / `memory` - Ledger and processed-event stores
//! - `redis` - Shared processed-event store
//! - `stripe` / `paypal` - Provider API clients and mocks
//! - `events` - Payment status change publishers
//! - `http` - Axum routes and handlers

pub mod events;
pub mod http;
pub mod memory;
pub mod paypal;
pub mod postgres;
pub mod redis;
pub mod stripe;
