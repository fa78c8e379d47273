//! Application layer - Commands and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;
mod keyed_lock;
mod provider_call;

pub use keyed_lock::KeyedMutex;
pub use provider_call::call_provider;
