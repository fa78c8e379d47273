//! In-memory persistence adapters for tests and local development.

mod ledger;
mod processed_event_store;

pub use ledger::InMemoryLedger;
pub use processed_event_store::InMemoryProcessedEventStore;
