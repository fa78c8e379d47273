//! Payment event publisher adapters.
//!
//! - `InMemoryPaymentEventPublisher` - Captures events for test assertions
//! - `LoggingPaymentEventPublisher` - Emits each change as a structured log line

mod in_memory;
mod logging;

pub use in_memory::InMemoryPaymentEventPublisher;
pub use logging::LoggingPaymentEventPublisher;
