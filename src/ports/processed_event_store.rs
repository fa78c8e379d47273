//! ProcessedEventStore port - provider event ids already applied.
//!
//! Reconciliation is idempotent through state no-ops alone; this store
//! only short-circuits redeliveries before they reach the ledger. Losing
//! its contents never changes the resulting payment status.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for tracking which provider events have been applied.
///
/// # Example
///
/// ```ignore
/// if store.contains(&event.dedup_key()).await? {
///     return Ok(ApplyOutcome::Ignored(IgnoreReason::StaleOrDuplicate));
/// }
/// // apply...
/// store.mark_processed(&event.dedup_key()).await?;
/// ```
#[async_trait]
pub trait ProcessedEventStore: Send + Sync {
    /// Returns `true` if the event was marked processed and has not expired.
    async fn contains(&self, key: &str) -> Result<bool, DomainError>;

    /// Mark an event processed. Call only after the ledger write succeeded.
    async fn mark_processed(&self, key: &str) -> Result<(), DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn ProcessedEventStore) {}
}
