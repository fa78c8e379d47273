//! In-memory processed-event store.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::ports::ProcessedEventStore;

/// Remembers processed event keys for a fixed time.
#[derive(Debug, Clone)]
pub struct InMemoryProcessedEventStore {
    entries: Arc<RwLock<HashMap<String, Instant>>>,
    ttl: Duration,
}

impl InMemoryProcessedEventStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[async_trait]
impl ProcessedEventStore for InMemoryProcessedEventStore {
    async fn contains(&self, key: &str) -> Result<bool, DomainError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .is_some_and(|marked| marked.elapsed() < self.ttl))
    }

    async fn mark_processed(&self, key: &str) -> Result<(), DomainError> {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;
        entries.retain(|_, marked| marked.elapsed() < ttl);
        entries.insert(key.to_string(), Instant::now());
        Ok(())
    }
}
