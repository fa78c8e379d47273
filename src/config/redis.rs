//! Redis settings for the shared processed-event cache.
//!
//! When the section is absent the service falls back to an in-process
//! cache.

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,

    /// How long a processed event id is remembered
    #[serde(default = "default_processed_event_ttl")]
    pub processed_event_ttl_secs: u64,

    /// Connection and per-command timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl RedisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.url.is_empty() {
            return Err(ValidationError::MissingRequired("REDIS__URL"));
        }
        if !self.url.starts_with("redis://") && !self.url.starts_with("rediss://") {
            return Err(ValidationError::InvalidRedisUrl);
        }
        Ok(())
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            processed_event_ttl_secs: default_processed_event_ttl(),
            timeout_secs: default_timeout(),
        }
    }
}

/// Providers retry for up to three days; keep ids a little longer.
fn default_processed_event_ttl() -> u64 {
    4 * 24 * 60 * 60
}

fn default_timeout() -> u64 {
    2
}
