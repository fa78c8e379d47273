//! Reconciliation engine settings

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct BillingConfig {
    /// Deadline for each provider call, in seconds
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_secs: u64,

    /// Remember processed event ids to skip redeliveries early
    #[serde(default = "default_dedup_enabled")]
    pub dedup_enabled: bool,

    /// TTL for the in-process cache when Redis is not configured
    #[serde(default = "default_local_dedup_ttl")]
    pub local_dedup_ttl_secs: u64,
}

impl BillingConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn local_dedup_ttl(&self) -> Duration {
        Duration::from_secs(self.local_dedup_ttl_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.provider_timeout_secs == 0 || self.provider_timeout_secs > 120 {
            return Err(ValidationError::InvalidProviderTimeout);
        }
        Ok(())
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            provider_timeout_secs: default_provider_timeout(),
            dedup_enabled: default_dedup_enabled(),
            local_dedup_ttl_secs: default_local_dedup_ttl(),
        }
    }
}

fn default_provider_timeout() -> u64 {
    10
}

fn default_dedup_enabled() -> bool {
    true
}

fn default_local_dedup_ttl() -> u64 {
    60 * 60
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BillingConfig::default();
        assert_eq!(config.provider_timeout(), Duration::from_secs(10));
        assert!(config.dedup_enabled);
        assert_eq!(config.local_dedup_ttl(), Duration::from_secs(3600));
    }

    #[test]
    fn test_provider_timeout_bounds() {
        for secs in [0, 121] {
            let config = BillingConfig {
                provider_timeout_secs: secs,
                ..Default::default()
            };
            assert_eq!(config.validate(), Err(ValidationError::InvalidProviderTimeout));
        }
    }
}
