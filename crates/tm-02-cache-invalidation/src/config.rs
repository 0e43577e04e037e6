//! Cache configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheConfigError {
    #[error("{0} must be positive")]
    Zero(&'static str),
}

/// Cache and invalidation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL for entries written without an explicit one.
    #[serde(with = "shared_types::duration")]
    pub default_ttl: Duration,

    /// Keys examined per scan call.
    pub scan_count: usize,

    /// Keys removed per delete call.
    pub delete_batch: usize,

    /// Deadline for each store call.
    #[serde(with = "shared_types::duration")]
    pub call_timeout: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(3600),
            scan_count: 100,
            delete_batch: 500,
            call_timeout: shared_store::DEFAULT_CALL_TIMEOUT,
        }
    }
}

impl CacheConfig {
    /// # Errors
    ///
    /// Every field must be positive.
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.default_ttl.is_zero() {
            return Err(CacheConfigError::Zero("default_ttl"));
        }
        if self.scan_count == 0 {
            return Err(CacheConfigError::Zero("scan_count"));
        }
        if self.delete_batch == 0 {
            return Err(CacheConfigError::Zero("delete_batch"));
        }
        if self.call_timeout.is_zero() {
            return Err(CacheConfigError::Zero("call_timeout"));
        }
        Ok(())
    }
}
