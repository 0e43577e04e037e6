//! Admission counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RateLimitStats {
    pub admitted: AtomicU64,
    pub rejected: AtomicU64,
    /// Admitted because the store failed.
    pub fail_open: AtomicU64,
    /// Admitted without a check (disabled or whitelisted).
    pub bypassed: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RateLimitStatsSnapshot {
    pub admitted: u64,
    pub rejected: u64,
    pub fail_open: u64,
    pub bypassed: u64,
}

impl RateLimitStats {
    #[must_use]
    pub fn snapshot(&self) -> RateLimitStatsSnapshot {
        RateLimitStatsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            fail_open: self.fail_open.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.admitted.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.fail_open.store(0, Ordering::Relaxed);
        self.bypassed.store(0, Ordering::Relaxed);
    }
}
