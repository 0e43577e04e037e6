//! Publisher and subscriber counters.
//!
//! Owned by the component that updates them and shared by `Arc`; nothing here
//! is process-global. `reset()` zeroes every counter.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Publisher counters.
#[derive(Debug, Default)]
pub struct PublisherStats {
    pub attempts: AtomicU64,
    pub retries: AtomicU64,
    pub delivered: AtomicU64,
    pub no_subscribers: AtomicU64,
    pub failed: AtomicU64,
}

/// Point-in-time copy of [`PublisherStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PublisherStatsSnapshot {
    pub attempts: u64,
    pub retries: u64,
    pub delivered: u64,
    pub no_subscribers: u64,
    pub failed: u64,
}

impl PublisherStats {
    #[must_use]
    pub fn snapshot(&self) -> PublisherStatsSnapshot {
        PublisherStatsSnapshot {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            no_subscribers: self.no_subscribers.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.attempts,
            &self.retries,
            &self.delivered,
            &self.no_subscribers,
            &self.failed,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

/// Subscriber counters.
#[derive(Debug, Default)]
pub struct SubscriberStats {
    pub received: AtomicU64,
    pub invalid: AtomicU64,
    pub duplicates: AtomicU64,
    pub skipped: AtomicU64,
    pub handled: AtomicU64,
    pub handler_errors: AtomicU64,
    pub handler_panics: AtomicU64,
    pub connections: AtomicU64,
    pub reconnect_failures: AtomicU64,
}

/// Point-in-time copy of [`SubscriberStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubscriberStatsSnapshot {
    pub received: u64,
    pub invalid: u64,
    pub duplicates: u64,
    pub skipped: u64,
    pub handled: u64,
    pub handler_errors: u64,
    pub handler_panics: u64,
    pub connections: u64,
    pub reconnect_failures: u64,
}

impl SubscriberStats {
    #[must_use]
    pub fn snapshot(&self) -> SubscriberStatsSnapshot {
        SubscriberStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            handled: self.handled.load(Ordering::Relaxed),
            handler_errors: self.handler_errors.load(Ordering::Relaxed),
            handler_panics: self.handler_panics.load(Ordering::Relaxed),
            connections: self.connections.load(Ordering::Relaxed),
            reconnect_failures: self.reconnect_failures.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.received,
            &self.invalid,
            &self.duplicates,
            &self.skipped,
            &self.handled,
            &self.handler_errors,
            &self.handler_panics,
            &self.connections,
            &self.reconnect_failures,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
