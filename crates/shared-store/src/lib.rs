//! # Shared Store - Keyed Backing Store Abstraction
//!
//! The platform's read caches, rate-limit windows and bus bookkeeping all sit
//! on one keyed store. This crate defines the operations they need as ports
//! and ships an in-memory adapter.
//!
//! ## Capabilities
//!
//! | Capability | Used by | Fallback |
//! |------------|---------|----------|
//! | Sorted sets + TTL | Rate limiter windows | none (required) |
//! | Tag index | Cache invalidation (atomic flush) | cursor scan |
//! | Cursor scan | Cache invalidation (non-blocking) | direct enumeration |
//!
//! Backends advertise what they support through [`Capabilities`]; callers
//! pick the cheapest strategy available.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod error;
pub mod memory;
pub mod pattern;
pub mod ports;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryStore;
pub use pattern::glob_match;
pub use ports::{Capabilities, KeyValueStore, KeyedStore, ScanPage, SortedSetStore};

use std::future::Future;
use std::time::Duration;

/// Default per-call timeout for store operations.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(5);

/// Run a store call with a fixed deadline; an elapsed deadline is a store error.
pub async fn bounded<T, F>(timeout: Duration, call: F) -> StoreResult<T>
where
    F: Future<Output = StoreResult<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(timeout)),
    }
}
