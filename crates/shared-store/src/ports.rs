//! Store ports.
//!
//! Two traits split by concern so a component can depend on only what it
//! uses: the rate limiter needs [`SortedSetStore`], the cache engine needs
//! [`KeyValueStore`].

use crate::error::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// Sorted-set operations over `(score, member)` entries.
///
/// Entries are ordered by score, then member. Scores are finite.
#[async_trait]
pub trait SortedSetStore: Send + Sync {
    /// Insert `member` with `score`, replacing the score of an existing member.
    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<()>;

    /// Remove entries whose score lies in `[min, max]`. Returns the number removed.
    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64>;

    /// Number of entries under `key` (0 when absent).
    async fn zcard(&self, key: &str) -> StoreResult<u64>;

    /// Lowest-scored entry, if any.
    async fn zfirst(&self, key: &str) -> StoreResult<Option<(String, f64)>>;

    /// Set a time-to-live on `key`. Returns `false` when the key does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool>;
}

/// What a key-value backend can do beyond get/set/delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Keys can be grouped under tags and flushed atomically by tag.
    pub tag_index: bool,
    /// Cursor-based, non-blocking key iteration is available.
    pub scan: bool,
}

impl Capabilities {
    /// Tag index and scan both available.
    pub const FULL: Self = Self {
        tag_index: true,
        scan: true,
    };
    /// Only scanning; tags must be resolved by key pattern.
    pub const SCAN_ONLY: Self = Self {
        tag_index: false,
        scan: true,
    };
    /// Neither; only direct key enumeration remains.
    pub const BASIC: Self = Self {
        tag_index: false,
        scan: false,
    };
}

/// One page of a cursor scan. A returned cursor of `0` ends the iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    pub cursor: u64,
    pub keys: Vec<String>,
}

/// String values with TTL, optional tag index, scan and enumeration.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Features this backend supports.
    fn capabilities(&self) -> Capabilities;

    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()>;

    /// Delete keys. Returns how many existed.
    async fn delete(&self, keys: &[String]) -> StoreResult<u64>;

    /// Register `key` under each of `tags`. Membership ends when the key is
    /// deleted or expires.
    ///
    /// Backends without a tag index return `StoreError::Unsupported`.
    async fn tag_key(&self, key: &str, tags: &[String]) -> StoreResult<()>;

    /// Atomically delete every key registered under any of `tags`.
    ///
    /// Backends without a tag index return `StoreError::Unsupported`.
    async fn flush_tags(&self, tags: &[String]) -> StoreResult<u64>;

    /// Examine up to `count` keys starting at `cursor`, returning those that
    /// match `pattern`. Start with cursor `0`.
    ///
    /// Backends without scan support return `StoreError::Unsupported`.
    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage>;

    /// Enumerate every key matching `pattern` in one call. Blocking on large
    /// key spaces; last resort.
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;
}

/// A backend offering both families of operations.
pub trait KeyedStore: SortedSetStore + KeyValueStore {}

impl<T: SortedSetStore + KeyValueStore> KeyedStore for T {}
