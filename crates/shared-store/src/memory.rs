//! # In-Memory Store
//!
//! Single-process implementation of both store ports.
//!
//! - Expiry is lazy: expired keys are ignored on read and purged when touched.
//! - Tag membership is dropped with the key, so a tag set only grows with
//!   live keys.
//! - Scan cursors are insertion sequence numbers, so deleting keys between
//!   pages never makes a scan skip a surviving key.
//! - Capabilities are configurable so callers can exercise every
//!   invalidation strategy, and `set_available(false)` simulates an outage.

use crate::error::{StoreError, StoreResult};
use crate::pattern::glob_match;
use crate::ports::{Capabilities, KeyValueStore, ScanPage, SortedSetStore};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::trace;

struct ValueEntry {
    value: String,
    seq: u64,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct ZSetEntry {
    /// Sorted by (score, member).
    members: Vec<(f64, String)>,
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct Inner {
    values: HashMap<String, ValueEntry>,
    /// seq -> key, iteration order for scans.
    by_seq: BTreeMap<u64, String>,
    next_seq: u64,
    zsets: HashMap<String, ZSetEntry>,
    tags: HashMap<String, BTreeSet<String>>,
    /// key -> tags it is registered under.
    key_tags: HashMap<String, BTreeSet<String>>,
}

fn expired(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.is_some_and(|at| at <= now)
}

impl Inner {
    fn remove_value(&mut self, key: &str) -> bool {
        self.untag(key);
        match self.values.remove(key) {
            Some(entry) => {
                self.by_seq.remove(&entry.seq);
                true
            }
            None => false,
        }
    }

    fn untag(&mut self, key: &str) {
        let Some(tags) = self.key_tags.remove(key) else {
            return;
        };
        for tag in tags {
            if let Some(members) = self.tags.get_mut(&tag) {
                members.remove(key);
                if members.is_empty() {
                    self.tags.remove(&tag);
                }
            }
        }
    }

    /// Drop expired keys still registered under `tag`.
    fn prune_tag(&mut self, tag: &str, now: Instant) {
        let stale: Vec<String> = self.tags.get(tag).map_or_else(Vec::new, |members| {
            members
                .iter()
                .filter(|key| {
                    self.values
                        .get(key.as_str())
                        .map_or(true, |e| expired(e.expires_at, now))
                })
                .cloned()
                .collect()
        });
        for key in stale {
            self.remove_value(&key);
        }
    }

    fn live_value(&mut self, key: &str, now: Instant) -> Option<&ValueEntry> {
        let is_expired = self.values.get(key).map(|e| expired(e.expires_at, now))?;
        if is_expired {
            self.remove_value(key);
            return None;
        }
        self.values.get(key)
    }

    fn live_zset(&mut self, key: &str, now: Instant) -> Option<&mut ZSetEntry> {
        let is_expired = self.zsets.get(key).map(|z| expired(z.expires_at, now))?;
        if is_expired {
            self.zsets.remove(key);
            return None;
        }
        self.zsets.get_mut(key)
    }
}

/// In-memory keyed store.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    capabilities: Capabilities,
    available: AtomicBool,
    operations: AtomicU64,
}

impl InMemoryStore {
    /// Store with every capability enabled.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::FULL)
    }

    /// Store advertising only the given capabilities.
    #[must_use]
    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            capabilities,
            available: AtomicBool::new(true),
            operations: AtomicU64::new(0),
        }
    }

    /// Toggle simulated availability. While unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of calls served (successful or not).
    #[must_use]
    pub fn operations(&self) -> u64 {
        self.operations.load(Ordering::Relaxed)
    }

    /// Number of keys registered under `tag`.
    #[must_use]
    pub fn tag_size(&self, tag: &str) -> usize {
        self.inner.lock().tags.get(tag).map_or(0, BTreeSet::len)
    }

    /// Number of live string values.
    #[must_use]
    pub fn value_count(&self) -> usize {
        let now = Instant::now();
        self.inner
            .lock()
            .values
            .values()
            .filter(|e| !expired(e.expires_at, now))
            .count()
    }

    fn guard(&self, op: &'static str) -> StoreResult<()> {
        self.operations.fetch_add(1, Ordering::Relaxed);
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            trace!(op, "in-memory store refusing call (simulated outage)");
            Err(StoreError::Unavailable(format!("simulated outage during {op}")))
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SortedSetStore for InMemoryStore {
    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<()> {
        self.guard("zadd")?;
        let now = Instant::now();
        let mut inner = self.inner.lock();
        if inner.live_zset(key, now).is_none() {
            inner.zsets.insert(key.to_string(), ZSetEntry::default());
        }
        let Some(zset) = inner.zsets.get_mut(key) else {
            return Ok(());
        };
        zset.members.retain(|(_, m)| m != member);
        let pos = zset.members.partition_point(|(s, m)| {
            s.total_cmp(&score).then_with(|| m.as_str().cmp(member)).is_lt()
        });
        zset.members.insert(pos, (score, member.to_string()));
        Ok(())
    }

    async fn zrem_range_by_score(&self, key: &str, min: f64, max: f64) -> StoreResult<u64> {
        self.guard("zrem_range_by_score")?;
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let Some(zset) = inner.live_zset(key, now) else {
            return Ok(0);
        };
        let before = zset.members.len();
        zset.members.retain(|(s, _)| *s < min || *s > max);
        let removed = (before - zset.members.len()) as u64;
        if zset.members.is_empty() {
            inner.zsets.remove(key);
        }
        Ok(removed)
    }

    async fn zcard(&self, key: &str) -> StoreResult<u64> {
        self.guard("zcard")?;
        let now = Instant::now();
        let mut inner = self.inner.lock();
        Ok(inner
            .live_zset(key, now)
            .map_or(0, |z| z.members.len() as u64))
    }

    async fn zfirst(&self, key: &str) -> StoreResult<Option<(String, f64)>> {
        self.guard("zfirst")?;
        let now = Instant::now();
        let mut inner = self.inner.lock();
        Ok(inner
            .live_zset(key, now)
            .and_then(|z| z.members.first())
            .map(|(s, m)| (m.clone(), *s)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<bool> {
        self.guard("expire")?;
        let now = Instant::now();
        let mut inner = self.inner.lock();
        if let Some(zset) = inner.live_zset(key, now) {
            zset.expires_at = Some(now + ttl);
            return Ok(true);
        }
        if inner.live_value(key, now).is_some() {
            if let Some(entry) = inner.values.get_mut(key) {
                entry.expires_at = Some(now + ttl);
            }
            return Ok(true);
        }
        Ok(false)
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.guard("get")?;
        let now = Instant::now();
        let mut inner = self.inner.lock();
        Ok(inner.live_value(key, now).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> StoreResult<()> {
        self.guard("set")?;
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let expires_at = ttl.map(|t| now + t);
        let existing_seq = inner.live_value(key, now).map(|e| e.seq);
        let seq = match existing_seq {
            Some(seq) => seq,
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.by_seq.insert(seq, key.to_string());
                seq
            }
        };
        inner.values.insert(
            key.to_string(),
            ValueEntry {
                value: value.to_string(),
                seq,
                expires_at,
            },
        );
        Ok(())
    }

    async fn delete(&self, keys: &[String]) -> StoreResult<u64> {
        self.guard("delete")?;
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let mut removed = 0;
        for key in keys {
            let live = inner.live_value(key, now).is_some();
            if inner.remove_value(key) && live {
                removed += 1;
            }
            if inner.zsets.remove(key).is_some() {
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn tag_key(&self, key: &str, tags: &[String]) -> StoreResult<()> {
        self.guard("tag_key")?;
        if !self.capabilities.tag_index {
            return Err(StoreError::Unsupported("tag_key"));
        }
        let now = Instant::now();
        let mut inner = self.inner.lock();
        if inner.live_value(key, now).is_none() {
            trace!(key, "not tagging a missing key");
            return Ok(());
        }
        for tag in tags {
            inner.prune_tag(tag, now);
            inner
                .tags
                .entry(tag.clone())
                .or_default()
                .insert(key.to_string());
            inner
                .key_tags
                .entry(key.to_string())
                .or_default()
                .insert(tag.clone());
        }
        Ok(())
    }

    async fn flush_tags(&self, tags: &[String]) -> StoreResult<u64> {
        self.guard("flush_tags")?;
        if !self.capabilities.tag_index {
            return Err(StoreError::Unsupported("flush_tags"));
        }
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let mut removed = 0;
        for tag in tags {
            let Some(keys) = inner.tags.remove(tag) else {
                continue;
            };
            for key in keys {
                let live = inner.live_value(&key, now).is_some();
                if inner.remove_value(&key) && live {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn scan(&self, cursor: u64, pattern: &str, count: usize) -> StoreResult<ScanPage> {
        self.guard("scan")?;
        if !self.capabilities.scan {
            return Err(StoreError::Unsupported("scan"));
        }
        let now = Instant::now();
        let inner = self.inner.lock();
        let mut keys = Vec::new();
        let mut examined = 0usize;
        let mut next_cursor = 0u64;
        for (seq, key) in inner.by_seq.range(cursor..) {
            if examined == count.max(1) {
                next_cursor = *seq;
                break;
            }
            examined += 1;
            let live = inner
                .values
                .get(key)
                .is_some_and(|e| !expired(e.expires_at, now));
            if live && glob_match(pattern, key) {
                keys.push(key.clone());
            }
        }
        Ok(ScanPage {
            cursor: next_cursor,
            keys,
        })
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.guard("keys")?;
        let now = Instant::now();
        let inner = self.inner.lock();
        let mut keys: Vec<String> = inner
            .values
            .iter()
            .filter(|(k, e)| !expired(e.expires_at, now) && glob_match(pattern, k))
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}
