//! # Processed-Event Cache
//!
//! Broadcast delivery means every replica (and every reconnect) can see the
//! same envelope more than once. The subscriber remembers recently processed
//! `event_id`s and drops repeats.
//!
//! - Entries older than the retention window are garbage-collected.
//! - Capacity is bounded; when full the oldest entry is evicted first.
//! - A repeat that arrives after its entry expired is processed again, so
//!   handlers keep their own idempotency (standings dedupe by match id).

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Time-bounded, size-bounded set of processed event ids.
pub struct ProcessedEventCache {
    /// event id -> first seen.
    seen: HashMap<Uuid, Instant>,
    /// Insertion order for eviction.
    order: VecDeque<(Uuid, Instant)>,
    retention: Duration,
    capacity: usize,
}

impl ProcessedEventCache {
    /// Default retention window.
    pub const DEFAULT_RETENTION: Duration = Duration::from_secs(300);

    /// Default maximum number of remembered ids.
    pub const DEFAULT_CAPACITY: usize = 10_000;

    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Self::DEFAULT_RETENTION, Self::DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_config(retention: Duration, capacity: usize) -> Self {
        Self {
            seen: HashMap::new(),
            order: VecDeque::new(),
            retention,
            capacity: capacity.max(1),
        }
    }

    /// Record `event_id`. Returns `false` when it was already seen inside the
    /// retention window.
    pub fn check_and_insert(&mut self, event_id: Uuid) -> bool {
        self.check_and_insert_at(event_id, Instant::now())
    }

    fn check_and_insert_at(&mut self, event_id: Uuid, now: Instant) -> bool {
        self.garbage_collect(now);

        if self.seen.contains_key(&event_id) {
            return false;
        }

        while self.seen.len() >= self.capacity {
            let Some((oldest, _)) = self.order.pop_front() else {
                break;
            };
            self.seen.remove(&oldest);
        }

        self.seen.insert(event_id, now);
        self.order.push_back((event_id, now));
        true
    }

    /// Whether `event_id` is currently remembered.
    #[must_use]
    pub fn contains(&self, event_id: &Uuid) -> bool {
        self.seen.contains_key(event_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    fn garbage_collect(&mut self, now: Instant) {
        while let Some((id, at)) = self.order.front().copied() {
            if now.saturating_duration_since(at) < self.retention {
                break;
            }
            self.order.pop_front();
            self.seen.remove(&id);
        }
    }
}

impl Default for ProcessedEventCache {
    fn default() -> Self {
        Self::new()
    }
}
