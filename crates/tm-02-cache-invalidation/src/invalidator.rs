//! # Cache Invalidator
//!
//! Evicts every key associated with a set of tags, picking the cheapest
//! strategy the backend supports:
//!
//! | Backend | Strategy |
//! |---------|----------|
//! | tag index | one atomic `flush_tags` |
//! | cursor scan | scan `tag*` page by page, keep `tag` and `tag:…`, delete in batches |
//! | neither | enumerate `tag*` once, then delete in batches |
//!
//! Errors never propagate. A failed invalidation leaves entries in place
//! until their TTL expires, and is counted and logged.

use serde_json::{Map, Value};
use shared_store::{bounded, KeyValueStore, StoreResult};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::rules;
use crate::stats::CacheStats;

/// How keys were located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    TagFlush,
    Scan,
    Enumerate,
}

/// What an invalidation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidationReport {
    pub strategy: Strategy,
    pub tags: Vec<String>,
    pub keys_removed: u64,
    /// The store failed part way; some keys may survive until TTL expiry.
    pub failed: bool,
}

/// Whether `key` belongs to `tag` under the scan key convention.
#[must_use]
pub fn key_matches_tag(key: &str, tag: &str) -> bool {
    key.strip_prefix(tag)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(':'))
}

/// Tag-based eviction over a [`KeyValueStore`].
pub struct CacheInvalidator {
    store: Arc<dyn KeyValueStore>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
}

impl CacheInvalidator {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, config: CacheConfig, stats: Arc<CacheStats>) -> Self {
        Self {
            store,
            config,
            stats,
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.stats)
    }

    /// Resolve the tags for an event and invalidate them.
    pub async fn invalidate_event(
        &self,
        event_type: &str,
        payload: &Map<String, Value>,
    ) -> InvalidationReport {
        let resolution = rules::resolve(event_type, payload);
        if resolution.used_fallback {
            debug!(event_type, tags = ?resolution.tags, "invalidation used fallback tags");
        }
        self.invalidate(&resolution.to_vec()).await
    }

    /// Evict everything registered under any of `tags`.
    pub async fn invalidate(&self, tags: &[String]) -> InvalidationReport {
        let capabilities = self.store.capabilities();
        let strategy = if capabilities.tag_index {
            Strategy::TagFlush
        } else if capabilities.scan {
            Strategy::Scan
        } else {
            Strategy::Enumerate
        };

        CacheStats::bump(&self.stats.invalidations, 1);
        let mut report = InvalidationReport {
            strategy,
            tags: tags.to_vec(),
            keys_removed: 0,
            failed: false,
        };
        if tags.is_empty() {
            return report;
        }

        let outcome = match strategy {
            Strategy::TagFlush => {
                bounded(self.config.call_timeout, self.store.flush_tags(tags)).await
            }
            Strategy::Scan => self.scan_and_delete(tags, &mut report.keys_removed).await,
            Strategy::Enumerate => self.enumerate_and_delete(tags, &mut report.keys_removed).await,
        };

        match outcome {
            Ok(removed) => {
                report.keys_removed = removed;
                debug!(?strategy, ?tags, removed, "cache invalidated");
            }
            Err(e) => {
                report.failed = true;
                CacheStats::bump(&self.stats.failures, 1);
                warn!(
                    ?strategy,
                    ?tags,
                    removed = report.keys_removed,
                    error = %e,
                    "cache invalidation failed; entries expire by TTL"
                );
            }
        }
        CacheStats::bump(&self.stats.invalidated_keys, report.keys_removed);
        report
    }

    /// `removed` tracks progress so a mid-way failure still reports it.
    async fn scan_and_delete(&self, tags: &[String], removed: &mut u64) -> StoreResult<u64> {
        for tag in tags {
            let pattern = format!("{tag}*");
            let mut cursor = 0;
            loop {
                let page = bounded(
                    self.config.call_timeout,
                    self.store.scan(cursor, &pattern, self.config.scan_count),
                )
                .await?;
                let matching: Vec<String> = page
                    .keys
                    .into_iter()
                    .filter(|key| key_matches_tag(key, tag))
                    .collect();
                *removed += self.delete_batched(matching).await?;
                if page.cursor == 0 {
                    break;
                }
                cursor = page.cursor;
            }
        }
        Ok(*removed)
    }

    async fn enumerate_and_delete(&self, tags: &[String], removed: &mut u64) -> StoreResult<u64> {
        let mut doomed = BTreeSet::new();
        for tag in tags {
            let keys = bounded(self.config.call_timeout, self.store.keys(&format!("{tag}*"))).await?;
            doomed.extend(keys.into_iter().filter(|key| key_matches_tag(key, tag)));
        }
        *removed += self.delete_batched(doomed.into_iter().collect()).await?;
        Ok(*removed)
    }

    async fn delete_batched(&self, keys: Vec<String>) -> StoreResult<u64> {
        let mut removed = 0;
        for chunk in keys.chunks(self.config.delete_batch) {
            removed += bounded(self.config.call_timeout, self.store.delete(chunk)).await?;
        }
        Ok(removed)
    }
}
