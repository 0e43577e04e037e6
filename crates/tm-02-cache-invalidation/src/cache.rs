//! Tagged read-through cache.
//!
//! Values are stored as JSON strings. On a tag-indexed backend every write
//! registers the key under its tags; on other backends the key itself must
//! start with one of its tags (`tournament:42:standings` under
//! `tournament:42`) so that pattern invalidation can find it.
//!
//! Store failures degrade to a miss or a skipped write.

use serde::{de::DeserializeOwned, Serialize};
use shared_store::{bounded, KeyValueStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::stats::CacheStats;

pub struct TaggedCache {
    store: Arc<dyn KeyValueStore>,
    config: CacheConfig,
    stats: Arc<CacheStats>,
}

impl TaggedCache {
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

    /// Cached value, or `None` on a miss, a store error or an undecodable entry.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match bounded(self.config.call_timeout, self.store.get(key)).await {
            Ok(raw) => raw,
            Err(e) => {
                CacheStats::bump(&self.stats.failures, 1);
                warn!(key, error = %e, "cache read failed");
                None
            }
        };
        let value = raw.and_then(|raw| match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "cache entry undecodable, treating as miss");
                None
            }
        });
        if value.is_some() {
            CacheStats::bump(&self.stats.hits, 1);
        } else {
            CacheStats::bump(&self.stats.misses, 1);
        }
        value
    }

    /// Store `value` under `key` and `tags`. Returns whether the write landed.
    pub async fn put<T: Serialize + Sync>(
        &self,
        key: &str,
        value: &T,
        tags: &[String],
        ttl: Option<Duration>,
    ) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "cache value not serializable");
                return false;
            }
        };
        let ttl = ttl.unwrap_or(self.config.default_ttl);

        if let Err(e) = bounded(self.config.call_timeout, self.store.set(key, &raw, Some(ttl))).await
        {
            CacheStats::bump(&self.stats.failures, 1);
            warn!(key, error = %e, "cache write failed");
            return false;
        }
        if self.store.capabilities().tag_index && !tags.is_empty() {
            if let Err(e) = bounded(self.config.call_timeout, self.store.tag_key(key, tags)).await {
                // An untagged entry would outlive tag flushes; drop it instead.
                CacheStats::bump(&self.stats.failures, 1);
                warn!(key, error = %e, "cache tagging failed, discarding entry");
                let _ = bounded(self.config.call_timeout, self.store.delete(&[key.to_string()])).await;
                return false;
            }
        }
        CacheStats::bump(&self.stats.writes, 1);
        debug!(key, ?tags, ttl_secs = ttl.as_secs(), "cache write");
        true
    }

    /// Return the cached value, or load, cache and return it.
    ///
    /// # Errors
    ///
    /// Only the loader's own error; nothing is cached in that case.
    pub async fn remember<T, E, F, Fut>(
        &self,
        key: &str,
        tags: &[String],
        ttl: Option<Duration>,
        loader: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned + Sync,
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
    {
        if let Some(hit) = self.get(key).await {
            return Ok(hit);
        }
        let value = loader().await?;
        self.put(key, &value, tags, ttl).await;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invalidator::CacheInvalidator;
    use shared_store::{Capabilities, InMemoryStore};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn cache(store: Arc<InMemoryStore>) -> TaggedCache {
        TaggedCache::new(store, CacheConfig::default(), Arc::new(CacheStats::default()))
    }

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|t| (*t).to_string()).collect()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = cache(Arc::new(InMemoryStore::new()));
        assert!(cache.put("team:1", &vec![1, 2, 3], &tags(&["team:1"]), None).await);
        assert_eq!(cache.get::<Vec<u32>>("team:1").await, Some(vec![1, 2, 3]));
        assert_eq!(cache.get::<Vec<u32>>("team:2").await, None);

        let stats = cache.stats().snapshot();
        assert_eq!((stats.hits, stats.misses, stats.writes), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_remember_loads_once() {
        let cache = cache(Arc::new(InMemoryStore::new()));
        let calls = AtomicU32::new(0);
        for _ in 0..3 {
            let value: Result<u64, ()> = cache
                .remember("k", &[], None, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(7)
                })
                .await;
            assert_eq!(value, Ok(7));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_loader_error_not_cached() {
        let cache = cache(Arc::new(InMemoryStore::new()));
        let value: Result<u64, &str> = cache.remember("k", &[], None, || async { Err("down") }).await;
        assert_eq!(value, Err("down"));
        assert_eq!(cache.get::<u64>("k").await, None);
    }

    #[tokio::test]
    async fn test_outage_degrades_to_miss() {
        let store = Arc::new(InMemoryStore::new());
        let cache = cache(store.clone());
        store.set_available(false);

        assert!(!cache.put("k", &1u8, &[], None).await);
        assert_eq!(cache.get::<u8>("k").await, None);
        let value: Result<u8, ()> = cache.remember("k", &[], None, || async { Ok(5) }).await;
        assert_eq!(value, Ok(5));
        assert_eq!(cache.stats().snapshot().failures, 4);
    }

    #[tokio::test]
    async fn test_independent_tournament_survives() {
        for capabilities in [Capabilities::FULL, Capabilities::SCAN_ONLY] {
            let store = Arc::new(InMemoryStore::with_capabilities(capabilities));
            let stats = Arc::new(CacheStats::default());
            let cache = TaggedCache::new(store.clone(), CacheConfig::default(), stats.clone());
            let invalidator = CacheInvalidator::new(store, CacheConfig::default(), stats);

            cache
                .put("tournament:42:standings", &"a", &tags(&["tournament:42"]), None)
                .await;
            cache
                .put("tournament:43:standings", &"b", &tags(&["tournament:43"]), None)
                .await;
            invalidator.invalidate(&tags(&["tournament:42"])).await;

            assert_eq!(cache.get::<String>("tournament:42:standings").await, None);
            assert_eq!(
                cache.get::<String>("tournament:43:standings").await.as_deref(),
                Some("b")
            );
        }
    }
}
