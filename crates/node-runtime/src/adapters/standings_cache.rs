//! Standings cache port backed by the tagged cache.

use async_trait::async_trait;
use shared_types::TournamentId;
use std::sync::Arc;
use std::time::Duration;
use tm_01_standings::{CacheFailure, StandingsCache, TournamentStatistics};
use tm_02_cache_invalidation::{CacheInvalidator, TaggedCache};

use super::cache_keys;

/// Evicts through the invalidator and writes through the tagged cache.
pub struct TaggedStandingsCache {
    cache: Arc<TaggedCache>,
    invalidator: Arc<CacheInvalidator>,
}

impl TaggedStandingsCache {
    #[must_use]
    pub fn new(cache: Arc<TaggedCache>, invalidator: Arc<CacheInvalidator>) -> Self {
        Self { cache, invalidator }
    }
}

#[async_trait]
impl StandingsCache for TaggedStandingsCache {
    async fn invalidate_tournament(&self, tournament_id: TournamentId) -> Result<(), CacheFailure> {
        let report = self
            .invalidator
            .invalidate(&[cache_keys::tournament_tag(tournament_id)])
            .await;
        if report.failed {
            return Err(CacheFailure(format!(
                "invalidation of {tournament_id} incomplete after {} keys",
                report.keys_removed
            )));
        }
        Ok(())
    }

    async fn store_statistics(
        &self,
        statistics: &TournamentStatistics,
        ttl: Duration,
    ) -> Result<(), CacheFailure> {
        let id = statistics.tournament_id;
        let stored = self
            .cache
            .put(
                &cache_keys::statistics_key(id),
                statistics,
                &cache_keys::statistics_tags(id),
                Some(ttl),
            )
            .await;
        if stored {
            Ok(())
        } else {
            Err(CacheFailure(format!("statistics for {id} not cached")))
        }
    }
}
