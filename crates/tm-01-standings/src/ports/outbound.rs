//! Outbound (driven) ports for the standings engine.

use async_trait::async_trait;
use shared_types::{MatchResult, TournamentId};
use std::time::Duration;

use crate::domain::{StandingsResult, StandingsTable, TournamentStatistics};

/// Durable storage of standings tables.
#[async_trait]
pub trait StandingsRepository: Send + Sync {
    /// Current table, or `None` if the tournament has no standings yet.
    async fn load_table(
        &self,
        tournament_id: TournamentId,
    ) -> StandingsResult<Option<StandingsTable>>;

    /// Store `table` as a whole, provided the stored version still equals
    /// `expected_version` (0 for "absent"). Returns the new version.
    ///
    /// Either every row is written or none is.
    async fn commit_table(
        &self,
        table: &StandingsTable,
        expected_version: u64,
    ) -> StandingsResult<u64>;

    /// Drop every row of the tournament.
    async fn delete_tournament(&self, tournament_id: TournamentId) -> StandingsResult<()>;
}

/// Authoritative, append-only store of completed matches.
#[async_trait]
pub trait MatchResultSource: Send + Sync {
    /// Record a result. A second result with the same match id is a
    /// `Duplicate` error.
    async fn append(&self, result: MatchResult) -> StandingsResult<()>;

    /// Every result of the tournament in replay order
    /// (completion time, then match id).
    async fn list_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StandingsResult<Vec<MatchResult>>;
}

/// Failure reported by a cache collaborator. Never fatal to a standings update.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("standings cache: {0}")]
pub struct CacheFailure(pub String);

/// Read caches derived from standings.
#[async_trait]
pub trait StandingsCache: Send + Sync {
    /// Evict everything cached for the tournament's standings and statistics.
    async fn invalidate_tournament(&self, tournament_id: TournamentId) -> Result<(), CacheFailure>;

    /// Cache freshly computed statistics for at most `ttl`.
    async fn store_statistics(
        &self,
        statistics: &TournamentStatistics,
        ttl: Duration,
    ) -> Result<(), CacheFailure>;
}

/// Records cache calls; optionally fails them.
#[cfg(test)]
#[derive(Default)]
pub struct MockStandingsCache {
    pub invalidated: parking_lot::Mutex<Vec<TournamentId>>,
    pub stored: parking_lot::Mutex<Vec<TournamentStatistics>>,
    pub failing: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MockStandingsCache {
    pub fn failing() -> Self {
        let cache = Self::default();
        cache
            .failing
            .store(true, std::sync::atomic::Ordering::SeqCst);
        cache
    }

    fn check(&self) -> Result<(), CacheFailure> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            Err(CacheFailure("unreachable".into()))
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
#[async_trait]
impl StandingsCache for MockStandingsCache {
    async fn invalidate_tournament(&self, tournament_id: TournamentId) -> Result<(), CacheFailure> {
        self.check()?;
        self.invalidated.lock().push(tournament_id);
        Ok(())
    }

    async fn store_statistics(
        &self,
        statistics: &TournamentStatistics,
        _ttl: Duration,
    ) -> Result<(), CacheFailure> {
        self.check()?;
        self.stored.lock().push(statistics.clone());
        Ok(())
    }
}
