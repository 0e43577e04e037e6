//! In-memory repository and match source.
//!
//! Used by the node runtime when no database is attached and throughout the
//! test suites. Both support fault injection so rollback paths can be
//! exercised.

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{MatchId, MatchResult, TournamentId};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::domain::{StandingsError, StandingsResult, StandingsTable};
use crate::ports::{MatchResultSource, StandingsRepository};

/// Tables keyed by tournament, committed whole.
#[derive(Default)]
pub struct InMemoryStandingsRepository {
    tables: RwLock<HashMap<TournamentId, StandingsTable>>,
    failing_commits: AtomicU32,
}

impl InMemoryStandingsRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` commits fail with a storage error.
    pub fn fail_next_commits(&self, n: u32) {
        self.failing_commits.store(n, Ordering::SeqCst);
    }

    /// Number of tournaments with stored standings.
    #[must_use]
    pub fn tournament_count(&self) -> usize {
        self.tables.read().len()
    }

    fn take_failure(&self) -> bool {
        self.failing_commits
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl StandingsRepository for InMemoryStandingsRepository {
    async fn load_table(
        &self,
        tournament_id: TournamentId,
    ) -> StandingsResult<Option<StandingsTable>> {
        Ok(self.tables.read().get(&tournament_id).cloned())
    }

    async fn commit_table(
        &self,
        table: &StandingsTable,
        expected_version: u64,
    ) -> StandingsResult<u64> {
        if self.take_failure() {
            return Err(StandingsError::Storage("injected commit failure".into()));
        }

        let mut tables = self.tables.write();
        let found = tables
            .get(&table.tournament_id())
            .map_or(0, StandingsTable::version);
        if found != expected_version {
            return Err(StandingsError::VersionConflict {
                tournament_id: table.tournament_id(),
                expected: expected_version,
                found,
            });
        }

        let version = found + 1;
        let mut stored = table.clone();
        stored.set_version(version);
        tables.insert(table.tournament_id(), stored);
        Ok(version)
    }

    async fn delete_tournament(&self, tournament_id: TournamentId) -> StandingsResult<()> {
        self.tables.write().remove(&tournament_id);
        Ok(())
    }
}

/// Append-only match history.
#[derive(Default)]
pub struct InMemoryMatchResults {
    results: RwLock<BTreeMap<MatchId, MatchResult>>,
}

impl InMemoryMatchResults {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.read().is_empty()
    }
}

#[async_trait]
impl MatchResultSource for InMemoryMatchResults {
    async fn append(&self, result: MatchResult) -> StandingsResult<()> {
        let mut results = self.results.write();
        if results.contains_key(&result.match_id) {
            return Err(StandingsError::Duplicate(result.match_id));
        }
        results.insert(result.match_id, result);
        Ok(())
    }

    async fn list_for_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StandingsResult<Vec<MatchResult>> {
        let mut list: Vec<MatchResult> = self
            .results
            .read()
            .values()
            .filter(|result| result.tournament_id == tournament_id)
            .cloned()
            .collect();
        list.sort_by_key(MatchResult::replay_key);
        Ok(list)
    }
}
