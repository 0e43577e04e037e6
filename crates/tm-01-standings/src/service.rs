//! # Standings Service
//!
//! Implements [`StandingsApi`] over the outbound ports.
//!
//! Every mutation of a tournament runs under that tournament's async mutex:
//!
//! ```text
//! lock(tournament)
//!   load table ─► validate ─► apply ─► rank ─► commit(expected version)
//!   invalidate cache ─► store statistics ─► announce (best effort)
//! unlock
//! ```
//!
//! The table is mutated as an owned copy and committed whole, so a failure at
//! any step leaves the stored standings exactly as they were. Failures after
//! the commit only cost freshness and are logged.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use shared_bus::{EventPublisher, PublishOutcome, StandingsUpdated};
use shared_types::{MatchResult, TournamentId};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::StandingsConfig;
use crate::domain::{StandingsError, StandingsResult, StandingsTable, TournamentStatistics};
use crate::ports::{
    ApplyOutcome, MatchResultSource, RecalcSummary, StandingRow, StandingsApi, StandingsCache,
    StandingsRepository,
};

/// Standings engine.
pub struct StandingsService {
    repository: Arc<dyn StandingsRepository>,
    results: Arc<dyn MatchResultSource>,
    cache: Arc<dyn StandingsCache>,
    publisher: Option<Arc<EventPublisher>>,
    config: StandingsConfig,
    locks: DashMap<TournamentId, Arc<Mutex<()>>>,
}

impl StandingsService {
    #[must_use]
    pub fn new(
        repository: Arc<dyn StandingsRepository>,
        results: Arc<dyn MatchResultSource>,
        cache: Arc<dyn StandingsCache>,
        config: StandingsConfig,
    ) -> Self {
        Self {
            repository,
            results,
            cache,
            publisher: None,
            config,
            locks: DashMap::new(),
        }
    }

    /// Announce committed changes as `standings.updated`.
    #[must_use]
    pub fn with_publisher(mut self, publisher: Arc<EventPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    fn lock_for(&self, tournament_id: TournamentId) -> Arc<Mutex<()>> {
        self.locks
            .entry(tournament_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn load_or_empty(&self, tournament_id: TournamentId) -> StandingsResult<StandingsTable> {
        Ok(self
            .repository
            .load_table(tournament_id)
            .await?
            .unwrap_or_else(|| StandingsTable::new(tournament_id)))
    }

    async fn load_existing(&self, tournament_id: TournamentId) -> StandingsResult<StandingsTable> {
        self.repository
            .load_table(tournament_id)
            .await?
            .ok_or(StandingsError::NotFound(tournament_id))
    }

    /// Post-commit housekeeping. Never fails the update.
    async fn after_commit(&self, table: &StandingsTable) {
        let tournament_id = table.tournament_id();

        if let Err(e) = self.cache.invalidate_tournament(tournament_id).await {
            warn!(%tournament_id, error = %e, "standings cache invalidation failed");
        }

        let statistics = TournamentStatistics::from_table(table, Utc::now());
        if let Err(e) = self
            .cache
            .store_statistics(&statistics, self.config.statistics_ttl)
            .await
        {
            warn!(%tournament_id, error = %e, "statistics not cached");
        }

        if !self.config.announce_updates {
            return;
        }
        if let Some(publisher) = &self.publisher {
            let event = StandingsUpdated {
                tournament_id,
                matches_applied: table.totals().matches_played,
            };
            if let PublishOutcome::Failed { attempts, error } = publisher.publish_event(&event).await
            {
                warn!(%tournament_id, attempts, %error, "standings.updated not announced");
            }
        }
    }
}

#[async_trait]
impl StandingsApi for StandingsService {
    async fn apply_match_result(&self, result: &MatchResult) -> StandingsResult<ApplyOutcome> {
        let tournament_id = result.tournament_id;
        let lock = self.lock_for(tournament_id);
        let _guard = lock.lock().await;

        let mut table = self.load_or_empty(tournament_id).await?;
        let expected_version = table.version();

        match table.apply(result) {
            Ok(()) => {}
            Err(StandingsError::Duplicate(match_id)) => {
                debug!(%tournament_id, %match_id, "duplicate match ignored");
                return Ok(ApplyOutcome::Duplicate);
            }
            Err(e) => {
                warn!(%tournament_id, match_id = %result.match_id, error = %e, "match result rejected");
                return Err(e);
            }
        }
        self.config.ranking.rank(&mut table);

        if let Err(e) = self.repository.commit_table(&table, expected_version).await {
            error!(
                %tournament_id,
                match_id = %result.match_id,
                error = %e,
                "standings update rolled back"
            );
            return Err(StandingsError::Consistency {
                tournament_id,
                reason: e.to_string(),
            });
        }

        let matches_applied = table.totals().matches_played;
        debug!(
            %tournament_id,
            match_id = %result.match_id,
            matches_applied,
            "match applied"
        );
        self.after_commit(&table).await;
        Ok(ApplyOutcome::Applied { matches_applied })
    }

    async fn recalc_tournament(
        &self,
        tournament_id: TournamentId,
    ) -> StandingsResult<RecalcSummary> {
        let lock = self.lock_for(tournament_id);
        let _guard = lock.lock().await;

        let history = self.results.list_for_tournament(tournament_id).await?;
        let current_version = self
            .repository
            .load_table(tournament_id)
            .await?
            .as_ref()
            .map_or(0, StandingsTable::version);

        let mut table = StandingsTable::new(tournament_id);
        let mut skipped = 0u64;
        for result in &history {
            if let Err(e) = table.apply(result) {
                warn!(%tournament_id, match_id = %result.match_id, error = %e, "historical result skipped");
                skipped += 1;
            }
        }
        self.config.ranking.rank(&mut table);

        let committed = if table.team_count() == 0 {
            self.repository.delete_tournament(tournament_id).await
        } else {
            self.repository
                .commit_table(&table, current_version)
                .await
                .map(|_| ())
        };
        if let Err(e) = committed {
            error!(%tournament_id, error = %e, "recalculation rolled back");
            return Err(StandingsError::Consistency {
                tournament_id,
                reason: e.to_string(),
            });
        }

        let summary = RecalcSummary {
            tournament_id,
            matches_replayed: table.totals().matches_played,
            matches_skipped: skipped,
            teams: table.team_count() as u64,
        };
        info!(
            %tournament_id,
            matches_replayed = summary.matches_replayed,
            matches_skipped = summary.matches_skipped,
            teams = summary.teams,
            "standings recalculated"
        );
        self.after_commit(&table).await;
        Ok(summary)
    }

    async fn standings(&self, tournament_id: TournamentId) -> StandingsResult<Vec<StandingRow>> {
        let table = self.load_existing(tournament_id).await?;
        Ok(table.ranked().into_iter().map(StandingRow::from).collect())
    }

    async fn statistics(
        &self,
        tournament_id: TournamentId,
    ) -> StandingsResult<TournamentStatistics> {
        let table = self.load_existing(tournament_id).await?;
        Ok(TournamentStatistics::from_table(&table, Utc::now()))
    }
}
