//! Inbound ports (driving side).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{MatchResult, TeamId, TournamentId};

use crate::domain::{StandingsResult, TeamStanding, TournamentStatistics};

/// Result of applying one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Folded into the table and committed.
    Applied { matches_applied: u64 },
    /// Match id was already part of the table; nothing changed.
    Duplicate,
}

/// Result of a full recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcSummary {
    pub tournament_id: TournamentId,
    pub matches_replayed: u64,
    /// Historical results that failed validation and were left out.
    pub matches_skipped: u64,
    pub teams: u64,
}

/// Read model of a standing row, including derived columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingRow {
    pub position: u32,
    pub team_id: TeamId,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i64,
    pub points: u32,
}

impl From<&TeamStanding> for StandingRow {
    fn from(row: &TeamStanding) -> Self {
        Self {
            position: row.position,
            team_id: row.team_id,
            played: row.played,
            won: row.won,
            drawn: row.drawn,
            lost: row.lost,
            goals_for: row.goals_for,
            goals_against: row.goals_against,
            goal_difference: row.goal_difference(),
            points: row.points(),
        }
    }
}

/// Primary API of the standings engine.
#[async_trait]
pub trait StandingsApi: Send + Sync {
    /// Apply one completed match as a single unit of work, then re-rank.
    async fn apply_match_result(&self, result: &MatchResult) -> StandingsResult<ApplyOutcome>;

    /// Discard the tournament's standings and replay its full match history.
    async fn recalc_tournament(&self, tournament_id: TournamentId)
        -> StandingsResult<RecalcSummary>;

    /// Rows ordered by position.
    async fn standings(&self, tournament_id: TournamentId) -> StandingsResult<Vec<StandingRow>>;

    /// Derived statistics for the tournament.
    async fn statistics(
        &self,
        tournament_id: TournamentId,
    ) -> StandingsResult<TournamentStatistics>;
}
