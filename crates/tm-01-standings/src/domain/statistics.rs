//! Tournament-level statistics derived from a standings table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::TournamentId;

use super::entities::StandingsTable;

/// Aggregate figures for one tournament.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TournamentStatistics {
    pub tournament_id: TournamentId,
    pub teams: u64,
    pub matches_played: u64,
    pub total_goals: u64,
    /// Rounded to two decimal places; zero when no match was played.
    pub average_goals_per_match: f64,
    pub home_wins: u64,
    pub away_wins: u64,
    pub draws: u64,
    pub computed_at: DateTime<Utc>,
}

impl TournamentStatistics {
    #[must_use]
    pub fn from_table(table: &StandingsTable, computed_at: DateTime<Utc>) -> Self {
        let totals = table.totals();
        Self {
            tournament_id: table.tournament_id(),
            teams: table.team_count() as u64,
            matches_played: totals.matches_played,
            total_goals: totals.total_goals,
            average_goals_per_match: average(totals.total_goals, totals.matches_played),
            home_wins: totals.home_wins,
            away_wins: totals.away_wins,
            draws: totals.draws,
            computed_at,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn average(goals: u64, matches: u64) -> f64 {
    if matches == 0 {
        return 0.0;
    }
    ((goals as f64 / matches as f64) * 100.0).round() / 100.0
}
