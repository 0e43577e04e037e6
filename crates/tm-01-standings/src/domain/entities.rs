//! # Standings Entities
//!
//! A [`StandingsTable`] is the unit of work for one tournament: every team's
//! cumulative record plus the set of match ids already folded into it.
//! Mutation happens on an owned copy; the repository only ever sees a table
//! that was fully applied and re-ranked.

use serde::{Deserialize, Serialize};
use shared_types::{MatchId, MatchOutcome, MatchResult, TeamId, TournamentId};
use std::collections::{BTreeMap, BTreeSet};

use super::errors::StandingsError;

/// Points awarded for a win.
pub const POINTS_FOR_WIN: u32 = 3;
/// Points awarded for a draw.
pub const POINTS_FOR_DRAW: u32 = 1;

/// One team's cumulative record within a tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamStanding {
    pub tournament_id: TournamentId,
    pub team_id: TeamId,
    pub played: u32,
    pub won: u32,
    pub drawn: u32,
    pub lost: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    /// Dense rank, 1-based. Zero until the table is ranked.
    pub position: u32,
}

impl TeamStanding {
    #[must_use]
    pub fn new(tournament_id: TournamentId, team_id: TeamId) -> Self {
        Self {
            tournament_id,
            team_id,
            played: 0,
            won: 0,
            drawn: 0,
            lost: 0,
            goals_for: 0,
            goals_against: 0,
            position: 0,
        }
    }

    #[must_use]
    pub fn goal_difference(&self) -> i64 {
        i64::from(self.goals_for) - i64::from(self.goals_against)
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        POINTS_FOR_WIN * self.won + POINTS_FOR_DRAW * self.drawn
    }

    fn record(&mut self, scored: u32, conceded: u32) {
        self.played += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => self.won += 1,
            std::cmp::Ordering::Less => self.lost += 1,
            std::cmp::Ordering::Equal => self.drawn += 1,
        }
    }
}

/// Outcome tallies across every applied match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTotals {
    pub matches_played: u64,
    pub total_goals: u64,
    pub home_wins: u64,
    pub away_wins: u64,
    pub draws: u64,
}

/// All standing rows of one tournament.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsTable {
    tournament_id: TournamentId,
    rows: BTreeMap<TeamId, TeamStanding>,
    applied: BTreeSet<MatchId>,
    totals: MatchTotals,
    /// Commit counter maintained by the repository.
    version: u64,
}

impl StandingsTable {
    /// An empty table. Rows are created lazily as matches arrive.
    #[must_use]
    pub fn new(tournament_id: TournamentId) -> Self {
        Self {
            tournament_id,
            rows: BTreeMap::new(),
            applied: BTreeSet::new(),
            totals: MatchTotals::default(),
            version: 0,
        }
    }

    #[must_use]
    pub fn tournament_id(&self) -> TournamentId {
        self.tournament_id
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Set by repositories on commit.
    pub fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    #[must_use]
    pub fn totals(&self) -> MatchTotals {
        self.totals
    }

    #[must_use]
    pub fn team_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_applied(&self, match_id: MatchId) -> bool {
        self.applied.contains(&match_id)
    }

    #[must_use]
    pub fn get(&self, team_id: TeamId) -> Option<&TeamStanding> {
        self.rows.get(&team_id)
    }

    /// Rows in team id order.
    pub fn rows(&self) -> impl Iterator<Item = &TeamStanding> {
        self.rows.values()
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut TeamStanding> {
        self.rows.values_mut()
    }

    /// Rows ordered by position.
    #[must_use]
    pub fn ranked(&self) -> Vec<&TeamStanding> {
        let mut rows: Vec<&TeamStanding> = self.rows.values().collect();
        rows.sort_by_key(|row| (row.position, row.team_id));
        rows
    }

    /// Check that `result` can be applied, without touching the table.
    ///
    /// # Errors
    ///
    /// `WrongTournament`, `SameTeam`, `Duplicate` or `ScoreOverflow`.
    pub fn validate(&self, result: &MatchResult) -> Result<(), StandingsError> {
        if result.tournament_id != self.tournament_id {
            return Err(StandingsError::WrongTournament {
                match_id: result.match_id,
                expected: self.tournament_id,
                actual: result.tournament_id,
            });
        }
        if result.home_team_id == result.away_team_id {
            return Err(StandingsError::SameTeam {
                match_id: result.match_id,
                team_id: result.home_team_id,
            });
        }
        if self.applied.contains(&result.match_id) {
            return Err(StandingsError::Duplicate(result.match_id));
        }
        let sides = [
            (result.home_team_id, result.home_score, result.away_score),
            (result.away_team_id, result.away_score, result.home_score),
        ];
        for (team_id, scored, conceded) in sides {
            let (goals_for, goals_against) = self
                .rows
                .get(&team_id)
                .map_or((0, 0), |row| (row.goals_for, row.goals_against));
            if goals_for.checked_add(scored).is_none()
                || goals_against.checked_add(conceded).is_none()
            {
                return Err(StandingsError::ScoreOverflow {
                    match_id: result.match_id,
                    team_id,
                });
            }
        }
        Ok(())
    }

    /// Fold one result into both teams' rows.
    ///
    /// Positions are stale afterwards; rank the table before committing it.
    ///
    /// # Errors
    ///
    /// Any [`validate`](Self::validate) failure, in which case nothing changed.
    pub fn apply(&mut self, result: &MatchResult) -> Result<(), StandingsError> {
        self.validate(result)?;

        let tournament_id = self.tournament_id;
        self.rows
            .entry(result.home_team_id)
            .or_insert_with(|| TeamStanding::new(tournament_id, result.home_team_id))
            .record(result.home_score, result.away_score);
        self.rows
            .entry(result.away_team_id)
            .or_insert_with(|| TeamStanding::new(tournament_id, result.away_team_id))
            .record(result.away_score, result.home_score);

        self.totals.matches_played += 1;
        self.totals.total_goals += result.total_goals();
        match result.outcome() {
            MatchOutcome::HomeWin => self.totals.home_wins += 1,
            MatchOutcome::AwayWin => self.totals.away_wins += 1,
            MatchOutcome::Draw => self.totals.draws += 1,
        }
        self.applied.insert(result.match_id);
        Ok(())
    }
}
