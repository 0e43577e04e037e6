//! # Ranking
//!
//! One result can reorder any pair of teams, so the whole table is re-sorted
//! after every update. Criteria are compared in order; whatever they leave
//! tied is broken by ascending team id, which makes positions a total order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::entities::{StandingsTable, TeamStanding};

/// A single ordering criterion. Higher is better unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankCriterion {
    Points,
    GoalDifference,
    GoalsFor,
    Wins,
    /// Fewer conceded ranks higher.
    GoalsAgainst,
}

impl RankCriterion {
    fn compare(self, a: &TeamStanding, b: &TeamStanding) -> Ordering {
        match self {
            Self::Points => b.points().cmp(&a.points()),
            Self::GoalDifference => b.goal_difference().cmp(&a.goal_difference()),
            Self::GoalsFor => b.goals_for.cmp(&a.goals_for),
            Self::Wins => b.won.cmp(&a.won),
            Self::GoalsAgainst => a.goals_against.cmp(&b.goals_against),
        }
    }
}

/// Ordered ranking criteria.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingPolicy {
    criteria: Vec<RankCriterion>,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self::new(vec![
            RankCriterion::Points,
            RankCriterion::GoalDifference,
            RankCriterion::GoalsFor,
        ])
    }
}

impl RankingPolicy {
    #[must_use]
    pub fn new(criteria: Vec<RankCriterion>) -> Self {
        Self { criteria }
    }

    #[must_use]
    pub fn criteria(&self) -> &[RankCriterion] {
        &self.criteria
    }

    /// Total order over rows: criteria first, then team id ascending.
    #[must_use]
    pub fn compare(&self, a: &TeamStanding, b: &TeamStanding) -> Ordering {
        self.criteria
            .iter()
            .map(|criterion| criterion.compare(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.team_id.cmp(&b.team_id))
    }

    /// Assign dense positions `1..=n` to every row of the table.
    pub fn rank(&self, table: &mut StandingsTable) {
        let mut order: Vec<TeamStanding> = table.rows().cloned().collect();
        order.sort_by(|a, b| self.compare(a, b));

        let positions: std::collections::HashMap<_, _> = order
            .iter()
            .zip(1u32..)
            .map(|(row, position)| (row.team_id, position))
            .collect();
        for row in table.rows_mut() {
            row.position = positions.get(&row.team_id).copied().unwrap_or(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared_types::{MatchId, MatchResult, TeamId, TournamentId};

    fn result(id: u64, home: u64, away: u64, hs: u32, aws: u32) -> MatchResult {
        MatchResult {
            match_id: MatchId(id),
            tournament_id: TournamentId(1),
            home_team_id: TeamId(home),
            away_team_id: TeamId(away),
            home_score: hs,
            away_score: aws,
            completed_at: Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap(),
        }
    }

    fn positions(table: &StandingsTable) -> Vec<u64> {
        table.ranked().iter().map(|row| row.team_id.get()).collect()
    }

    #[test]
    fn test_points_then_goal_difference() {
        let mut table = StandingsTable::new(TournamentId(1));
        table.apply(&result(1, 1, 2, 1, 0)).unwrap();
        table.apply(&result(2, 3, 4, 5, 0)).unwrap();
        table.apply(&result(3, 2, 4, 1, 1)).unwrap();
        RankingPolicy::default().rank(&mut table);

        // 3: 3pts +5, 1: 3pts +1, 2: 1pt -1, 4: 1pt -5
        assert_eq!(positions(&table), vec![3, 1, 2, 4]);
        assert_eq!(table.get(TeamId(3)).unwrap().position, 1);
        assert_eq!(table.get(TeamId(4)).unwrap().position, 4);
    }

    #[test]
    fn test_goals_for_breaks_equal_difference() {
        let mut table = StandingsTable::new(TournamentId(1));
        table.apply(&result(1, 1, 2, 1, 0)).unwrap();
        table.apply(&result(2, 3, 4, 3, 2)).unwrap();
        RankingPolicy::default().rank(&mut table);

        assert_eq!(positions(&table), vec![3, 1, 4, 2]);
    }

    #[test]
    fn test_full_tie_falls_back_to_team_id() {
        let mut table = StandingsTable::new(TournamentId(1));
        table.apply(&result(1, 9, 4, 2, 2)).unwrap();
        RankingPolicy::default().rank(&mut table);

        assert_eq!(positions(&table), vec![4, 9]);
        assert_eq!(table.get(TeamId(4)).unwrap().position, 1);
        assert_eq!(table.get(TeamId(9)).unwrap().position, 2);
    }

    #[test]
    fn test_positions_are_dense() {
        let mut table = StandingsTable::new(TournamentId(1));
        for (id, (home, away)) in [(1, 2), (3, 4), (5, 6), (1, 3)].into_iter().enumerate() {
            table
                .apply(&result(id as u64 + 1, home, away, 0, 0))
                .unwrap();
        }
        RankingPolicy::default().rank(&mut table);

        let mut seen: Vec<u32> = table.rows().map(|row| row.position).collect();
        seen.sort_unstable();
        assert_eq!(seen, (1..=6).collect::<Vec<_>>());
    }

    #[test]
    fn test_custom_criteria() {
        let mut table = StandingsTable::new(TournamentId(1));
        table.apply(&result(1, 1, 2, 0, 1)).unwrap();
        table.apply(&result(2, 3, 4, 0, 0)).unwrap();
        let policy = RankingPolicy::new(vec![RankCriterion::GoalsAgainst]);
        policy.rank(&mut table);

        // 2, 3 and 4 all conceded 0; team 1 conceded 1.
        assert_eq!(positions(&table), vec![2, 3, 4, 1]);
    }
}
