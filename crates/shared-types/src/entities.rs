//! # Core Domain Entities
//!
//! Identifiers and the authoritative match record.
//!
//! Match results are created once and never mutated; they are the replay
//! source for standings recomputation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Raw numeric value.
            #[must_use]
            pub fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}#{}", $label, self.0)
            }
        }

        impl From<u64> for $name {
            fn from(value: u64) -> Self {
                Self(value)
            }
        }
    };
}

id_newtype!(
    /// Identifier of a tournament.
    TournamentId,
    "tournament"
);
id_newtype!(
    /// Identifier of a team.
    TeamId,
    "team"
);
id_newtype!(
    /// Identifier of a match. Unique across the platform.
    MatchId,
    "match"
);
id_newtype!(
    /// Identifier of an authenticated user.
    UserId,
    "user"
);

/// A completed match. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub match_id: MatchId,
    pub tournament_id: TournamentId,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: u32,
    pub away_score: u32,
    pub completed_at: DateTime<Utc>,
}

/// Outcome of a match from the home side's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    HomeWin,
    AwayWin,
    Draw,
}

impl MatchResult {
    /// Outcome derived from the final score.
    #[must_use]
    pub fn outcome(&self) -> MatchOutcome {
        match self.home_score.cmp(&self.away_score) {
            std::cmp::Ordering::Greater => MatchOutcome::HomeWin,
            std::cmp::Ordering::Less => MatchOutcome::AwayWin,
            std::cmp::Ordering::Equal => MatchOutcome::Draw,
        }
    }

    /// Total goals scored by both sides.
    #[must_use]
    pub fn total_goals(&self) -> u64 {
        u64::from(self.home_score) + u64::from(self.away_score)
    }

    /// Replay order: completion time, then match id for equal timestamps.
    #[must_use]
    pub fn replay_key(&self) -> (DateTime<Utc>, MatchId) {
        (self.completed_at, self.match_id)
    }
}
