//! Standings error types.

use shared_types::{ErrorCode, MatchId, TeamId, TournamentId};
use thiserror::Error;

/// Standings subsystem errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StandingsError {
    /// The result belongs to another tournament than the table it was applied to.
    #[error("{match_id} belongs to {actual}, not {expected}")]
    WrongTournament {
        match_id: MatchId,
        expected: TournamentId,
        actual: TournamentId,
    },

    /// Home and away team are the same.
    #[error("{match_id} lists {team_id} as both home and away")]
    SameTeam { match_id: MatchId, team_id: TeamId },

    /// A team's goal totals would no longer fit.
    #[error("{match_id} overflows the goal totals of {team_id}")]
    ScoreOverflow { match_id: MatchId, team_id: TeamId },

    /// The match was already applied (or recorded).
    #[error("{0} already applied")]
    Duplicate(MatchId),

    /// Another writer committed first.
    #[error("{tournament_id} changed concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        tournament_id: TournamentId,
        expected: u64,
        found: u64,
    },

    /// No standings exist for the tournament.
    #[error("no standings for {0}")]
    NotFound(TournamentId),

    /// A repository or match source call failed.
    #[error("storage failure: {0}")]
    Storage(String),

    /// The unit of work was aborted and rolled back.
    #[error("standings update for {tournament_id} rolled back: {reason}")]
    Consistency {
        tournament_id: TournamentId,
        reason: String,
    },
}

impl StandingsError {
    /// Stable code for the HTTP boundary.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::WrongTournament { .. }
            | Self::SameTeam { .. }
            | Self::ScoreOverflow { .. }
            | Self::Duplicate(_) => ErrorCode::BadRequest,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::VersionConflict { .. } | Self::Consistency { .. } => ErrorCode::ConsistencyError,
            Self::Storage(_) => ErrorCode::InternalError,
        }
    }
}

/// Result alias for standings operations.
pub type StandingsResult<T> = Result<T, StandingsError>;
