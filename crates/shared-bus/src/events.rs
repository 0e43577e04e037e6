//! # Domain Event Types
//!
//! The closed set of event types published on the platform bus, and the
//! typed payloads the consistency layer produces.
//!
//! ## Event catalogue
//!
//! | Family | Types |
//! |--------|-------|
//! | Tournament | `created`, `updated`, `started`, `completed`, `deleted` |
//! | Match | `scheduled`, `started`, `updated`, `completed`, `cancelled` |
//! | Team | `registered`, `updated`, `withdrawn` |
//! | Player | `registered`, `updated` |
//! | User | `updated` |
//! | Standings | `updated` |
//!
//! Unknown dotted strings are not errors: [`EventType::parse`] returns
//! `None` and subscribers skip them.

use serde::{Deserialize, Serialize};
use shared_types::{MatchResult, TournamentId};
use std::fmt;

/// Every event type the platform publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "tournament.created")]
    TournamentCreated,
    #[serde(rename = "tournament.updated")]
    TournamentUpdated,
    #[serde(rename = "tournament.started")]
    TournamentStarted,
    #[serde(rename = "tournament.completed")]
    TournamentCompleted,
    #[serde(rename = "tournament.deleted")]
    TournamentDeleted,
    #[serde(rename = "match.scheduled")]
    MatchScheduled,
    #[serde(rename = "match.started")]
    MatchStarted,
    #[serde(rename = "match.updated")]
    MatchUpdated,
    #[serde(rename = "match.completed")]
    MatchCompleted,
    #[serde(rename = "match.cancelled")]
    MatchCancelled,
    #[serde(rename = "team.registered")]
    TeamRegistered,
    #[serde(rename = "team.updated")]
    TeamUpdated,
    #[serde(rename = "team.withdrawn")]
    TeamWithdrawn,
    #[serde(rename = "player.registered")]
    PlayerRegistered,
    #[serde(rename = "player.updated")]
    PlayerUpdated,
    #[serde(rename = "user.updated")]
    UserUpdated,
    #[serde(rename = "standings.updated")]
    StandingsUpdated,
}

impl EventType {
    /// All variants, in catalogue order.
    pub const ALL: [Self; 17] = [
        Self::TournamentCreated,
        Self::TournamentUpdated,
        Self::TournamentStarted,
        Self::TournamentCompleted,
        Self::TournamentDeleted,
        Self::MatchScheduled,
        Self::MatchStarted,
        Self::MatchUpdated,
        Self::MatchCompleted,
        Self::MatchCancelled,
        Self::TeamRegistered,
        Self::TeamUpdated,
        Self::TeamWithdrawn,
        Self::PlayerRegistered,
        Self::PlayerUpdated,
        Self::UserUpdated,
        Self::StandingsUpdated,
    ];

    /// Dotted wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TournamentCreated => "tournament.created",
            Self::TournamentUpdated => "tournament.updated",
            Self::TournamentStarted => "tournament.started",
            Self::TournamentCompleted => "tournament.completed",
            Self::TournamentDeleted => "tournament.deleted",
            Self::MatchScheduled => "match.scheduled",
            Self::MatchStarted => "match.started",
            Self::MatchUpdated => "match.updated",
            Self::MatchCompleted => "match.completed",
            Self::MatchCancelled => "match.cancelled",
            Self::TeamRegistered => "team.registered",
            Self::TeamUpdated => "team.updated",
            Self::TeamWithdrawn => "team.withdrawn",
            Self::PlayerRegistered => "player.registered",
            Self::PlayerUpdated => "player.updated",
            Self::UserUpdated => "user.updated",
            Self::StandingsUpdated => "standings.updated",
        }
    }

    /// Look up a wire name. Unknown names yield `None`.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == raw)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A payload that can be published as a typed domain event.
pub trait DomainEvent: Serialize {
    /// Event type this payload is published under.
    const EVENT_TYPE: EventType;
}

/// `match.completed`: the full, immutable match record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchCompleted(pub MatchResult);

impl DomainEvent for MatchCompleted {
    const EVENT_TYPE: EventType = EventType::MatchCompleted;
}

/// `standings.updated`: a tournament's table changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StandingsUpdated {
    pub tournament_id: TournamentId,
    /// Number of matches reflected in the table after the change.
    pub matches_applied: u64,
}

impl DomainEvent for StandingsUpdated {
    const EVENT_TYPE: EventType = EventType::StandingsUpdated;
}
