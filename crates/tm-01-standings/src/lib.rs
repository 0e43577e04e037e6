//! # Standings Aggregation Engine
//!
//! Derives per-team tournament records and rankings from completed matches.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    tm-01 Standings                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐   │
//! │  │ bus handler  │───→│  Standings   │───→│  Repository  │   │
//! │  │ (match.      │    │   Service    │    │  (tables)    │   │
//! │  │  completed)  │    │              │───→│  Match       │   │
//! │  └──────────────┘    │  per-tourney │    │  history     │   │
//! │                      │  mutex       │───→│  Cache       │   │
//! │                      └──────────────┘    └──────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! | Rule | Where |
//! |------|-------|
//! | `goal_difference = goals_for - goals_against` | derived in [`TeamStanding`] |
//! | `points = 3 * won + drawn` | derived in [`TeamStanding`] |
//! | both rows change or neither does | whole-table commit in [`StandingsService`] |
//! | a match id counts once per tournament | applied set in [`StandingsTable`] |
//! | positions are dense and total | [`RankingPolicy`], team id as final tie-break |
//! | standings are a pure function of history | `recalc_tournament` replay |

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{InMemoryMatchResults, InMemoryStandingsRepository, MatchCompletedHandler};
pub use config::{StandingsConfig, StandingsConfigError};
pub use domain::{
    MatchTotals, RankCriterion, RankingPolicy, StandingsError, StandingsResult, StandingsTable,
    TeamStanding, TournamentStatistics,
};
pub use ports::{
    ApplyOutcome, CacheFailure, MatchResultSource, RecalcSummary, StandingRow, StandingsApi,
    StandingsCache, StandingsRepository,
};
pub use service::StandingsService;
