//! # Shared Types Crate
//!
//! Types that cross service boundaries in the tournament platform.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: identifiers and the `MatchResult` record are
//!   defined once and reused by every subsystem.
//! - **Stable Wire Codes**: every externally visible error carries an
//!   [`ErrorCode`] whose string form never changes.
//! - **Strict Time Format**: envelope timestamps are exactly
//!   `YYYY-MM-DDTHH:MM:SSZ`; [`time`] owns formatting and strict parsing.

pub mod duration;
pub mod entities;
pub mod errors;
pub mod time;

pub use entities::*;
pub use errors::*;
