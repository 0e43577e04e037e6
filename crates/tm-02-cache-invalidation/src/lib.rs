//! # Cache Invalidation Engine
//!
//! Keeps read caches coherent with domain events.
//!
//! ```text
//! envelope ─► rules (exact, by EventType) ─┬─► tags ─► invalidator ─► store
//!             fallback (substring, ids)  ──┘
//! ```
//!
//! ## Guarantees
//!
//! - **Over- rather than under-invalidation:** an incomplete rule or an
//!   unknown event type pulls in the broad fallback tag set.
//! - **Bounded staleness:** invalidation failures are logged and counted,
//!   never raised. Entries then live until their TTL.
//! - **Non-blocking by default:** cursor scans are preferred to key
//!   enumeration when the backend has no tag index.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod cache;
pub mod config;
pub mod fallback;
pub mod handler;
pub mod invalidator;
pub mod rules;
pub mod stats;

pub use cache::TaggedCache;
pub use config::{CacheConfig, CacheConfigError};
pub use handler::InvalidationHandler;
pub use invalidator::{key_matches_tag, CacheInvalidator, InvalidationReport, Strategy};
pub use rules::{resolve, templates_for, TagResolution};
pub use stats::{CacheStats, CacheStatsSnapshot};
