//! Adapters binding subsystem ports to the node's shared infrastructure.

pub mod cache_keys;
pub mod identity;
pub mod standings_cache;

pub use identity::{IdentityError, IdentityProvider, StaticTokenProvider};
pub use standings_cache::TaggedStandingsCache;
