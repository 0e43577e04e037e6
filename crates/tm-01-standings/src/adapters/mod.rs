//! Adapters: in-memory storage and the event bus consumer.

pub mod bus_handler;
pub mod memory;

pub use bus_handler::MatchCompletedHandler;
pub use memory::{InMemoryMatchResults, InMemoryStandingsRepository};
