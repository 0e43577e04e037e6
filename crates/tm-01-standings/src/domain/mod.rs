//! Standings domain: entities, ranking and derived statistics.

pub mod entities;
pub mod errors;
pub mod ranking;
pub mod statistics;

pub use entities::*;
pub use errors::*;
pub use ranking::*;
pub use statistics::*;
