//! # Sliding-Window Rate Limiter
//!
//! Admission control for every HTTP ingress of the platform.
//!
//! ## Model
//!
//! ```text
//! request ─► identify (api key > user > ip) ─► tier ─► windows (1..=3)
//!                                                       │
//!            admit only if every window has room ◄──────┘
//! ```
//!
//! | Tier | Minute | Hour | Day |
//! |------|--------|------|-----|
//! | trial | 10 | 100 | 500 |
//! | starter | 60 | 1 000 | 10 000 |
//! | professional | 300 | 10 000 | 100 000 |
//! | business | 1 000 | 50 000 | 1 000 000 |
//!
//! ## Failure Policy
//!
//! The limiter fails open: if the backing store errors or times out the
//! request is admitted, the decision is flagged `degraded`, and a warning
//! is logged.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod clock;
pub mod config;
pub mod identifier;
pub mod limiter;
pub mod middleware;
pub mod stats;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{RateLimitConfig, RateLimitConfigError, RejectDelay, Tier, Window, WindowQuota};
pub use identifier::{
    hash_api_key, resolve, ApiKeyAttributes, AuthenticatedUser, ClientIdentifier, IdentifierKind,
    RequestIdentity,
};
pub use limiter::{Decision, SlidingWindowLimiter, WindowStatus};
pub use middleware::{
    extract_client_ip, request_identity, RateLimitLayer, RateLimitService, API_KEY_HEADER,
};
pub use stats::{RateLimitStats, RateLimitStatsSnapshot};
