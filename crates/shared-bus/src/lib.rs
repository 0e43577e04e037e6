//! # Shared Bus - Domain Event Bus
//!
//! At-least-once-per-replica event delivery between independently deployed
//! services.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────┐                    ┌──────────────────┐
//! │ Match service│  publish()         │ Standings worker │
//! │              │ ──────┐            │ Cache worker     │
//! └──────────────┘       │            └──────────────────┘
//!                        ▼                    ↑
//!                  ┌──────────────┐           │
//!                  │  Transport   │ ──────────┘
//!                  │  (broadcast) │  subscribe()
//!                  └──────────────┘
//! ```
//!
//! ## Guarantees
//!
//! - **Fire-and-forget publish:** bounded retry with a fixed delay; no
//!   durable queue. Consumers reconcile missed events by recompute.
//! - **Broadcast delivery:** every replica sees every message. The subscriber
//!   drops repeats by `event_id` within a retention window; handlers stay
//!   idempotent for repeats outside it.
//! - **Validated dispatch:** malformed envelopes are dropped before any
//!   handler runs. There is no dead-letter queue.
//! - **Startup-checked routing:** handlers are keyed by [`EventType`] in a
//!   registry validated when the process starts.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod config;
pub mod dedup;
pub mod envelope;
pub mod events;
pub mod publisher;
pub mod registry;
pub mod shutdown;
pub mod stats;
pub mod subscriber;
pub mod transport;

pub use config::{BusConfig, BusConfigError, ChannelStrategy, PublisherConfig, SubscriberConfig};
pub use dedup::ProcessedEventCache;
pub use envelope::{EnvelopeError, EventEnvelope, ENVELOPE_VERSION};
pub use events::{DomainEvent, EventType, MatchCompleted, StandingsUpdated};
pub use publisher::{EventPublisher, PublishOutcome};
pub use registry::{EventHandler, HandlerError, HandlerRegistry, RegistryError};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use stats::{PublisherStats, PublisherStatsSnapshot, SubscriberStats, SubscriberStatsSnapshot};
pub use subscriber::{EventSubscriber, ProcessOutcome, SubscriberError};
pub use transport::{
    InMemoryTransport, MessageStream, PubSubTransport, TransportError, TransportMessage,
};
