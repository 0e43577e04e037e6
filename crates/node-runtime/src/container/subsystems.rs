//! # Subsystem Container
//!
//! Holds every subsystem instance and the shared infrastructure they sit on.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: keyed store, bus transport, metrics registry
//! Level 1: event publisher, tagged cache + invalidator, rate limiter
//! Level 2: standings service (cache bridge, publisher)
//! Level 3: handler registry (invalidation first, then standings) → subscriber
//! ```
//!
//! Handlers run in registration order, so on `match.completed` stale cache
//! entries are evicted before the standings engine caches fresh statistics.
//!
//! ## Thread Safety
//!
//! - Everything is held in `Arc` and shared with the HTTP handlers
//! - Subsystems talk through the event bus; the container only wires ports

use std::sync::Arc;

use shared_bus::{
    EventHandler, EventPublisher, EventSubscriber, EventType, HandlerRegistry, InMemoryTransport,
    PubSubTransport, RegistryError,
};
use shared_store::InMemoryStore;
use thiserror::Error;
use tm_01_standings::{
    InMemoryMatchResults, InMemoryStandingsRepository, MatchCompletedHandler, StandingsApi,
    StandingsService,
};
use tm_02_cache_invalidation::{CacheInvalidator, CacheStats, InvalidationHandler, TaggedCache};
use tm_03_rate_limiter::{Clock, SlidingWindowLimiter, SystemClock};
use tourney_telemetry::{MetricsRegistry, TelemetryError};
use tracing::{info, instrument};

use crate::adapters::{IdentityProvider, StaticTokenProvider, TaggedStandingsCache};
use crate::container::config::NodeConfig;

/// Prometheus namespace for every node metric.
pub const METRICS_NAMESPACE: &str = "tournament";

/// Event types the node refuses to start without a handler for.
const REQUIRED_EVENTS: [EventType; 2] = [EventType::MatchCompleted, EventType::StandingsUpdated];

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("handler registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("metrics: {0}")]
    Metrics(#[from] TelemetryError),
}

/// Central container holding all subsystem instances.
pub struct SubsystemContainer {
    pub config: NodeConfig,

    // =========================================================================
    // LEVEL 0: Shared infrastructure
    // =========================================================================
    /// Backs the cache, the tag index and the limiter's sorted sets.
    pub store: Arc<InMemoryStore>,
    pub transport: Arc<InMemoryTransport>,
    pub metrics: Arc<MetricsRegistry>,

    // =========================================================================
    // LEVEL 1
    // =========================================================================
    pub publisher: Arc<EventPublisher>,
    pub cache: Arc<TaggedCache>,
    pub invalidator: Arc<CacheInvalidator>,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub identity: Arc<dyn IdentityProvider>,

    // =========================================================================
    // LEVEL 2
    // =========================================================================
    pub standings: Arc<StandingsService>,
    /// Authoritative match history.
    pub results: Arc<InMemoryMatchResults>,

    // =========================================================================
    // LEVEL 3
    // =========================================================================
    pub subscriber: Arc<EventSubscriber>,
}

impl SubsystemContainer {
    /// Wire every subsystem against the wall clock.
    ///
    /// # Errors
    ///
    /// See [`Self::with_clock`].
    pub fn new(config: NodeConfig) -> Result<Self, ContainerError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Wire every subsystem; the limiter reads time from `clock`.
    ///
    /// # Errors
    ///
    /// A required event type without a handler, or a metrics registry that
    /// fails to initialize.
    #[instrument(skip_all, fields(service = %config.bus.service_name))]
    pub fn with_clock(config: NodeConfig, clock: Arc<dyn Clock>) -> Result<Self, ContainerError> {
        info!("Initializing subsystems");

        // Level 0
        let store = Arc::new(InMemoryStore::new());
        let transport = Arc::new(InMemoryTransport::new());
        let metrics = Arc::new(MetricsRegistry::new(METRICS_NAMESPACE)?);

        // Level 1
        let bus: Arc<dyn PubSubTransport> = transport.clone();
        let publisher = Arc::new(EventPublisher::new(Arc::clone(&bus), &config.bus));
        let cache_stats = Arc::new(CacheStats::default());
        let cache = Arc::new(TaggedCache::new(
            store.clone(),
            config.cache.clone(),
            Arc::clone(&cache_stats),
        ));
        let invalidator = Arc::new(CacheInvalidator::new(
            store.clone(),
            config.cache.clone(),
            cache_stats,
        ));
        let limiter = Arc::new(SlidingWindowLimiter::new(
            store.clone(),
            clock,
            config.rate_limit.clone(),
        ));
        let identity: Arc<dyn IdentityProvider> =
            Arc::new(StaticTokenProvider::from_config(&config.auth));
        info!(
            tokens = config.auth.tokens.len(),
            api_keys = config.auth.api_keys.len(),
            rate_limit_enabled = config.rate_limit.enabled,
            "Level 1 ready"
        );

        // Level 2
        let results = Arc::new(InMemoryMatchResults::new());
        let standings = Arc::new(
            StandingsService::new(
                Arc::new(InMemoryStandingsRepository::new()),
                results.clone(),
                Arc::new(TaggedStandingsCache::new(
                    Arc::clone(&cache),
                    Arc::clone(&invalidator),
                )),
                config.standings.clone(),
            )
            .with_publisher(Arc::clone(&publisher)),
        );

        // Level 3
        let standings_api: Arc<dyn StandingsApi> = standings.clone();
        let invalidation: Arc<dyn EventHandler> =
            Arc::new(InvalidationHandler::new(Arc::clone(&invalidator)));
        let aggregation: Arc<dyn EventHandler> =
            Arc::new(MatchCompletedHandler::new(standings_api));
        let registry = HandlerRegistry::builder()
            .with_handler(invalidation)
            .with_handler(aggregation)
            .build(&REQUIRED_EVENTS)?;
        let subscriber = Arc::new(EventSubscriber::new(bus, Arc::new(registry), &config.bus));
        info!(channels = subscriber.channels().len(), "Event routing ready");

        Ok(Self {
            config,
            store,
            transport,
            metrics,
            publisher,
            cache,
            invalidator,
            limiter,
            identity,
            standings,
            results,
            subscriber,
        })
    }

    /// Copy every subsystem's counters into the metrics registry.
    pub fn refresh_metrics(&self) {
        self.metrics
            .record_snapshot("publisher", &self.publisher.stats().snapshot());
        self.metrics
            .record_snapshot("subscriber", &self.subscriber.stats().snapshot());
        self.metrics
            .record_snapshot("cache", &self.cache.stats().snapshot());
        self.metrics
            .record_snapshot("rate_limiter", &self.limiter.stats().snapshot());
    }
}
