//! # Event Subscriber
//!
//! Long-lived consumer loop. One message is processed at a time:
//!
//! ```text
//! transport ─► decode + validate ─► dedupe by event_id ─► registry lookup ─► handlers
//!                   │ invalid            │ repeat              │ unknown type
//!                   ▼                    ▼                     ▼
//!               drop + warn          drop + debug           skip
//! ```
//!
//! - Handler errors and panics are logged and counted; the loop continues.
//! - A lost connection triggers resubscription after a fixed delay. After
//!   `max_reconnect_attempts` consecutive failed subscribe calls the loop
//!   returns [`SubscriberError::ReconnectExhausted`] and needs an external
//!   restart.
//! - Shutdown is checked between messages and during backoff; a message
//!   already being processed is finished first.

use crate::config::{BusConfig, ChannelStrategy, SubscriberConfig};
use crate::dedup::ProcessedEventCache;
use crate::envelope::EventEnvelope;
use crate::registry::HandlerRegistry;
use crate::shutdown::ShutdownSignal;
use crate::stats::SubscriberStats;
use crate::transport::{MessageStream, PubSubTransport, TransportError, TransportMessage};
use futures::FutureExt;
use parking_lot::Mutex;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Terminal subscriber failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriberError {
    #[error("gave up after {attempts} consecutive reconnect attempts: {last_error}")]
    ReconnectExhausted {
        attempts: u32,
        last_error: TransportError,
    },
}

/// What happened to one inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Failed validation; dropped.
    Invalid,
    /// Already processed inside the dedupe window; dropped.
    Duplicate,
    /// Valid, but no handler consumes this type.
    Unhandled,
    /// Dispatched to `handlers` handlers, of which `failures` errored or panicked.
    Dispatched { handlers: usize, failures: usize },
}

/// Reconnecting, deduplicating consumer.
pub struct EventSubscriber {
    transport: Arc<dyn PubSubTransport>,
    registry: Arc<HandlerRegistry>,
    channels: Vec<String>,
    config: SubscriberConfig,
    processed: Mutex<ProcessedEventCache>,
    stats: Arc<SubscriberStats>,
}

impl EventSubscriber {
    /// Subscriber for every event type `registry` handles.
    #[must_use]
    pub fn new(
        transport: Arc<dyn PubSubTransport>,
        registry: Arc<HandlerRegistry>,
        config: &BusConfig,
    ) -> Self {
        let channels = match &config.channels {
            ChannelStrategy::PerEventType => registry
                .event_types()
                .map(|t| t.as_str().to_string())
                .collect(),
            ChannelStrategy::Shared(name) => vec![name.clone()],
        };
        let processed = ProcessedEventCache::with_config(
            config.subscriber.dedup_retention,
            config.subscriber.dedup_capacity,
        );
        Self {
            transport,
            registry,
            channels,
            config: config.subscriber.clone(),
            processed: Mutex::new(processed),
            stats: Arc::new(SubscriberStats::default()),
        }
    }

    /// Channels this subscriber listens on.
    #[must_use]
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    #[must_use]
    pub fn stats(&self) -> Arc<SubscriberStats> {
        Arc::clone(&self.stats)
    }

    /// Run until shutdown or until reconnect attempts are exhausted.
    ///
    /// # Errors
    ///
    /// [`SubscriberError::ReconnectExhausted`] when the broker stays
    /// unreachable for `max_reconnect_attempts` consecutive tries.
    pub async fn run(&self, mut shutdown: ShutdownSignal) -> Result<(), SubscriberError> {
        info!(channels = ?self.channels, "subscriber starting");
        let mut failures = 0u32;

        loop {
            if shutdown.is_triggered() {
                break;
            }

            let mut stream = match self.connect().await {
                Ok(stream) => {
                    failures = 0;
                    self.stats.connections.fetch_add(1, Ordering::Relaxed);
                    info!(channels = ?self.channels, "subscriber connected");
                    stream
                }
                Err(e) => {
                    failures += 1;
                    self.stats.reconnect_failures.fetch_add(1, Ordering::Relaxed);
                    if failures >= self.config.max_reconnect_attempts {
                        error!(attempts = failures, error = %e, "subscriber giving up");
                        return Err(SubscriberError::ReconnectExhausted {
                            attempts: failures,
                            last_error: e,
                        });
                    }
                    warn!(
                        attempt = failures,
                        max_attempts = self.config.max_reconnect_attempts,
                        error = %e,
                        "subscribe failed, retrying"
                    );
                    if !self.backoff(&mut shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            let lost = loop {
                let next = tokio::select! {
                    biased;
                    () = shutdown.wait() => None,
                    message = stream.next_message() => Some(message),
                };
                match next {
                    None => break None,
                    Some(Ok(message)) => {
                        self.process(&message).await;
                    }
                    Some(Err(e)) => break Some(e),
                }
            };

            let Some(e) = lost else {
                break;
            };
            warn!(error = %e, "subscriber connection lost, reconnecting");
            drop(stream);
            if !self.backoff(&mut shutdown).await {
                break;
            }
        }

        info!("subscriber stopped");
        Ok(())
    }

    /// Validate, dedupe and dispatch one message.
    pub async fn process(&self, message: &TransportMessage) -> ProcessOutcome {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let envelope = match EventEnvelope::decode(&message.body) {
            Ok(envelope) => envelope,
            Err(e) => {
                self.stats.invalid.fetch_add(1, Ordering::Relaxed);
                warn!(channel = %message.channel, error = %e, "dropping invalid envelope");
                return ProcessOutcome::Invalid;
            }
        };

        if !self.processed.lock().check_and_insert(envelope.event_id) {
            self.stats.duplicates.fetch_add(1, Ordering::Relaxed);
            debug!(event_id = %envelope.event_id, "dropping redelivered envelope");
            return ProcessOutcome::Duplicate;
        }

        let handlers = envelope
            .kind()
            .map(|kind| self.registry.handlers_for(kind))
            .unwrap_or_default();
        if handlers.is_empty() {
            self.stats.skipped.fetch_add(1, Ordering::Relaxed);
            debug!(
                event_id = %envelope.event_id,
                event_type = %envelope.event_type,
                "no handler for event type, skipping"
            );
            return ProcessOutcome::Unhandled;
        }

        let mut failures = 0;
        for handler in handlers {
            let outcome = AssertUnwindSafe(handler.handle(&envelope))
                .catch_unwind()
                .await;
            match outcome {
                Ok(Ok(())) => {
                    self.stats.handled.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        handler = handler.name(),
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        "event handled"
                    );
                }
                Ok(Err(e)) => {
                    failures += 1;
                    self.stats.handler_errors.fetch_add(1, Ordering::Relaxed);
                    error!(
                        handler = handler.name(),
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        error = %e,
                        "handler failed"
                    );
                }
                Err(_) => {
                    failures += 1;
                    self.stats.handler_panics.fetch_add(1, Ordering::Relaxed);
                    error!(
                        handler = handler.name(),
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        "handler panicked"
                    );
                }
            }
        }

        ProcessOutcome::Dispatched {
            handlers: handlers.len(),
            failures,
        }
    }

    async fn connect(&self) -> Result<Box<dyn MessageStream>, TransportError> {
        let call = self.transport.subscribe(&self.channels);
        match tokio::time::timeout(self.config.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.config.call_timeout)),
        }
    }

    /// Sleep the reconnect delay. Returns `false` if shutdown arrived first.
    async fn backoff(&self, shutdown: &mut ShutdownSignal) -> bool {
        tokio::select! {
            biased;
            () = shutdown.wait() => false,
            () = tokio::time::sleep(self.config.reconnect_delay) => true,
        }
    }
}
