//! # Event Publisher
//!
//! Builds envelopes and pushes them to the transport with bounded retry.
//!
//! Publishing is fire-and-forget: the caller always gets a
//! [`PublishOutcome`], never an error. Zero subscribers is a warning, not a
//! failure. Nothing is persisted, so an event lost between a domain write and
//! this call is only recovered by a consumer-side recompute.

use crate::config::{BusConfig, ChannelStrategy, PublisherConfig};
use crate::envelope::EventEnvelope;
use crate::events::DomainEvent;
use crate::stats::PublisherStats;
use crate::transport::{PubSubTransport, TransportError};
use serde_json::{Map, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Result of one publish call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// At least one subscription received the envelope.
    Delivered { event_id: Uuid, receivers: usize },
    /// The broker accepted the envelope but nobody was listening.
    NoSubscribers { event_id: Uuid },
    /// Every attempt failed, or the envelope could not be encoded.
    Failed { attempts: u32, error: String },
}

impl PublishOutcome {
    /// Whether the broker accepted the envelope.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

/// Envelope publisher over a [`PubSubTransport`].
pub struct EventPublisher {
    transport: Arc<dyn PubSubTransport>,
    service_name: String,
    channels: ChannelStrategy,
    config: PublisherConfig,
    stats: Arc<PublisherStats>,
}

impl EventPublisher {
    #[must_use]
    pub fn new(transport: Arc<dyn PubSubTransport>, config: &BusConfig) -> Self {
        Self {
            transport,
            service_name: config.service_name.clone(),
            channels: config.channels.clone(),
            config: config.publisher.clone(),
            stats: Arc::new(PublisherStats::default()),
        }
    }

    #[must_use]
    pub fn stats(&self) -> Arc<PublisherStats> {
        Arc::clone(&self.stats)
    }

    /// Publish a raw payload under `event_type`.
    pub async fn publish(&self, event_type: &str, payload: Map<String, Value>) -> PublishOutcome {
        let envelope = EventEnvelope::new(event_type, self.service_name.clone(), payload);
        self.publish_envelope(&envelope).await
    }

    /// Publish a typed domain event.
    pub async fn publish_event<E: DomainEvent + Sync>(&self, event: &E) -> PublishOutcome {
        match EventEnvelope::for_event(event, self.service_name.clone()) {
            Ok(envelope) => self.publish_envelope(&envelope).await,
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(event_type = %E::EVENT_TYPE, error = %e, "event payload not publishable");
                PublishOutcome::Failed {
                    attempts: 0,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Publish an already-built envelope.
    pub async fn publish_envelope(&self, envelope: &EventEnvelope) -> PublishOutcome {
        let body = match envelope.encode() {
            Ok(body) => body,
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                error!(event_id = %envelope.event_id, error = %e, "envelope encoding failed");
                return PublishOutcome::Failed {
                    attempts: 0,
                    error: e.to_string(),
                };
            }
        };
        let channel = self.channels.channel_for(&envelope.event_type);

        let mut last_error = TransportError::Unavailable("no attempt made".into());
        for attempt in 1..=self.config.max_attempts {
            self.stats.attempts.fetch_add(1, Ordering::Relaxed);
            if attempt > 1 {
                self.stats.retries.fetch_add(1, Ordering::Relaxed);
            }

            let call = self.transport.publish(channel, &body);
            let result = match tokio::time::timeout(self.config.call_timeout, call).await {
                Ok(result) => result,
                Err(_) => Err(TransportError::Timeout(self.config.call_timeout)),
            };

            match result {
                Ok(0) => {
                    self.stats.no_subscribers.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        channel,
                        "event published with no subscribers"
                    );
                    return PublishOutcome::NoSubscribers {
                        event_id: envelope.event_id,
                    };
                }
                Ok(receivers) => {
                    self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        event_id = %envelope.event_id,
                        event_type = %envelope.event_type,
                        channel,
                        receivers,
                        attempt,
                        "event published"
                    );
                    return PublishOutcome::Delivered {
                        event_id: envelope.event_id,
                        receivers,
                    };
                }
                Err(e) => {
                    warn!(
                        event_id = %envelope.event_id,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "publish attempt failed"
                    );
                    last_error = e;
                    if attempt < self.config.max_attempts {
                        tokio::time::sleep(self.config.retry_delay).await;
                    }
                }
            }
        }

        self.stats.failed.fetch_add(1, Ordering::Relaxed);
        error!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            attempts = self.config.max_attempts,
            error = %last_error,
            "event dropped after exhausting publish attempts"
        );
        PublishOutcome::Failed {
            attempts: self.config.max_attempts,
            error: last_error.to_string(),
        }
    }
}
