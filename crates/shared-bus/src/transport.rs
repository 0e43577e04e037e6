//! # Pub/Sub Transport
//!
//! The bus only needs two things from a broker: publish a string to a named
//! channel, and stream messages from a set of channels. Delivery is
//! broadcast: every live subscription to a channel receives every message.
//!
//! [`InMemoryTransport`] implements this over `tokio::sync::broadcast` for
//! single-process deployments and tests. It can inject publish failures,
//! refuse subscriptions, and drop every live subscription to simulate a
//! broker connection loss.

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Maximum messages buffered per subscription before it lags.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Broker-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    #[error("transport call timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection to broker lost")]
    ConnectionLost,
}

/// A message as seen by a subscriber.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportMessage {
    pub channel: String,
    pub body: String,
}

/// Live subscription to one or more channels.
#[async_trait]
pub trait MessageStream: Send {
    /// Wait for the next message on any subscribed channel.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionLost`] once the broker connection
    /// is gone; the stream is unusable afterwards.
    async fn next_message(&mut self) -> Result<TransportMessage, TransportError>;
}

/// Broker port.
#[async_trait]
pub trait PubSubTransport: Send + Sync {
    /// Publish `body` on `channel`. Returns how many subscriptions received it.
    async fn publish(&self, channel: &str, body: &str) -> Result<usize, TransportError>;

    /// Open a subscription to `channels`.
    async fn subscribe(&self, channels: &[String])
        -> Result<Box<dyn MessageStream>, TransportError>;
}

struct Shared {
    sender: RwLock<broadcast::Sender<TransportMessage>>,
    /// Live subscription count per channel, for the current connection generation.
    channels: Mutex<HashMap<String, usize>>,
    generation: AtomicU64,
    available: AtomicBool,
    fail_publishes: AtomicU32,
    fail_subscribes: AtomicU32,
    published: AtomicU64,
}

/// In-process broadcast transport.
#[derive(Clone)]
pub struct InMemoryTransport {
    shared: Arc<Shared>,
    capacity: usize,
}

impl InMemoryTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            shared: Arc::new(Shared {
                sender: RwLock::new(sender),
                channels: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                available: AtomicBool::new(true),
                fail_publishes: AtomicU32::new(0),
                fail_subscribes: AtomicU32::new(0),
                published: AtomicU64::new(0),
            }),
            capacity,
        }
    }

    /// Number of live subscriptions covering `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.shared
            .channels
            .lock()
            .get(channel)
            .copied()
            .unwrap_or(0)
    }

    /// Messages accepted by `publish`, including those with no receivers.
    #[must_use]
    pub fn published(&self) -> u64 {
        self.shared.published.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// While unavailable, publish and subscribe both fail.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Fail the next `n` publish calls.
    pub fn fail_next_publishes(&self, n: u32) {
        self.shared.fail_publishes.store(n, Ordering::SeqCst);
    }

    /// Refuse the next `n` subscribe calls.
    pub fn fail_next_subscribes(&self, n: u32) {
        self.shared.fail_subscribes.store(n, Ordering::SeqCst);
    }

    /// Drop every live subscription, as if the broker connection broke.
    ///
    /// Existing streams return [`TransportError::ConnectionLost`]; new
    /// subscriptions work normally.
    pub fn disconnect_subscribers(&self) {
        let (sender, _) = broadcast::channel(self.capacity);
        {
            let mut current = self.shared.sender.write();
            *current = sender;
        }
        self.shared.generation.fetch_add(1, Ordering::SeqCst);
        self.shared.channels.lock().clear();
        warn!("in-memory transport dropped all subscriptions");
    }

    fn check_available(&self) -> Result<(), TransportError> {
        if self.shared.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::Unavailable("broker offline".into()))
        }
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Consume one unit of an injected-failure budget.
fn take_failure(budget: &AtomicU32) -> bool {
    budget
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl PubSubTransport for InMemoryTransport {
    async fn publish(&self, channel: &str, body: &str) -> Result<usize, TransportError> {
        self.check_available()?;
        if take_failure(&self.shared.fail_publishes) {
            return Err(TransportError::Unavailable("injected publish failure".into()));
        }
        self.shared.published.fetch_add(1, Ordering::Relaxed);

        let receivers = self.subscriber_count(channel);
        if receivers == 0 {
            return Ok(0);
        }
        let message = TransportMessage {
            channel: channel.to_string(),
            body: body.to_string(),
        };
        match self.shared.sender.read().send(message) {
            Ok(_) => Ok(receivers),
            Err(_) => Ok(0),
        }
    }

    async fn subscribe(
        &self,
        channels: &[String],
    ) -> Result<Box<dyn MessageStream>, TransportError> {
        self.check_available()?;
        if take_failure(&self.shared.fail_subscribes) {
            return Err(TransportError::Unavailable("injected subscribe failure".into()));
        }

        let channels: HashSet<String> = channels.iter().cloned().collect();
        let receiver = self.shared.sender.read().subscribe();
        let generation = self.shared.generation.load(Ordering::SeqCst);
        {
            let mut counts = self.shared.channels.lock();
            for channel in &channels {
                *counts.entry(channel.clone()).or_insert(0) += 1;
            }
        }
        debug!(channels = ?channels, "in-memory subscription opened");

        Ok(Box::new(InMemoryStream {
            receiver,
            channels,
            generation,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct InMemoryStream {
    receiver: broadcast::Receiver<TransportMessage>,
    channels: HashSet<String>,
    generation: u64,
    shared: Arc<Shared>,
}

#[async_trait]
impl MessageStream for InMemoryStream {
    async fn next_message(&mut self) -> Result<TransportMessage, TransportError> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if self.channels.contains(&message.channel) => return Ok(message),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(TransportError::ConnectionLost)
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscription lagged, messages dropped");
                }
            }
        }
    }
}

impl Drop for InMemoryStream {
    fn drop(&mut self) {
        if self.shared.generation.load(Ordering::SeqCst) != self.generation {
            return;
        }
        let mut counts = self.shared.channels.lock();
        for channel in &self.channels {
            if let Some(count) = counts.get_mut(channel) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    counts.remove(channel);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let transport = InMemoryTransport::new();
        assert_eq!(transport.publish("match.completed", "{}").await, Ok(0));
        assert_eq!(transport.published(), 1);
    }

    #[tokio::test]
    async fn test_broadcast_to_every_subscription() {
        let transport = InMemoryTransport::new();
        let mut a = transport.subscribe(&channels(&["events"])).await.unwrap();
        let mut b = transport.subscribe(&channels(&["events"])).await.unwrap();

        assert_eq!(transport.publish("events", "hello").await, Ok(2));
        assert_eq!(a.next_message().await.unwrap().body, "hello");
        assert_eq!(b.next_message().await.unwrap().body, "hello");
    }

    #[tokio::test]
    async fn test_stream_filters_channels() {
        let transport = InMemoryTransport::new();
        let mut stream = transport.subscribe(&channels(&["b"])).await.unwrap();
        let _other = transport.subscribe(&channels(&["a"])).await.unwrap();

        transport.publish("a", "first").await.unwrap();
        transport.publish("b", "second").await.unwrap();

        let message = stream.next_message().await.unwrap();
        assert_eq!(message.channel, "b");
        assert_eq!(message.body, "second");
    }

    #[tokio::test]
    async fn test_drop_releases_subscription() {
        let transport = InMemoryTransport::new();
        let stream = transport.subscribe(&channels(&["x"])).await.unwrap();
        assert_eq!(transport.subscriber_count("x"), 1);
        drop(stream);
        assert_eq!(transport.subscriber_count("x"), 0);
    }

    #[tokio::test]
    async fn test_injected_publish_failures() {
        let transport = InMemoryTransport::new();
        transport.fail_next_publishes(2);
        assert!(transport.publish("x", "1").await.is_err());
        assert!(transport.publish("x", "2").await.is_err());
        assert!(transport.publish("x", "3").await.is_ok());
    }

    #[tokio::test]
    async fn test_disconnect_ends_streams() {
        let transport = InMemoryTransport::new();
        let mut stream = transport.subscribe(&channels(&["x"])).await.unwrap();
        transport.disconnect_subscribers();

        assert_eq!(
            stream.next_message().await,
            Err(TransportError::ConnectionLost)
        );
        assert_eq!(transport.subscriber_count("x"), 0);
        drop(stream);
        assert_eq!(transport.subscriber_count("x"), 0);
    }

    #[tokio::test]
    async fn test_unavailable_refuses_subscribe() {
        let transport = InMemoryTransport::new();
        transport.set_available(false);
        assert!(transport.subscribe(&channels(&["x"])).await.is_err());
    }
}
