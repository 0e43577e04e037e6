//! Bus configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// How event types map onto broker channels.
///
/// Dispatch always keys on the envelope's `event_type`, so both strategies
/// deliver identically; they differ only in broker fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "name")]
pub enum ChannelStrategy {
    /// One channel per event type, named after it (`match.completed`).
    PerEventType,
    /// Every event on a single named channel.
    Shared(String),
}

impl Default for ChannelStrategy {
    fn default() -> Self {
        Self::PerEventType
    }
}

impl ChannelStrategy {
    /// Channel an event of `event_type` is published on.
    #[must_use]
    pub fn channel_for<'a>(&'a self, event_type: &'a str) -> &'a str {
        match self {
            Self::PerEventType => event_type,
            Self::Shared(name) => name,
        }
    }
}

/// Top-level bus configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Stamped as `service` on every published envelope.
    pub service_name: String,
    pub channels: ChannelStrategy,
    pub publisher: PublisherConfig,
    pub subscriber: SubscriberConfig,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            service_name: "tournament-service".to_string(),
            channels: ChannelStrategy::default(),
            publisher: PublisherConfig::default(),
            subscriber: SubscriberConfig::default(),
        }
    }
}

/// Publisher retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherConfig {
    /// Total attempts per publish, including the first.
    pub max_attempts: u32,
    /// Fixed delay between attempts.
    #[serde(with = "shared_types::duration")]
    pub retry_delay: Duration,
    /// Deadline for each transport call.
    #[serde(with = "shared_types::duration")]
    pub call_timeout: Duration,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(100),
            call_timeout: Duration::from_secs(5),
        }
    }
}

/// Subscriber reconnect and dedupe policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberConfig {
    /// Fixed backoff between reconnect attempts.
    #[serde(with = "shared_types::duration")]
    pub reconnect_delay: Duration,
    /// Consecutive failed subscribe attempts before the subscriber stops.
    pub max_reconnect_attempts: u32,
    /// Deadline for each subscribe call.
    #[serde(with = "shared_types::duration")]
    pub call_timeout: Duration,
    /// How long processed event ids are remembered.
    #[serde(with = "shared_types::duration")]
    pub dedup_retention: Duration,
    pub dedup_capacity: usize,
}

impl Default for SubscriberConfig {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(5),
            max_reconnect_attempts: 10,
            call_timeout: Duration::from_secs(5),
            dedup_retention: Duration::from_secs(300),
            dedup_capacity: 10_000,
        }
    }
}

/// Invalid bus configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusConfigError {
    #[error("service_name must not be empty")]
    EmptyServiceName,
    #[error("shared channel name must not be empty")]
    EmptyChannelName,
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

impl BusConfig {
    /// Validate configuration.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting.
    pub fn validate(&self) -> Result<(), BusConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(BusConfigError::EmptyServiceName);
        }
        if let ChannelStrategy::Shared(name) = &self.channels {
            if name.trim().is_empty() {
                return Err(BusConfigError::EmptyChannelName);
            }
        }
        if self.publisher.max_attempts == 0 {
            return Err(BusConfigError::Zero("publisher.max_attempts"));
        }
        if self.publisher.call_timeout.is_zero() {
            return Err(BusConfigError::Zero("publisher.call_timeout"));
        }
        if self.subscriber.max_reconnect_attempts == 0 {
            return Err(BusConfigError::Zero("subscriber.max_reconnect_attempts"));
        }
        if self.subscriber.call_timeout.is_zero() {
            return Err(BusConfigError::Zero("subscriber.call_timeout"));
        }
        if self.subscriber.dedup_capacity == 0 {
            return Err(BusConfigError::Zero("subscriber.dedup_capacity"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = BusConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.publisher.max_attempts, 3);
        assert_eq!(config.publisher.retry_delay, Duration::from_millis(100));
        assert_eq!(config.subscriber.reconnect_delay, Duration::from_secs(5));
        assert_eq!(config.subscriber.max_reconnect_attempts, 10);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: BusConfig = serde_json::from_str(
            r#"{"channels":{"mode":"shared","name":"tournament-events"},"publisher":{"retry_delay":"250ms"}}"#,
        )
        .unwrap();
        assert_eq!(
            config.channels,
            ChannelStrategy::Shared("tournament-events".into())
        );
        assert_eq!(config.publisher.retry_delay, Duration::from_millis(250));
        assert_eq!(config.publisher.max_attempts, 3);
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = BusConfig::default();
        config.publisher.max_attempts = 0;
        assert_eq!(
            config.validate(),
            Err(BusConfigError::Zero("publisher.max_attempts"))
        );
    }

    #[test]
    fn test_channel_for() {
        assert_eq!(
            ChannelStrategy::PerEventType.channel_for("match.completed"),
            "match.completed"
        );
        assert_eq!(
            ChannelStrategy::Shared("all".into()).channel_for("match.completed"),
            "all"
        );
    }
}
