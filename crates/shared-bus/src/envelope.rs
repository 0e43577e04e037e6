//! # Event Envelope
//!
//! Standard wrapper around every published domain fact.
//!
//! ```json
//! {
//!   "event_id": "1b4e28ba-2fa1-11d2-883f-0016d3cca427",
//!   "event_type": "match.completed",
//!   "service": "match-service",
//!   "payload": { "tournament_id": 42, "...": "..." },
//!   "timestamp": "2024-05-01T18:00:00Z",
//!   "version": "1.0"
//! }
//! ```
//!
//! Envelopes are immutable once built. Inbound envelopes go through
//! [`EventEnvelope::decode`], which checks required fields, id format,
//! event-type shape, payload shape and the strict timestamp pattern before
//! anything is dispatched.

use crate::events::{DomainEvent, EventType};
use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::time::parse_strict_timestamp;
use thiserror::Error;
use uuid::Uuid;

/// Schema version stamped on every envelope this crate builds.
pub const ENVELOPE_VERSION: &str = "1.0";

/// Fields an inbound envelope must carry.
pub const REQUIRED_FIELDS: [&str; 5] = ["event_id", "event_type", "service", "payload", "timestamp"];

/// Reasons an envelope is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("envelope is not valid JSON: {0}")]
    Malformed(String),

    #[error("envelope must be a JSON object")]
    NotAnObject,

    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("event_id is not a valid UUID: {0}")]
    InvalidId(String),

    #[error("event_type `{0}` is not a dotted lowercase name")]
    InvalidEventType(String),

    #[error("timestamp `{0}` does not match YYYY-MM-DDTHH:MM:SSZ")]
    InvalidTimestamp(String),

    #[error("payload does not match the expected shape: {0}")]
    Payload(String),
}

/// A validated event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: Uuid,
    pub event_type: String,
    pub service: String,
    pub payload: Map<String, Value>,
    #[serde(rename = "timestamp", with = "wire_timestamp")]
    pub occurred_at: DateTime<Utc>,
    pub version: String,
}

impl EventEnvelope {
    /// Build a fresh envelope: random v4 id, current UTC second, current version.
    #[must_use]
    pub fn new(
        event_type: impl Into<String>,
        service: impl Into<String>,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            event_type: event_type.into(),
            service: service.into(),
            payload,
            occurred_at: Utc::now().trunc_subsecs(0),
            version: ENVELOPE_VERSION.to_string(),
        }
    }

    /// Build an envelope around a typed domain event.
    ///
    /// # Errors
    ///
    /// Fails when the event does not serialize to a JSON object.
    pub fn for_event<E: DomainEvent>(
        event: &E,
        service: impl Into<String>,
    ) -> Result<Self, EnvelopeError> {
        let payload = match serde_json::to_value(event) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(EnvelopeError::WrongType {
                    field: "payload",
                    expected: "an object",
                })
            }
            Err(e) => return Err(EnvelopeError::Payload(e.to_string())),
        };
        Ok(Self::new(E::EVENT_TYPE.as_str(), service, payload))
    }

    /// The typed event type, or `None` when this process does not know it.
    #[must_use]
    pub fn kind(&self) -> Option<EventType> {
        EventType::parse(&self.event_type)
    }

    /// Wire timestamp string.
    #[must_use]
    pub fn timestamp(&self) -> String {
        shared_types::time::format_timestamp(self.occurred_at)
    }

    /// Serialize for the transport.
    ///
    /// # Errors
    ///
    /// Only fails if a payload value cannot be represented as JSON.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).map_err(|e| EnvelopeError::Malformed(e.to_string()))
    }

    /// Parse and validate a raw transport message.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn decode(raw: &str) -> Result<Self, EnvelopeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| EnvelopeError::Malformed(e.to_string()))?;
        let Value::Object(mut object) = value else {
            return Err(EnvelopeError::NotAnObject);
        };

        for field in REQUIRED_FIELDS {
            match object.get(field) {
                None | Some(Value::Null) => return Err(EnvelopeError::MissingField(field)),
                Some(_) => {}
            }
        }

        let event_id = string_field(&object, "event_id")?;
        let event_id =
            Uuid::parse_str(event_id).map_err(|_| EnvelopeError::InvalidId(event_id.to_string()))?;

        let event_type = string_field(&object, "event_type")?;
        if !is_dotted_name(event_type) {
            return Err(EnvelopeError::InvalidEventType(event_type.to_string()));
        }
        let event_type = event_type.to_string();

        let service = string_field(&object, "service")?.to_string();

        let timestamp = string_field(&object, "timestamp")?;
        let occurred_at = parse_strict_timestamp(timestamp)
            .ok_or_else(|| EnvelopeError::InvalidTimestamp(timestamp.to_string()))?;

        let version = match object.get("version") {
            Some(Value::String(v)) => v.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => ENVELOPE_VERSION.to_string(),
        };

        let payload = match object.remove("payload") {
            Some(Value::Object(map)) => map,
            _ => {
                return Err(EnvelopeError::WrongType {
                    field: "payload",
                    expected: "an object",
                })
            }
        };

        Ok(Self {
            event_id,
            event_type,
            service,
            payload,
            occurred_at,
            version,
        })
    }

    /// Deserialize the payload into a typed structure.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::Payload`] when fields are missing or mistyped.
    pub fn payload_as<T: DeserializeOwned>(&self) -> Result<T, EnvelopeError> {
        serde_json::from_value(Value::Object(self.payload.clone()))
            .map_err(|e| EnvelopeError::Payload(e.to_string()))
    }
}

fn string_field<'a>(
    object: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a str, EnvelopeError> {
    match object.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        Some(_) => Err(EnvelopeError::WrongType {
            field,
            expected: "a non-empty string",
        }),
        None => Err(EnvelopeError::MissingField(field)),
    }
}

/// `segment(.segment)+`, each segment `[a-z0-9_]+` starting with a letter.
fn is_dotted_name(raw: &str) -> bool {
    let mut segments = 0;
    for segment in raw.split('.') {
        let mut chars = segment.chars();
        match chars.next() {
            Some(c) if c.is_ascii_lowercase() => {}
            _ => return false,
        }
        if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_') {
            return false;
        }
        segments += 1;
    }
    segments >= 2
}

mod wire_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};
    use shared_types::time::{format_timestamp, parse_strict_timestamp};

    pub fn serialize<S>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_timestamp(*at))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse_strict_timestamp(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp `{raw}`")))
    }
}
