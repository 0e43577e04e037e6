//! # Handler Registry
//!
//! Handlers declare the [`EventType`]s they consume. The registry is built
//! once at startup and validated: a handler with no declared types, or a
//! required type with no handler, is a startup error rather than a silent
//! gap discovered in production.
//!
//! Dispatch is an enum-keyed lookup. Types with no registered handler are
//! skipped.

use crate::envelope::EventEnvelope;
use crate::events::EventType;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Failure reported by a handler. The subscriber logs it and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The payload lacked fields or had the wrong shape.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The handler's unit of work failed and was rolled back.
    #[error("processing failed: {0}")]
    Failed(String),
}

/// Consumer of envelopes for a fixed set of event types.
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Stable name for logs and metrics.
    fn name(&self) -> &'static str;

    /// Event types this handler consumes. Must not be empty.
    fn event_types(&self) -> &[EventType];

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), HandlerError>;
}

/// Registry construction errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("handler `{0}` declares no event types")]
    HandlerWithoutEvents(&'static str),

    #[error("no handler registered for required event type `{0}`")]
    MissingHandler(EventType),
}

/// Builder for [`HandlerRegistry`].
#[derive(Default)]
pub struct HandlerRegistryBuilder {
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl HandlerRegistryBuilder {
    #[must_use]
    pub fn with_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Validate and freeze the registry.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::HandlerWithoutEvents`] for a handler declaring nothing.
    /// - [`RegistryError::MissingHandler`] for a `required` type nobody handles.
    pub fn build(self, required: &[EventType]) -> Result<HandlerRegistry, RegistryError> {
        let mut routes: BTreeMap<EventType, Vec<Arc<dyn EventHandler>>> = BTreeMap::new();
        for handler in self.handlers {
            if handler.event_types().is_empty() {
                return Err(RegistryError::HandlerWithoutEvents(handler.name()));
            }
            for event_type in handler.event_types() {
                routes
                    .entry(*event_type)
                    .or_default()
                    .push(Arc::clone(&handler));
            }
        }
        for event_type in required {
            if !routes.contains_key(event_type) {
                return Err(RegistryError::MissingHandler(*event_type));
            }
        }
        Ok(HandlerRegistry { routes })
    }
}

/// Validated event-type to handler map.
pub struct HandlerRegistry {
    routes: BTreeMap<EventType, Vec<Arc<dyn EventHandler>>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// Handlers for `event_type`, in registration order.
    #[must_use]
    pub fn handlers_for(&self, event_type: EventType) -> &[Arc<dyn EventHandler>] {
        self.routes.get(&event_type).map_or(&[], Vec::as_slice)
    }

    /// Event types with at least one handler.
    pub fn event_types(&self) -> impl Iterator<Item = EventType> + '_ {
        self.routes.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str, &'static [EventType]);

    #[async_trait]
    impl EventHandler for Named {
        fn name(&self) -> &'static str {
            self.0
        }
        fn event_types(&self) -> &[EventType] {
            self.1
        }
        async fn handle(&self, _envelope: &EventEnvelope) -> Result<(), HandlerError> {
            Ok(())
        }
    }

    #[test]
    fn test_routes_by_declared_types() {
        let registry = HandlerRegistry::builder()
            .with_handler(Arc::new(Named("standings", &[EventType::MatchCompleted])))
            .with_handler(Arc::new(Named(
                "cache",
                &[EventType::MatchCompleted, EventType::TeamUpdated],
            )))
            .build(&[EventType::MatchCompleted])
            .unwrap();

        let names: Vec<_> = registry
            .handlers_for(EventType::MatchCompleted)
            .iter()
            .map(|h| h.name())
            .collect();
        assert_eq!(names, vec!["standings", "cache"]);
        assert_eq!(registry.handlers_for(EventType::TeamUpdated).len(), 1);
        assert!(registry.handlers_for(EventType::UserUpdated).is_empty());
    }

    #[test]
    fn test_handler_without_events_rejected() {
        let result = HandlerRegistry::builder()
            .with_handler(Arc::new(Named("empty", &[])))
            .build(&[]);
        assert!(matches!(
            result,
            Err(RegistryError::HandlerWithoutEvents("empty"))
        ));
    }

    #[test]
    fn test_missing_required_handler_rejected() {
        let result = HandlerRegistry::builder()
            .with_handler(Arc::new(Named("cache", &[EventType::TeamUpdated])))
            .build(&[EventType::MatchCompleted]);
        assert!(matches!(
            result,
            Err(RegistryError::MissingHandler(EventType::MatchCompleted))
        ));
    }
}
