//! Bus consumer that invalidates caches for every event type.

use async_trait::async_trait;
use shared_bus::{EventEnvelope, EventHandler, EventType, HandlerError};
use std::sync::Arc;
use tracing::debug;

use crate::invalidator::CacheInvalidator;

pub struct InvalidationHandler {
    invalidator: Arc<CacheInvalidator>,
}

impl InvalidationHandler {
    #[must_use]
    pub fn new(invalidator: Arc<CacheInvalidator>) -> Self {
        Self { invalidator }
    }
}

#[async_trait]
impl EventHandler for InvalidationHandler {
    fn name(&self) -> &'static str {
        "cache-invalidation"
    }

    fn event_types(&self) -> &[EventType] {
        &EventType::ALL
    }

    /// Always succeeds; store failures are counted by the invalidator.
    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), HandlerError> {
        let report = self
            .invalidator
            .invalidate_event(&envelope.event_type, &envelope.payload)
            .await;
        debug!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            keys_removed = report.keys_removed,
            failed = report.failed,
            "invalidation handled"
        );
        Ok(())
    }
}
