//! `match.completed` consumer.

use async_trait::async_trait;
use shared_bus::{EventEnvelope, EventHandler, EventType, HandlerError};
use shared_types::MatchResult;
use std::sync::Arc;
use tracing::debug;

use crate::domain::StandingsError;
use crate::ports::{ApplyOutcome, StandingsApi};

const CONSUMES: &[EventType] = &[EventType::MatchCompleted];

/// Feeds completed matches into the standings engine.
pub struct MatchCompletedHandler {
    standings: Arc<dyn StandingsApi>,
}

impl MatchCompletedHandler {
    #[must_use]
    pub fn new(standings: Arc<dyn StandingsApi>) -> Self {
        Self { standings }
    }
}

#[async_trait]
impl EventHandler for MatchCompletedHandler {
    fn name(&self) -> &'static str {
        "standings"
    }

    fn event_types(&self) -> &[EventType] {
        CONSUMES
    }

    async fn handle(&self, envelope: &EventEnvelope) -> Result<(), HandlerError> {
        let result: MatchResult = envelope
            .payload_as()
            .map_err(|e| HandlerError::InvalidPayload(e.to_string()))?;

        match self.standings.apply_match_result(&result).await {
            Ok(ApplyOutcome::Applied { .. }) => Ok(()),
            Ok(ApplyOutcome::Duplicate) => {
                debug!(
                    event_id = %envelope.event_id,
                    match_id = %result.match_id,
                    "match already counted"
                );
                Ok(())
            }
            Err(
                e @ (StandingsError::SameTeam { .. }
                | StandingsError::WrongTournament { .. }
                | StandingsError::ScoreOverflow { .. }),
            ) => Err(HandlerError::InvalidPayload(e.to_string())),
            Err(e) => Err(HandlerError::Failed(e.to_string())),
        }
    }
}
