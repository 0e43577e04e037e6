//! # Invalidation Rules
//!
//! Maps each event type to the cache tags it makes stale.
//!
//! Templates use `{field}` placeholders filled from the envelope payload.
//! A template whose field is missing (or not a number or string) renders
//! nothing; when that happens, or the event type is unknown, the substring
//! fallback in [`crate::fallback`] adds its broader tag set on top.

use serde_json::{Map, Value};
use shared_bus::EventType;
use std::collections::BTreeSet;

use crate::fallback;

/// Tag templates for one event type.
#[must_use]
pub fn templates_for(event_type: EventType) -> &'static [&'static str] {
    match event_type {
        EventType::TournamentCreated => &["tournaments"],
        EventType::TournamentUpdated => &["tournament:{tournament_id}", "tournaments"],
        EventType::TournamentStarted | EventType::TournamentCompleted => &[
            "tournament:{tournament_id}",
            "standings:{tournament_id}",
            "tournaments",
        ],
        EventType::TournamentDeleted => &[
            "tournament:{tournament_id}",
            "standings:{tournament_id}",
            "statistics:{tournament_id}",
            "tournaments",
        ],
        EventType::MatchScheduled => &["tournament:{tournament_id}", "matches"],
        EventType::MatchStarted | EventType::MatchUpdated | EventType::MatchCancelled => &[
            "match:{match_id}",
            "tournament:{tournament_id}",
            "matches",
        ],
        EventType::MatchCompleted => &[
            "tournament:{tournament_id}",
            "standings:{tournament_id}",
            "statistics:{tournament_id}",
            "match:{match_id}",
            "matches",
        ],
        EventType::TeamRegistered => &["tournament:{tournament_id}", "teams"],
        EventType::TeamUpdated => &["team:{team_id}", "teams"],
        EventType::TeamWithdrawn => &[
            "team:{team_id}",
            "tournament:{tournament_id}",
            "standings:{tournament_id}",
            "teams",
        ],
        EventType::PlayerRegistered | EventType::PlayerUpdated => {
            &["player:{player_id}", "team:{team_id}", "players"]
        }
        EventType::UserUpdated => &["user:{user_id}"],
        EventType::StandingsUpdated => &["standings:{tournament_id}"],
    }
}

/// Render one template against `payload`.
///
/// Returns `None` if any placeholder is unresolved.
#[must_use]
pub fn render(template: &str, payload: &Map<String, Value>) -> Option<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let close = after.find('}')?;
        out.push_str(&scalar(payload.get(&after[..close])?)?);
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Some(out)
}

/// Payload value usable inside a tag.
pub(crate) fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Tags resolved for one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagResolution {
    pub tags: BTreeSet<String>,
    /// Whether the substring fallback contributed.
    pub used_fallback: bool,
}

impl TagResolution {
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.tags.iter().cloned().collect()
    }
}

/// Resolve the tags invalidated by an event given its wire type and payload.
#[must_use]
pub fn resolve(event_type: &str, payload: &Map<String, Value>) -> TagResolution {
    let mut resolution = TagResolution::default();

    let complete = match EventType::parse(event_type) {
        Some(known) => {
            let mut complete = true;
            for template in templates_for(known) {
                match render(template, payload) {
                    Some(tag) => {
                        resolution.tags.insert(tag);
                    }
                    None => complete = false,
                }
            }
            complete
        }
        None => false,
    };

    if !complete {
        resolution.used_fallback = true;
        resolution
            .tags
            .extend(fallback::fallback_tags(event_type, payload));
    }
    resolution
}
