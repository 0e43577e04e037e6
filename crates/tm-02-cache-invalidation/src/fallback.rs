//! Substring fallback for events without a complete rule.
//!
//! Errs toward evicting too much: every entity id the payload carries is
//! turned into its tag, and every collection the event type hints at is
//! flushed as well.

use serde_json::{Map, Value};
use std::collections::BTreeSet;

use crate::rules::scalar;

/// Event type substring and the collection tags it implicates.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("tournament", &["tournaments"]),
    ("match", &["matches", "tournaments"]),
    ("team", &["teams"]),
    ("player", &["players", "teams"]),
    ("user", &["users"]),
    ("standing", &["standings"]),
];

/// Payload id field and the tag prefixes it parameterizes.
const ID_FIELDS: &[(&str, &[&str])] = &[
    ("tournament_id", &["tournament", "standings", "statistics"]),
    ("match_id", &["match"]),
    ("team_id", &["team"]),
    ("player_id", &["player"]),
    ("user_id", &["user"]),
];

/// Broad tag set for `event_type`.
#[must_use]
pub fn fallback_tags(event_type: &str, payload: &Map<String, Value>) -> BTreeSet<String> {
    let lowered = event_type.to_ascii_lowercase();
    let mut tags = BTreeSet::new();

    for (needle, collections) in CATEGORIES {
        if lowered.contains(needle) {
            tags.extend(collections.iter().map(|tag| (*tag).to_string()));
        }
    }

    for (field, prefixes) in ID_FIELDS {
        if let Some(id) = payload.get(*field).and_then(scalar) {
            tags.extend(prefixes.iter().map(|prefix| format!("{prefix}:{id}")));
        }
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_collections_from_substrings() {
        let tags = fallback_tags("tournament.archived", &Map::new());
        assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["tournaments"]);
    }

    #[test]
    fn test_ids_become_tags() {
        let tags = fallback_tags(
            "bracket.rebuilt",
            &payload(json!({"tournament_id": 42, "team_id": 5})),
        );
        for expected in ["tournament:42", "standings:42", "statistics:42", "team:5"] {
            assert!(tags.contains(expected), "{expected}");
        }
        assert!(!tags.contains("teams"));
    }

    #[test]
    fn test_unrelated_event_yields_nothing() {
        assert!(fallback_tags("billing.invoiced", &payload(json!({"amount": 10}))).is_empty());
    }

    #[test]
    fn test_case_insensitive() {
        assert!(fallback_tags("Player.Transferred", &Map::new()).contains("players"));
    }
}
