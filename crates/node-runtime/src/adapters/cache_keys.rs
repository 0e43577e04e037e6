//! Cache key and tag layout for standings read models.
//!
//! Keys live under `tournament:{id}:` so key-scan invalidation of the
//! `tournament:{id}` tag reaches them even without a tag index.

use shared_types::TournamentId;

#[must_use]
pub fn tournament_tag(id: TournamentId) -> String {
    format!("tournament:{}", id.get())
}

#[must_use]
pub fn standings_key(id: TournamentId) -> String {
    format!("tournament:{}:standings", id.get())
}

#[must_use]
pub fn standings_tags(id: TournamentId) -> Vec<String> {
    vec![tournament_tag(id), format!("standings:{}", id.get())]
}

#[must_use]
pub fn statistics_key(id: TournamentId) -> String {
    format!("tournament:{}:statistics", id.get())
}

#[must_use]
pub fn statistics_tags(id: TournamentId) -> Vec<String> {
    vec![tournament_tag(id), format!("statistics:{}", id.get())]
}
