//! # Event Bus Flows
//!
//! `match.completed` fans out to two handlers, in this order:
//!
//! 1. **Cache invalidation**: evicts `tournament:`, `standings:` and
//!    `statistics:` tags of the tournament.
//! 2. **Standings**: folds the result in, commits, caches statistics and
//!    announces `standings.updated`.

#[cfg(test)]
mod tests {
    use super::super::fixtures::{config, eventually, result, TestNode};
    use axum::http::{Method, StatusCode};
    use node_runtime::adapters::cache_keys;
    use serde_json::{json, Value};
    use shared_bus::{EventEnvelope, MatchCompleted, PubSubTransport};
    use shared_types::{TeamId, TournamentId};
    use std::sync::Arc;
    use tm_01_standings::{StandingsApi, TournamentStatistics};

    async fn played(node: &TestNode, tournament: u64, team: u64) -> Option<u32> {
        node.container
            .standings
            .standings(TournamentId(tournament))
            .await
            .ok()?
            .into_iter()
            .find(|row| row.team_id == TeamId(team))
            .map(|row| row.played)
    }

    async fn wait_played(node: &TestNode, tournament: u64, team: u64, expected: u32) -> bool {
        eventually(|| async move { played(node, tournament, team).await == Some(expected) }).await
    }

    /// Each applied match costs three handler runs: invalidation and standings
    /// for `match.completed`, then invalidation for `standings.updated`.
    async fn wait_handled(node: &TestNode, expected: u64) -> bool {
        let subscriber = Arc::clone(&node.container.subscriber);
        eventually(|| {
            let subscriber = Arc::clone(&subscriber);
            async move { subscriber.stats().snapshot().handled >= expected }
        })
        .await
    }

    #[tokio::test]
    async fn test_recorded_match_reaches_standings_and_statistics() {
        let node = TestNode::start(config()).await;

        let (status, body) = node.post_match(&result(1, 42, 10, 20, 3, 1)).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["published"], json!(true));
        assert!(wait_played(&node, 42, 10, 1).await);

        let (status, _, body) = node.get("/tournaments/42/standings").await;
        assert_eq!(status, StatusCode::OK);
        let rows = body["standings"].as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["team_id"], json!(10));
        assert_eq!(rows[0]["points"], json!(3));
        assert_eq!(rows[0]["goal_difference"], json!(2));
        assert_eq!(rows[1]["team_id"], json!(20));
        assert_eq!(rows[1]["points"], json!(0));
        assert_eq!(rows[1]["goal_difference"], json!(-2));

        // The standings engine cached statistics after committing.
        let cached: Option<TournamentStatistics> = node
            .container
            .cache
            .get(&cache_keys::statistics_key(TournamentId(42)))
            .await;
        assert_eq!(cached.map(|s| s.total_goals), Some(4));

        let (status, _, body) = node.get("/tournaments/42/statistics").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["statistics"]["matches_played"], json!(1));
        assert_eq!(body["statistics"]["average_goals_per_match"], json!(4.0));

        node.stop().await;
    }

    #[tokio::test]
    async fn test_new_result_evicts_cached_standings() {
        let node = TestNode::start(config()).await;

        node.post_match(&result(1, 42, 10, 20, 2, 2)).await;
        assert!(wait_played(&node, 42, 10, 1).await);
        let (_, _, first) = node.get("/tournaments/42/standings").await;
        assert_eq!(first["standings"][0]["drawn"], json!(1));

        node.post_match(&result(2, 42, 20, 10, 0, 1)).await;
        assert!(wait_played(&node, 42, 10, 2).await);

        let (_, _, second) = node.get("/tournaments/42/standings").await;
        let leader = &second["standings"][0];
        assert_eq!(leader["team_id"], json!(10));
        assert_eq!(leader["played"], json!(2));
        assert_eq!(leader["points"], json!(4));

        node.stop().await;
    }

    #[tokio::test]
    async fn test_other_tournament_cache_survives() {
        let node = TestNode::start(config()).await;

        node.post_match(&result(1, 42, 10, 20, 1, 0)).await;
        node.post_match(&result(2, 43, 30, 40, 0, 0)).await;
        assert!(wait_handled(&node, 6).await);

        node.get("/tournaments/42/standings").await;
        node.get("/tournaments/43/standings").await;
        let key_43 = cache_keys::standings_key(TournamentId(43));
        let before: Option<Value> = node.container.cache.get(&key_43).await;
        assert!(before.is_some());

        node.post_match(&result(3, 42, 20, 10, 2, 0)).await;
        assert!(wait_handled(&node, 9).await);
        assert_eq!(played(&node, 42, 10).await, Some(2));

        let after: Option<Value> = node.container.cache.get(&key_43).await;
        assert_eq!(after, before);
        let evicted: Option<Value> = node
            .container
            .cache
            .get(&cache_keys::standings_key(TournamentId(42)))
            .await;
        assert!(evicted.is_none());

        node.stop().await;
    }

    #[tokio::test]
    async fn test_redelivered_result_counted_once() {
        let node = TestNode::start(config()).await;
        let match_result = result(1, 42, 10, 20, 3, 1);

        // Two envelopes, two event ids, same match: only match_id dedupe catches it.
        for _ in 0..2 {
            let outcome = node
                .container
                .publisher
                .publish_event(&MatchCompleted(match_result.clone()))
                .await;
            assert!(outcome.is_accepted());
        }

        // 3 for the first delivery, 2 for the second (no announcement).
        assert!(wait_handled(&node, 5).await);
        assert_eq!(played(&node, 42, 10).await, Some(1));

        node.stop().await;
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_dropped() {
        let node = TestNode::start(config()).await;

        let envelope =
            EventEnvelope::for_event(&MatchCompleted(result(1, 42, 10, 20, 3, 1)), "scores")
                .unwrap();
        let mut raw: Value = serde_json::from_str(&envelope.encode().unwrap()).unwrap();
        raw["timestamp"] = json!("2024-05-01 18:00");
        let delivered = node
            .container
            .transport
            .publish("match.completed", &raw.to_string())
            .await
            .unwrap();
        assert_eq!(delivered, 1);

        let subscriber = Arc::clone(&node.container.subscriber);
        assert!(
            eventually(|| {
                let subscriber = Arc::clone(&subscriber);
                async move { subscriber.stats().snapshot().invalid == 1 }
            })
            .await
        );
        assert_eq!(played(&node, 42, 10).await, None);
        assert_eq!(node.container.subscriber.stats().snapshot().handled, 0);

        node.stop().await;
    }

    #[tokio::test]
    async fn test_recalculate_rebuilds_from_history() {
        let node = TestNode::start(config()).await;

        node.post_match(&result(1, 42, 10, 20, 3, 1)).await;
        node.post_match(&result(2, 42, 20, 30, 1, 1)).await;
        assert!(wait_played(&node, 42, 20, 2).await);
        let (_, _, before) = node.get("/tournaments/42/standings").await;

        let (status, _, body) = node
            .request(
                Method::POST,
                "/tournaments/42/recalculate",
                Some(super::super::fixtures::ORGANISER_TOKEN),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"]["matches_replayed"], json!(2));
        assert_eq!(body["summary"]["teams"], json!(3));

        let (_, _, after) = node.get("/tournaments/42/standings").await;
        assert_eq!(after["standings"], before["standings"]);

        node.stop().await;
    }
}
