//! # Replay Equivalence
//!
//! Folding results in one at a time, in any order, must leave the same table
//! as replaying the whole history through `recalc_tournament`.

#[cfg(test)]
mod tests {
    use chrono::{Duration as ChronoDuration, TimeZone, Utc};
    use node_runtime::adapters::TaggedStandingsCache;
    use proptest::prelude::*;
    use shared_store::InMemoryStore;
    use shared_types::{MatchId, MatchResult, TeamId, TournamentId};
    use std::sync::Arc;
    use tm_01_standings::{
        ApplyOutcome, InMemoryMatchResults, InMemoryStandingsRepository, MatchResultSource,
        StandingRow, StandingsApi, StandingsConfig, StandingsService,
    };
    use tm_02_cache_invalidation::{CacheConfig, CacheInvalidator, CacheStats, TaggedCache};

    const TOURNAMENT: TournamentId = TournamentId(42);

    fn service() -> (StandingsService, Arc<InMemoryMatchResults>) {
        let store = Arc::new(InMemoryStore::new());
        let stats = Arc::new(CacheStats::default());
        let cache = Arc::new(TaggedStandingsCache::new(
            Arc::new(TaggedCache::new(
                store.clone(),
                CacheConfig::default(),
                Arc::clone(&stats),
            )),
            Arc::new(CacheInvalidator::new(store, CacheConfig::default(), stats)),
        ));
        let results = Arc::new(InMemoryMatchResults::new());
        let service = StandingsService::new(
            Arc::new(InMemoryStandingsRepository::new()),
            results.clone(),
            cache,
            StandingsConfig::default(),
        );
        (service, results)
    }

    /// (home, away, home_score, away_score) with distinct teams.
    fn fixture() -> impl Strategy<Value = (u64, u64, u32, u32)> {
        (1u64..=6, 1u64..=6, 0u32..=5, 0u32..=5).prop_filter("teams differ", |(h, a, _, _)| h != a)
    }

    fn history() -> impl Strategy<Value = Vec<MatchResult>> {
        prop::collection::vec(fixture(), 1..24).prop_map(|fixtures| {
            let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
            fixtures
                .into_iter()
                .enumerate()
                .map(|(i, (home, away, home_score, away_score))| {
                    let n = u64::try_from(i).unwrap();
                    MatchResult {
                        match_id: MatchId(n + 1),
                        tournament_id: TOURNAMENT,
                        home_team_id: TeamId(home),
                        away_team_id: TeamId(away),
                        home_score,
                        away_score,
                        // Several matches share a kickoff slot.
                        completed_at: start + ChronoDuration::hours(i64::try_from(n / 3).unwrap()),
                    }
                })
                .collect()
        })
    }

    async fn incremental_then_recalc(
        arrivals: &[MatchResult],
    ) -> (Vec<StandingRow>, Vec<StandingRow>) {
        let (service, results) = service();
        for result in arrivals {
            results.append(result.clone()).await.unwrap();
            let outcome = service.apply_match_result(result).await.unwrap();
            assert!(matches!(outcome, ApplyOutcome::Applied { .. }));
        }
        let incremental = service.standings(TOURNAMENT).await.unwrap();
        service.recalc_tournament(TOURNAMENT).await.unwrap();
        let replayed = service.standings(TOURNAMENT).await.unwrap();
        (incremental, replayed)
    }

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(future)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_recalc_matches_incremental(history in history()) {
            let (incremental, replayed) = block_on(incremental_then_recalc(&history));
            prop_assert_eq!(incremental, replayed);
        }

        #[test]
        fn prop_arrival_order_does_not_matter(
            arrivals in history().prop_flat_map(|h| Just(h).prop_shuffle())
        ) {
            let mut in_order = arrivals.clone();
            in_order.sort_by_key(MatchResult::replay_key);

            let (shuffled, _) = block_on(incremental_then_recalc(&arrivals));
            let (ordered, _) = block_on(incremental_then_recalc(&in_order));
            prop_assert_eq!(shuffled, ordered);
        }

        #[test]
        fn prop_redelivery_is_idempotent(history in history(), repeat in 0usize..24) {
            block_on(async {
                let (service, results) = service();
                for result in &history {
                    results.append(result.clone()).await.unwrap();
                    service.apply_match_result(result).await.unwrap();
                }
                let before = service.standings(TOURNAMENT).await.unwrap();

                let again = &history[repeat % history.len()];
                let outcome = service.apply_match_result(again).await.unwrap();
                assert_eq!(outcome, ApplyOutcome::Duplicate);
                assert_eq!(service.standings(TOURNAMENT).await.unwrap(), before);
            });
        }
    }

    #[tokio::test]
    async fn test_points_sum_matches_outcomes() {
        let (service, results) = service();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let scores = [(1, 2, 3, 1), (2, 3, 2, 2), (3, 1, 0, 1)];
        for (i, (home, away, hs, aws)) in scores.into_iter().enumerate() {
            let n = u64::try_from(i).unwrap();
            let result = MatchResult {
                match_id: MatchId(n + 1),
                tournament_id: TOURNAMENT,
                home_team_id: TeamId(home),
                away_team_id: TeamId(away),
                home_score: hs,
                away_score: aws,
                completed_at: start + ChronoDuration::minutes(i64::try_from(n).unwrap()),
            };
            results.append(result.clone()).await.unwrap();
            service.apply_match_result(&result).await.unwrap();
        }

        let rows = service.standings(TOURNAMENT).await.unwrap();
        // Two decisive matches (3 each) and one draw (1 each).
        assert_eq!(rows.iter().map(|r| r.points).sum::<u32>(), 8);
        assert_eq!(rows[0].team_id, TeamId(1));
        assert_eq!(rows[0].points, 6);
    }
}
