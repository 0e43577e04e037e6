//! # Tournament Platform Benchmarks
//!
//! Hot paths of the consistency layer:
//!
//! | Path | Work per call |
//! |------|---------------|
//! | standings fold | validate + fold one result into a table |
//! | ranking | sort a table under the default policy |
//! | limiter check | prune, count, record across three windows |
//! | tag resolution | render rule templates for one event |

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::{json, Map, Value};
use shared_store::InMemoryStore;
use shared_types::{MatchId, MatchResult, TeamId, TournamentId};
use std::sync::Arc;
use std::time::Duration;
use tm_01_standings::{RankingPolicy, StandingsTable};
use tm_02_cache_invalidation::resolve;
use tm_03_rate_limiter::{ManualClock, RateLimitConfig, RequestIdentity, SlidingWindowLimiter};

fn season(teams: u64) -> Vec<MatchResult> {
    let start = Utc.with_ymd_and_hms(2024, 8, 1, 15, 0, 0).unwrap();
    let mut id = 0;
    let mut results = Vec::new();
    for home in 1..=teams {
        for away in 1..=teams {
            if home == away {
                continue;
            }
            id += 1;
            results.push(MatchResult {
                match_id: MatchId(id),
                tournament_id: TournamentId(1),
                home_team_id: TeamId(home),
                away_team_id: TeamId(away),
                home_score: u32::try_from((home * 7 + away) % 4).unwrap(),
                away_score: u32::try_from((away * 3 + home) % 3).unwrap(),
                completed_at: start + ChronoDuration::hours(i64::try_from(id).unwrap()),
            });
        }
    }
    results
}

fn bench_standings(c: &mut Criterion) {
    let mut group = c.benchmark_group("tm-01-standings");
    group.measurement_time(Duration::from_secs(5));

    for teams in [8u64, 20, 40] {
        let results = season(teams);
        group.throughput(Throughput::Elements(results.len() as u64));
        group.bench_with_input(BenchmarkId::new("fold_season", teams), &results, |b, results| {
            b.iter(|| {
                let mut table = StandingsTable::new(TournamentId(1));
                for result in results {
                    table.apply(result).unwrap();
                }
                black_box(table.team_count())
            });
        });

        let mut table = StandingsTable::new(TournamentId(1));
        for result in &results {
            table.apply(result).unwrap();
        }
        let policy = RankingPolicy::default();
        group.bench_with_input(BenchmarkId::new("rank", teams), &table, |b, table| {
            b.iter(|| {
                let mut table = table.clone();
                policy.rank(&mut table);
                black_box(table.ranked().len())
            });
        });
    }
    group.finish();
}

fn bench_limiter(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let clock = Arc::new(ManualClock::new(1_714_586_400_000));
    let limiter = SlidingWindowLimiter::new(
        Arc::new(InMemoryStore::new()),
        clock.clone(),
        RateLimitConfig::default(),
    );

    let mut group = c.benchmark_group("tm-03-rate-limiter");
    let mut octet = 0u8;
    group.bench_function("check_fresh_client", |b| {
        b.iter(|| {
            octet = octet.wrapping_add(1);
            let identity = RequestIdentity::from_ip([10, 0, 0, octet].into());
            clock.advance_millis(1);
            black_box(runtime.block_on(limiter.check(&identity)).allowed)
        });
    });
    group.finish();
}

fn bench_tag_resolution(c: &mut Criterion) {
    let payload: Map<String, Value> = match json!({
        "match_id": 77,
        "tournament_id": 42,
        "home_team_id": 1,
        "away_team_id": 2,
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    };

    let mut group = c.benchmark_group("tm-02-cache-invalidation");
    group.bench_function("resolve_known", |b| {
        b.iter(|| black_box(resolve("match.completed", &payload).tags.len()));
    });
    group.bench_function("resolve_fallback", |b| {
        b.iter(|| black_box(resolve("venue.match.moved", &payload).tags.len()));
    });
    group.finish();
}

criterion_group!(benches, bench_standings, bench_limiter, bench_tag_resolution);
criterion_main!(benches);
