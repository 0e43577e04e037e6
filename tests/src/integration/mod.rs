//! # Integration Flows
//!
//! Every test drives a fully wired node in-process: the subscriber runs on
//! the in-memory transport and HTTP requests go through the real router via
//! `oneshot`. The limiter reads a manual clock so windows can be crossed
//! without sleeping.

pub mod bus_flows;
pub mod http_flows;
pub mod replay_equivalence;

#[cfg(test)]
pub(crate) mod fixtures {
    use axum::body::Body;
    use axum::http::{header, HeaderMap, Method, Request, StatusCode};
    use axum::Router;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
    use node_runtime::container::TokenGrant;
    use node_runtime::{NodeConfig, NodeRuntime, SubsystemContainer};
    use serde_json::Value;
    use shared_bus::{EventType, ShutdownSignal, ShutdownTrigger};
    use shared_types::{MatchId, MatchResult, TeamId, TournamentId, UserId};
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;
    use tm_03_rate_limiter::{ManualClock, Tier};
    use tokio::task::JoinHandle;
    use tower::ServiceExt;

    pub const ORGANISER_TOKEN: &str = "organiser-token";
    pub const START_MILLIS: u64 = 1_714_586_400_000;

    pub fn kickoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 18, 0, 0).unwrap()
    }

    pub fn result(
        match_id: u64,
        tournament: u64,
        home: u64,
        away: u64,
        home_score: u32,
        away_score: u32,
    ) -> MatchResult {
        MatchResult {
            match_id: MatchId(match_id),
            tournament_id: TournamentId(tournament),
            home_team_id: TeamId(home),
            away_team_id: TeamId(away),
            home_score,
            away_score,
            completed_at: kickoff() + ChronoDuration::minutes(i64::try_from(match_id).unwrap()),
        }
    }

    /// Default node config with one organiser token and a quick publisher.
    pub fn config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.auth.tokens = vec![TokenGrant {
            token: ORGANISER_TOKEN.to_string(),
            user_id: UserId(1),
            tier: Some(Tier::Business),
        }];
        config.bus.publisher.retry_delay = Duration::from_millis(10);
        config
    }

    pub struct TestNode {
        pub container: Arc<SubsystemContainer>,
        pub router: Router,
        pub clock: Arc<ManualClock>,
        trigger: ShutdownTrigger,
        subscriber: JoinHandle<()>,
    }

    impl TestNode {
        pub async fn start(config: NodeConfig) -> Self {
            let clock = Arc::new(ManualClock::new(START_MILLIS));
            let container = SubsystemContainer::with_clock(config, clock.clone()).unwrap();
            let runtime = NodeRuntime::from_container(container);
            let container = runtime.container();
            let router = runtime.router();

            let (trigger, signal): (ShutdownTrigger, ShutdownSignal) = ShutdownSignal::channel();
            let subscriber = Arc::clone(&container.subscriber);
            let subscriber = tokio::spawn(async move {
                subscriber.run(signal).await.unwrap();
            });

            let transport = Arc::clone(&container.transport);
            assert!(
                eventually(|| {
                    let transport = Arc::clone(&transport);
                    async move { transport.subscriber_count(EventType::MatchCompleted.as_str()) > 0 }
                })
                .await,
                "subscriber never connected"
            );

            Self {
                container,
                router,
                clock,
                trigger,
                subscriber,
            }
        }

        pub async fn request(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<&Value>,
        ) -> (StatusCode, HeaderMap, Value) {
            let mut request = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let body = match body {
                Some(json) => {
                    request = request.header(header::CONTENT_TYPE, "application/json");
                    Body::from(json.to_string())
                }
                None => Body::empty(),
            };
            let response = self
                .router
                .clone()
                .oneshot(request.body(body).unwrap())
                .await
                .unwrap();

            let status = response.status();
            let headers = response.headers().clone();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
            (status, headers, json)
        }

        pub async fn get(&self, uri: &str) -> (StatusCode, HeaderMap, Value) {
            self.request(Method::GET, uri, None, None).await
        }

        pub async fn post_match(&self, result: &MatchResult) -> (StatusCode, Value) {
            let body = serde_json::to_value(result).unwrap();
            let (status, _, json) = self
                .request(Method::POST, "/matches", Some(ORGANISER_TOKEN), Some(&body))
                .await;
            (status, json)
        }

        pub async fn stop(self) {
            self.trigger.trigger();
            tokio::time::timeout(Duration::from_secs(5), self.subscriber)
                .await
                .expect("subscriber did not stop")
                .unwrap();
        }
    }

    /// Poll `check` until it holds, for at most five seconds.
    pub async fn eventually<F, Fut>(mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if check().await {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .is_ok()
    }
}
