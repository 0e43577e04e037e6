//! # Sliding-Window Limiter
//!
//! Each `(identifier, tier, window)` owns a sorted set of request
//! timestamps in milliseconds. A check runs in two phases:
//!
//! 1. For every window: drop entries at or before `now - window`, count the
//!    rest, and compare with the limit.
//! 2. Only if every window has room: record `now` in every window and extend
//!    the key's TTL to the window plus a little slack.
//!
//! A rejected request therefore consumes no quota. The gap between
//! counting and recording is not atomic, so concurrent requests can
//! overshoot a limit slightly.
//!
//! Store errors admit the request (fail open) and mark the decision degraded.

use serde::Serialize;
use shared_store::{bounded, SortedSetStore, StoreResult};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clock::Clock;
use crate::config::{RateLimitConfig, Tier, Window, WindowQuota};
use crate::identifier::{self, ClientIdentifier, IdentifierKind, RequestIdentity};
use crate::stats::RateLimitStats;

/// State of one window after a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WindowStatus {
    pub window: Window,
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds when the oldest counted request leaves the window.
    pub reset_at: u64,
    /// Seconds until this window admits again, when it is full.
    pub retry_after: Option<u64>,
}

/// Admission decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub allowed: bool,
    pub tier: Tier,
    pub identifier_kind: IdentifierKind,
    pub windows: Vec<WindowStatus>,
    /// Largest `retry_after` over the full windows.
    pub retry_after: Option<u64>,
    /// The store failed and the request was admitted unchecked.
    pub degraded: bool,
}

impl Decision {
    fn unchecked(id: &ClientIdentifier, quotas: &[WindowQuota], now_ms: u64, degraded: bool) -> Self {
        Self {
            allowed: true,
            tier: id.tier,
            identifier_kind: id.kind,
            windows: quotas
                .iter()
                .map(|quota| WindowStatus {
                    window: quota.window,
                    limit: quota.limit,
                    remaining: quota.limit,
                    reset_at: ceil_secs(now_ms + quota.window.millis()),
                    retry_after: None,
                })
                .collect(),
            retry_after: None,
            degraded,
        }
    }
}

fn ceil_secs(ms: u64) -> u64 {
    ms.div_ceil(1_000)
}

/// Multi-window, multi-tier limiter over a sorted-set store.
pub struct SlidingWindowLimiter {
    store: Arc<dyn SortedSetStore>,
    clock: Arc<dyn Clock>,
    config: RateLimitConfig,
    stats: Arc<RateLimitStats>,
}

impl SlidingWindowLimiter {
    #[must_use]
    pub fn new(
        store: Arc<dyn SortedSetStore>,
        clock: Arc<dyn Clock>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            store,
            clock,
            config,
            stats: Arc::new(RateLimitStats::default()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> Arc<RateLimitStats> {
        Arc::clone(&self.stats)
    }

    /// Store key of one window.
    #[must_use]
    pub fn window_key(&self, id: &ClientIdentifier, window: Window) -> String {
        format!(
            "{}:{}:{}:{}:{}",
            self.config.key_prefix,
            id.kind.as_str(),
            id.value,
            id.tier,
            window
        )
    }

    /// Check and, if admitted, record one request.
    pub async fn check(&self, identity: &RequestIdentity) -> Decision {
        let id = identifier::resolve(identity);
        let now_ms = self.clock.now_millis();
        let quotas = self.config.quotas(id.tier);

        if !self.config.enabled || self.config.whitelist.contains(&identity.ip) {
            self.stats.bypassed.fetch_add(1, Ordering::Relaxed);
            return Decision::unchecked(&id, quotas, now_ms, false);
        }

        match self.evaluate(&id, quotas, now_ms).await {
            Ok(decision) => {
                if decision.allowed {
                    self.stats.admitted.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        kind = id.kind.as_str(),
                        tier = %id.tier,
                        "request admitted"
                    );
                } else {
                    self.stats.rejected.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        kind = id.kind.as_str(),
                        tier = %id.tier,
                        retry_after = decision.retry_after,
                        "rate limit exceeded"
                    );
                }
                decision
            }
            Err(e) => {
                self.stats.fail_open.fetch_add(1, Ordering::Relaxed);
                warn!(
                    kind = id.kind.as_str(),
                    tier = %id.tier,
                    error = %e,
                    "rate limit store unavailable, admitting request"
                );
                Decision::unchecked(&id, quotas, now_ms, true)
            }
        }
    }

    async fn evaluate(
        &self,
        id: &ClientIdentifier,
        quotas: &[WindowQuota],
        now_ms: u64,
    ) -> StoreResult<Decision> {
        let timeout = self.config.call_timeout;
        let mut windows = Vec::with_capacity(quotas.len());
        let mut counts = Vec::with_capacity(quotas.len());

        for quota in quotas {
            let key = self.window_key(id, quota.window);
            let window_ms = quota.window.millis();
            let cutoff = now_ms.saturating_sub(window_ms);

            #[allow(clippy::cast_precision_loss)]
            bounded(timeout, self.store.zrem_range_by_score(&key, 0.0, cutoff as f64)).await?;
            let count = bounded(timeout, self.store.zcard(&key)).await?;
            let oldest_ms = if count > 0 {
                bounded(timeout, self.store.zfirst(&key))
                    .await?
                    .map(|(_, score)| score_to_millis(score))
            } else {
                None
            };

            let expires_at_ms = oldest_ms.map_or(now_ms + window_ms, |oldest| oldest + window_ms);
            let retry_after = (count >= quota.limit).then(|| {
                let wait_ms = expires_at_ms.saturating_sub(now_ms);
                ceil_secs(wait_ms).max(1)
            });
            windows.push(WindowStatus {
                window: quota.window,
                limit: quota.limit,
                remaining: quota.limit.saturating_sub(count),
                reset_at: ceil_secs(expires_at_ms),
                retry_after,
            });
            counts.push(count);
        }

        let retry_after = windows.iter().filter_map(|w| w.retry_after).max();
        let allowed = retry_after.is_none();

        if allowed {
            let member = format!("{now_ms}-{}", Uuid::new_v4().simple());
            for status in &mut windows {
                let key = self.window_key(id, status.window);
                #[allow(clippy::cast_precision_loss)]
                bounded(timeout, self.store.zadd(&key, now_ms as f64, &member)).await?;
                let ttl = std::time::Duration::from_secs(status.window.seconds()) + self.config.ttl_slack;
                bounded(timeout, self.store.expire(&key, ttl)).await?;
                status.remaining = status.remaining.saturating_sub(1);
            }
        } else {
            for status in &mut windows {
                if status.retry_after.is_some() {
                    status.remaining = 0;
                }
            }
        }

        Ok(Decision {
            allowed,
            tier: id.tier,
            identifier_kind: id.kind,
            windows,
            retry_after,
            degraded: false,
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn score_to_millis(score: f64) -> u64 {
    if score.is_finite() && score > 0.0 {
        score as u64
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::identifier::AuthenticatedUser;
    use shared_store::InMemoryStore;
    use shared_types::UserId;
    use std::net::{IpAddr, Ipv4Addr};

    const START_MS: u64 = 1_700_000_000_000;

    struct Fixture {
        limiter: SlidingWindowLimiter,
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn fixture(config: RateLimitConfig) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::new(START_MS));
        let limiter = SlidingWindowLimiter::new(store.clone(), clock.clone(), config);
        Fixture {
            limiter,
            store,
            clock,
        }
    }

    fn ip_identity(last: u8) -> RequestIdentity {
        RequestIdentity::from_ip(IpAddr::V4(Ipv4Addr::new(10, 0, 0, last)))
    }

    #[tokio::test]
    async fn test_admits_limit_then_rejects() {
        let f = fixture(RateLimitConfig::single_window(Window::Minute, 5));
        let who = ip_identity(1);

        for i in 0..5u64 {
            f.clock.advance_millis(1_000);
            let decision = f.limiter.check(&who).await;
            assert!(decision.allowed, "request {i}");
            assert_eq!(decision.windows[0].remaining, 4 - i);
        }

        f.clock.advance_millis(1_000);
        let decision = f.limiter.check(&who).await;
        assert!(!decision.allowed);
        let retry_after = decision.retry_after.unwrap();
        assert!(retry_after > 0 && retry_after <= 60);
        // oldest entry was recorded 5s ago
        assert_eq!(retry_after, 55);
        assert_eq!(decision.windows[0].remaining, 0);
        assert_eq!(f.limiter.stats().snapshot().rejected, 1);
    }

    #[tokio::test]
    async fn test_window_slides_without_reset() {
        let f = fixture(RateLimitConfig::single_window(Window::Minute, 2));
        let who = ip_identity(2);

        assert!(f.limiter.check(&who).await.allowed);
        f.clock.advance_secs(30);
        assert!(f.limiter.check(&who).await.allowed);
        assert!(!f.limiter.check(&who).await.allowed);

        // first entry leaves the window
        f.clock.advance_secs(30);
        assert!(f.limiter.check(&who).await.allowed);
        assert!(!f.limiter.check(&who).await.allowed);
    }

    #[tokio::test]
    async fn test_retry_after_floor_is_one_second() {
        let f = fixture(RateLimitConfig::single_window(Window::Minute, 1));
        let who = ip_identity(3);
        assert!(f.limiter.check(&who).await.allowed);

        f.clock.advance_millis(59_999);
        let decision = f.limiter.check(&who).await;
        assert!(!decision.allowed);
        assert_eq!(decision.retry_after, Some(1));
    }

    #[tokio::test]
    async fn test_most_restrictive_window_wins() {
        let mut config = RateLimitConfig::default();
        config.tiers.insert(
            Tier::Trial,
            vec![
                WindowQuota::new(Window::Minute, 10),
                WindowQuota::new(Window::Hour, 3),
            ],
        );
        let f = fixture(config);
        let who = ip_identity(4);

        for _ in 0..3 {
            assert!(f.limiter.check(&who).await.allowed);
            f.clock.advance_secs(1);
        }
        let decision = f.limiter.check(&who).await;
        assert!(!decision.allowed);
        let minute = decision.windows[0];
        let hour = decision.windows[1];
        assert_eq!(minute.retry_after, None);
        assert_eq!(hour.retry_after, Some(3_600 - 3));
        assert_eq!(decision.retry_after, Some(3_597));
    }

    #[tokio::test]
    async fn test_rejection_consumes_no_quota() {
        let mut config = RateLimitConfig::default();
        config.tiers.insert(
            Tier::Trial,
            vec![
                WindowQuota::new(Window::Minute, 2),
                WindowQuota::new(Window::Hour, 100),
            ],
        );
        let f = fixture(config);
        let who = ip_identity(5);

        for _ in 0..2 {
            assert!(f.limiter.check(&who).await.allowed);
        }
        for _ in 0..10 {
            assert!(!f.limiter.check(&who).await.allowed);
        }

        let id = identifier::resolve(&who);
        let hour_key = f.limiter.window_key(&id, Window::Hour);
        assert_eq!(f.store.zcard(&hour_key).await.unwrap(), 2);

        f.clock.advance_secs(61);
        let decision = f.limiter.check(&who).await;
        assert!(decision.allowed);
        assert_eq!(decision.windows[1].remaining, 97);
    }

    #[tokio::test]
    async fn test_store_outage_fails_open() {
        let f = fixture(RateLimitConfig::single_window(Window::Minute, 1));
        let who = ip_identity(6);
        f.store.set_available(false);

        for _ in 0..5 {
            let decision = f.limiter.check(&who).await;
            assert!(decision.allowed);
            assert!(decision.degraded);
        }
        assert_eq!(f.limiter.stats().snapshot().fail_open, 5);
    }

    #[tokio::test]
    async fn test_identifiers_are_isolated() {
        let f = fixture(RateLimitConfig::single_window(Window::Minute, 1));
        assert!(f.limiter.check(&ip_identity(7)).await.allowed);
        assert!(f.limiter.check(&ip_identity(8)).await.allowed);

        let user = ip_identity(7).with_user(AuthenticatedUser {
            id: UserId(1),
            tier: None,
        });
        let decision = f.limiter.check(&user).await;
        assert!(decision.allowed);
        assert_eq!(decision.tier, Tier::Starter);
        assert_eq!(decision.identifier_kind, IdentifierKind::User);
    }

    #[tokio::test]
    async fn test_whitelist_and_disable_bypass() {
        let mut config = RateLimitConfig::single_window(Window::Minute, 1);
        config.whitelist = vec![IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9))];
        let f = fixture(config);
        for _ in 0..3 {
            assert!(f.limiter.check(&ip_identity(9)).await.allowed);
        }

        let mut config = RateLimitConfig::single_window(Window::Minute, 1);
        config.enabled = false;
        let f = fixture(config);
        for _ in 0..3 {
            assert!(f.limiter.check(&ip_identity(1)).await.allowed);
        }
        assert_eq!(f.limiter.stats().snapshot().bypassed, 3);
        assert_eq!(f.store.operations(), 0);
    }

    #[tokio::test]
    async fn test_reset_at_tracks_oldest_entry() {
        let f = fixture(RateLimitConfig::single_window(Window::Minute, 10));
        let who = ip_identity(10);
        f.limiter.check(&who).await;
        f.clock.advance_secs(20);
        let decision = f.limiter.check(&who).await;
        assert_eq!(decision.windows[0].reset_at, START_MS / 1_000 + 60);
    }
}
