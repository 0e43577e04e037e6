//! Rate limiter configuration: tiers, windows and quotas.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::time::Duration;
use thiserror::Error;

/// Most windows a tier may enforce at once.
pub const MAX_WINDOWS_PER_TIER: usize = 3;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateLimitConfigError {
    #[error("tier {0} has no quota")]
    MissingTier(Tier),

    #[error("tier {tier} has {count} windows (1..=3 allowed)")]
    WindowCount { tier: Tier, count: usize },

    #[error("tier {tier} lists window {window} twice")]
    RepeatedWindow { tier: Tier, window: Window },

    #[error("tier {tier} has a zero limit for window {window}")]
    ZeroLimit { tier: Tier, window: Window },

    #[error("reject delay min {min_ms}ms exceeds max {max_ms}ms")]
    InvertedDelay { min_ms: u64, max_ms: u64 },

    #[error("call_timeout must be positive")]
    ZeroTimeout,
}

/// Named quota profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Trial,
    Starter,
    Professional,
    Business,
}

impl Tier {
    pub const ALL: [Self; 4] = [Self::Trial, Self::Starter, Self::Professional, Self::Business];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trial => "trial",
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Business => "business",
        }
    }

    /// Case-insensitive lookup.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sliding window length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Window {
    Minute,
    Hour,
    Day,
}

impl Window {
    #[must_use]
    pub fn seconds(self) -> u64 {
        match self {
            Self::Minute => 60,
            Self::Hour => 3_600,
            Self::Day => 86_400,
        }
    }

    #[must_use]
    pub fn millis(self) -> u64 {
        self.seconds() * 1_000
    }

    /// Header suffix: `Minute`, `Hour`, `Day`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Minute => "Minute",
            Self::Hour => "Hour",
            Self::Day => "Day",
        }
    }

    fn key_part(self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_part())
    }
}

/// Limit for one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowQuota {
    pub window: Window,
    pub limit: u64,
}

impl WindowQuota {
    #[must_use]
    pub fn new(window: Window, limit: u64) -> Self {
        Self { window, limit }
    }
}

/// Uniform random delay applied before a rejection is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectDelay {
    pub min_ms: u64,
    pub max_ms: u64,
}

/// Rate limiter settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Global switch; disabled admits everything.
    pub enabled: bool,

    /// Quotas per tier.
    pub tiers: BTreeMap<Tier, Vec<WindowQuota>>,

    /// Source addresses that are never limited.
    pub whitelist: Vec<IpAddr>,

    /// Prefix of every store key.
    pub key_prefix: String,

    /// Extra lifetime of a window key beyond the window itself.
    #[serde(with = "shared_types::duration")]
    pub ttl_slack: Duration,

    /// Deadline for each store call.
    #[serde(with = "shared_types::duration")]
    pub call_timeout: Duration,

    /// Optional jittered delay before answering 429.
    pub reject_delay: Option<RejectDelay>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        use Window::{Day, Hour, Minute};
        let quota = |minute, hour, day| {
            vec![
                WindowQuota::new(Minute, minute),
                WindowQuota::new(Hour, hour),
                WindowQuota::new(Day, day),
            ]
        };

        let mut tiers = BTreeMap::new();
        tiers.insert(Tier::Trial, quota(10, 100, 500));
        tiers.insert(Tier::Starter, quota(60, 1_000, 10_000));
        tiers.insert(Tier::Professional, quota(300, 10_000, 100_000));
        tiers.insert(Tier::Business, quota(1_000, 50_000, 1_000_000));

        Self {
            enabled: true,
            tiers,
            whitelist: Vec::new(),
            key_prefix: "ratelimit".to_string(),
            ttl_slack: Duration::from_secs(1),
            call_timeout: shared_store::DEFAULT_CALL_TIMEOUT,
            reject_delay: None,
        }
    }
}

impl RateLimitConfig {
    /// Same tiers, one window with `limit` for each. Handy in tests.
    #[must_use]
    pub fn single_window(window: Window, limit: u64) -> Self {
        let mut config = Self::default();
        for quotas in config.tiers.values_mut() {
            *quotas = vec![WindowQuota::new(window, limit)];
        }
        config
    }

    /// Quotas of `tier` (empty if unconfigured, which `validate` rejects).
    #[must_use]
    pub fn quotas(&self, tier: Tier) -> &[WindowQuota] {
        self.tiers.get(&tier).map_or(&[], Vec::as_slice)
    }

    /// # Errors
    ///
    /// Every tier needs 1 to 3 distinct windows with positive limits.
    pub fn validate(&self) -> Result<(), RateLimitConfigError> {
        for tier in Tier::ALL {
            let quotas = self
                .tiers
                .get(&tier)
                .ok_or(RateLimitConfigError::MissingTier(tier))?;
            if quotas.is_empty() || quotas.len() > MAX_WINDOWS_PER_TIER {
                return Err(RateLimitConfigError::WindowCount {
                    tier,
                    count: quotas.len(),
                });
            }
            let mut seen = HashSet::new();
            for quota in quotas {
                if !seen.insert(quota.window) {
                    return Err(RateLimitConfigError::RepeatedWindow {
                        tier,
                        window: quota.window,
                    });
                }
                if quota.limit == 0 {
                    return Err(RateLimitConfigError::ZeroLimit {
                        tier,
                        window: quota.window,
                    });
                }
            }
        }
        if let Some(delay) = self.reject_delay {
            if delay.min_ms > delay.max_ms {
                return Err(RateLimitConfigError::InvertedDelay {
                    min_ms: delay.min_ms,
                    max_ms: delay.max_ms,
                });
            }
        }
        if self.call_timeout.is_zero() {
            return Err(RateLimitConfigError::ZeroTimeout);
        }
        Ok(())
    }
}
