//! # Node Configuration
//!
//! Unified configuration for every subsystem and the HTTP ingress.
//!
//! ## Sources
//!
//! 1. Built-in defaults (every section is `#[serde(default)]`).
//! 2. A JSON file named by `TM_CONFIG`, if set.
//! 3. Environment overrides:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `TM_HTTP_HOST` | `http.host` |
//! | `TM_HTTP_PORT` | `http.port` |
//! | `TM_SERVICE_NAME` | `bus.service_name` |
//!
//! The merged result is validated before anything is constructed.

use serde::{Deserialize, Serialize};
use shared_bus::{BusConfig, BusConfigError};
use shared_types::UserId;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tm_01_standings::{StandingsConfig, StandingsConfigError};
use tm_02_cache_invalidation::{CacheConfig, CacheConfigError};
use tm_03_rate_limiter::{RateLimitConfig, RateLimitConfigError, Tier};

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "TM_CONFIG";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {variable}")]
    InvalidOverride {
        variable: &'static str,
        value: String,
    },

    #[error("http.request_timeout must be positive")]
    ZeroRequestTimeout,

    #[error("auth token {index} is empty")]
    EmptyToken { index: usize },

    #[error("auth token {index} repeats an earlier token")]
    DuplicateToken { index: usize },

    #[error("api key {index} is empty")]
    EmptyApiKey { index: usize },

    #[error("api key {index} repeats an earlier key")]
    DuplicateApiKey { index: usize },

    #[error("bus: {0}")]
    Bus(#[from] BusConfigError),

    #[error("standings: {0}")]
    Standings(#[from] StandingsConfigError),

    #[error("cache: {0}")]
    Cache(#[from] CacheConfigError),

    #[error("rate_limit: {0}")]
    RateLimit(#[from] RateLimitConfigError),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    pub http: HttpConfig,
    pub bus: BusConfig,
    pub standings: StandingsConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
}

/// HTTP ingress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Requests running longer are answered with 408.
    #[serde(with = "shared_types::duration")]
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Bearer tokens and API keys accepted by the static identity provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub tokens: Vec<TokenGrant>,
    pub api_keys: Vec<ApiKeyGrant>,
}

/// One accepted token and the identity it stands for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenGrant {
    pub token: String,
    pub user_id: UserId,
    #[serde(default)]
    pub tier: Option<Tier>,
}

/// One issued `X-Api-Key`. Keys without a tier get the limiter's API key
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyGrant {
    pub key: String,
    #[serde(default)]
    pub tier: Option<Tier>,
}

impl NodeConfig {
    /// Defaults, then `TM_CONFIG`, then environment overrides, validated.
    ///
    /// # Errors
    ///
    /// Unreadable or malformed file, bad override, or failed validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file. Missing sections take defaults.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Read`] or [`ConfigError::Parse`].
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply overrides from `lookup` (the process environment in production).
    ///
    /// # Errors
    ///
    /// [`ConfigError::InvalidOverride`] if a host or port does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("TM_HTTP_HOST") {
            self.http.host = value.parse().map_err(|_| ConfigError::InvalidOverride {
                variable: "TM_HTTP_HOST",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("TM_HTTP_PORT") {
            self.http.port = value.parse().map_err(|_| ConfigError::InvalidOverride {
                variable: "TM_HTTP_PORT",
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("TM_SERVICE_NAME") {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidOverride {
                    variable: "TM_SERVICE_NAME",
                    value,
                });
            }
            self.bus.service_name = value;
        }
        Ok(())
    }

    /// Check every section.
    ///
    /// # Errors
    ///
    /// The first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.request_timeout.is_zero() {
            return Err(ConfigError::ZeroRequestTimeout);
        }
        self.bus.validate()?;
        self.standings.validate()?;
        self.cache.validate()?;
        self.rate_limit.validate()?;

        let mut seen = std::collections::HashSet::new();
        for (index, grant) in self.auth.tokens.iter().enumerate() {
            if grant.token.trim().is_empty() {
                return Err(ConfigError::EmptyToken { index });
            }
            if !seen.insert(grant.token.as_str()) {
                return Err(ConfigError::DuplicateToken { index });
            }
        }

        let mut seen = std::collections::HashSet::new();
        for (index, grant) in self.auth.api_keys.iter().enumerate() {
            if grant.key.trim().is_empty() {
                return Err(ConfigError::EmptyApiKey { index });
            }
            if !seen.insert(grant.key.trim()) {
                return Err(ConfigError::DuplicateApiKey { index });
            }
        }
        Ok(())
    }
}
