//! Standings engine configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::domain::RankingPolicy;

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StandingsConfigError {
    #[error("ranking needs at least one criterion")]
    EmptyRanking,

    #[error("ranking criterion {0} listed twice")]
    RepeatedCriterion(String),

    #[error("statistics_ttl must be positive")]
    ZeroStatisticsTtl,
}

/// Standings engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StandingsConfig {
    /// Lifetime of cached statistics.
    #[serde(with = "shared_types::duration")]
    pub statistics_ttl: Duration,

    /// Ranking criteria, best first.
    pub ranking: RankingPolicy,

    /// Publish `standings.updated` after every committed change.
    pub announce_updates: bool,
}

impl Default for StandingsConfig {
    fn default() -> Self {
        Self {
            statistics_ttl: Duration::from_secs(3600),
            ranking: RankingPolicy::default(),
            announce_updates: true,
        }
    }
}

impl StandingsConfig {
    /// # Errors
    ///
    /// Rejects an empty or repeating ranking and a zero TTL.
    pub fn validate(&self) -> Result<(), StandingsConfigError> {
        let criteria = self.ranking.criteria();
        if criteria.is_empty() {
            return Err(StandingsConfigError::EmptyRanking);
        }
        let mut seen = HashSet::new();
        for criterion in criteria {
            if !seen.insert(criterion) {
                return Err(StandingsConfigError::RepeatedCriterion(format!(
                    "{criterion:?}"
                )));
            }
        }
        if self.statistics_ttl.is_zero() {
            return Err(StandingsConfigError::ZeroStatisticsTtl);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RankCriterion;

    #[test]
    fn test_default_is_valid() {
        assert!(StandingsConfig::default().validate().is_ok());
    }

    #[test]
    fn test_parse_from_json() {
        let config: StandingsConfig = serde_json::from_str(
            r#"{"statistics_ttl": "10m", "ranking": ["points", "wins"]}"#,
        )
        .unwrap();
        assert_eq!(config.statistics_ttl, Duration::from_secs(600));
        assert_eq!(
            config.ranking.criteria(),
            &[RankCriterion::Points, RankCriterion::Wins]
        );
        assert!(config.announce_updates);
    }

    #[test]
    fn test_repeated_criterion_rejected() {
        let config = StandingsConfig {
            ranking: RankingPolicy::new(vec![RankCriterion::Points, RankCriterion::Points]),
            ..StandingsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(StandingsConfigError::RepeatedCriterion(_))
        ));
    }

    #[test]
    fn test_empty_ranking_rejected() {
        let config = StandingsConfig {
            ranking: RankingPolicy::new(vec![]),
            ..StandingsConfig::default()
        };
        assert_eq!(config.validate(), Err(StandingsConfigError::EmptyRanking));
    }
}
