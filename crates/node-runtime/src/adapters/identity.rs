//! # Identity Provider
//!
//! "Validate token → attributes" port consumed by the authentication
//! middleware, and the static token and key table shipped with the node.

use async_trait::async_trait;
use shared_types::UserId;
use std::collections::HashMap;
use thiserror::Error;
use tm_03_rate_limiter::{hash_api_key, ApiKeyAttributes, AuthenticatedUser};
use tracing::debug;

use crate::container::config::AuthConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Resolves a bearer token to the user it belongs to.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` for a well-formed but unknown token.
    async fn validate(&self, token: &str) -> Result<Option<AuthenticatedUser>, IdentityError>;

    /// Attributes of an issued `X-Api-Key`; `Ok(None)` if it was never issued.
    async fn validate_api_key(
        &self,
        key: &str,
    ) -> Result<Option<ApiKeyAttributes>, IdentityError>;
}

/// Token table loaded from configuration. Tokens and keys are held hashed.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    grants: HashMap<String, AuthenticatedUser>,
    api_keys: HashMap<String, ApiKeyAttributes>,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn from_config(config: &AuthConfig) -> Self {
        let grants = config
            .tokens
            .iter()
            .map(|grant| {
                (
                    hash_api_key(&grant.token),
                    AuthenticatedUser {
                        id: grant.user_id,
                        tier: grant.tier,
                    },
                )
            })
            .collect();
        let api_keys = config
            .api_keys
            .iter()
            .map(|grant| {
                (
                    hash_api_key(grant.key.trim()),
                    ApiKeyAttributes { tier: grant.tier },
                )
            })
            .collect();
        Self { grants, api_keys }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    /// Users known to this table.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.grants.values().map(|user| user.id)
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn validate(&self, token: &str) -> Result<Option<AuthenticatedUser>, IdentityError> {
        let user = self.grants.get(&hash_api_key(token)).copied();
        if user.is_none() {
            debug!("unknown bearer token");
        }
        Ok(user)
    }

    async fn validate_api_key(
        &self,
        key: &str,
    ) -> Result<Option<ApiKeyAttributes>, IdentityError> {
        Ok(self.api_keys.get(&hash_api_key(key)).copied())
    }
}
