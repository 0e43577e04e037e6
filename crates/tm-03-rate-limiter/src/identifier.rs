//! Client identification and tier selection.
//!
//! Precedence: API key (hashed), then authenticated user, then source IP.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::UserId;
use std::net::IpAddr;

use crate::config::Tier;

/// A user authenticated upstream. Inserted as a request extension by the
/// authentication layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub tier: Option<Tier>,
}

/// Attributes an upstream check attached to the presented API key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApiKeyAttributes {
    pub tier: Option<Tier>,
}

/// Everything known about the caller of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestIdentity {
    pub api_key: Option<String>,
    pub api_key_attributes: ApiKeyAttributes,
    pub user: Option<AuthenticatedUser>,
    pub ip: IpAddr,
}

impl RequestIdentity {
    #[must_use]
    pub fn from_ip(ip: IpAddr) -> Self {
        Self {
            api_key: None,
            api_key_attributes: ApiKeyAttributes::default(),
            user: None,
            ip,
        }
    }

    #[must_use]
    pub fn with_user(mut self, user: AuthenticatedUser) -> Self {
        self.user = Some(user);
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>, tier: Option<Tier>) -> Self {
        self.api_key = Some(key.into());
        self.api_key_attributes = ApiKeyAttributes { tier };
        self
    }
}

/// Which identifier class won.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierKind {
    ApiKey,
    User,
    Ip,
}

impl IdentifierKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ApiKey => "api_key",
            Self::User => "user",
            Self::Ip => "ip",
        }
    }
}

/// Resolved identifier and its quota tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentifier {
    pub kind: IdentifierKind,
    /// Hash for API keys, decimal id for users, address for IPs.
    pub value: String,
    pub tier: Tier,
}

/// Hex SHA-256 of an API key. Raw keys never reach the store or the logs.
#[must_use]
pub fn hash_api_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Pick the identifier and tier for a request.
#[must_use]
pub fn resolve(identity: &RequestIdentity) -> ClientIdentifier {
    if let Some(key) = identity.api_key.as_deref().filter(|k| !k.is_empty()) {
        return ClientIdentifier {
            kind: IdentifierKind::ApiKey,
            value: hash_api_key(key),
            tier: identity
                .api_key_attributes
                .tier
                .unwrap_or(Tier::Professional),
        };
    }
    if let Some(user) = identity.user {
        return ClientIdentifier {
            kind: IdentifierKind::User,
            value: user.id.get().to_string(),
            tier: user.tier.unwrap_or(Tier::Starter),
        };
    }
    ClientIdentifier {
        kind: IdentifierKind::Ip,
        value: identity.ip.to_string(),
        tier: Tier::Trial,
    }
}
