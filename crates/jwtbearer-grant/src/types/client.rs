//! OAuth 2.0 client as seen by the token endpoint.
//!
//! Long-term client registration lives elsewhere; the grant only needs the
//! grant types a client may use and any token lifespans it overrides.

use std::time::Duration as StdDuration;

use serde::{Deserialize, Serialize};
use time::Duration;

use super::grant_type::{GrantType, TokenType};

/// A per-client token lifespan for one (grant type, token type) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifespanOverride {
    /// Grant type the override applies to.
    pub grant_type: GrantType,

    /// Token type the override applies to.
    pub token_type: TokenType,

    /// Lifespan to use instead of the server default.
    #[serde(with = "humantime_serde")]
    pub lifespan: StdDuration,
}

/// OAuth 2.0 client attached to a token request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    /// Unique client identifier.
    pub client_id: String,

    /// OAuth 2.0 grant types this client is allowed to use.
    #[serde(default)]
    pub grant_types: Vec<GrantType>,

    /// Token lifespans overriding the server defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lifespans: Vec<LifespanOverride>,
}

impl Client {
    /// Creates a client with no grant types and no lifespan overrides.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            grant_types: Vec::new(),
            lifespans: Vec::new(),
        }
    }

    /// Allows the client to use `grant_type`.
    #[must_use]
    pub fn with_grant_type(mut self, grant_type: GrantType) -> Self {
        if !self.grant_types.contains(&grant_type) {
            self.grant_types.push(grant_type);
        }
        self
    }

    /// Overrides the lifespan of `token_type` tokens issued through `grant_type`.
    #[must_use]
    pub fn with_lifespan(
        mut self,
        grant_type: GrantType,
        token_type: TokenType,
        lifespan: StdDuration,
    ) -> Self {
        self.lifespans
            .retain(|o| !(o.grant_type == grant_type && o.token_type == token_type));
        self.lifespans.push(LifespanOverride {
            grant_type,
            token_type,
            lifespan,
        });
        self
    }

    /// Checks if the given grant type is allowed for this client.
    #[must_use]
    pub fn is_grant_type_allowed(&self, grant_type: GrantType) -> bool {
        self.grant_types.contains(&grant_type)
    }

    /// Returns the lifespan of a `token_type` token issued through
    /// `grant_type`: the client's override if it has one, `fallback`
    /// otherwise.
    #[must_use]
    pub fn effective_lifespan(
        &self,
        grant_type: GrantType,
        token_type: TokenType,
        fallback: Duration,
    ) -> Duration {
        self.lifespans
            .iter()
            .find(|o| o.grant_type == grant_type && o.token_type == token_type)
            .and_then(|o| Duration::try_from(o.lifespan).ok())
            .unwrap_or(fallback)
    }
}
