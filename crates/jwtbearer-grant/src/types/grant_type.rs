//! OAuth 2.0 grant and token types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Grant type identifier of the JWT bearer assertion grant (RFC 7523 §2.1).
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

// =============================================================================
// Grant Type
// =============================================================================

/// OAuth 2.0 grant types.
///
/// Defines the authorization flows a client is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantType {
    /// Authorization Code flow.
    #[serde(rename = "authorization_code")]
    AuthorizationCode,
    /// Client Credentials flow.
    #[serde(rename = "client_credentials")]
    ClientCredentials,
    /// Refresh Token flow.
    #[serde(rename = "refresh_token")]
    RefreshToken,
    /// JWT bearer assertion grant (RFC 7523).
    #[serde(rename = "urn:ietf:params:oauth:grant-type:jwt-bearer")]
    JwtBearer,
}

impl GrantType {
    /// Returns the OAuth 2.0 grant_type parameter value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AuthorizationCode => "authorization_code",
            Self::ClientCredentials => "client_credentials",
            Self::RefreshToken => "refresh_token",
            Self::JwtBearer => JWT_BEARER_GRANT_TYPE,
        }
    }
}

impl fmt::Display for GrantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for GrantType {
    type Err = UnknownGrantType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "authorization_code" => Ok(Self::AuthorizationCode),
            "client_credentials" => Ok(Self::ClientCredentials),
            "refresh_token" => Ok(Self::RefreshToken),
            JWT_BEARER_GRANT_TYPE => Ok(Self::JwtBearer),
            other => Err(UnknownGrantType(other.to_string())),
        }
    }
}

/// Returned when parsing an unrecognized grant type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown grant type: {0}")]
pub struct UnknownGrantType(pub String);

// =============================================================================
// Token Type
// =============================================================================

/// Kinds of tokens a session can carry an expiry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// OAuth 2.0 access token.
    AccessToken,
    /// OAuth 2.0 refresh token.
    RefreshToken,
    /// Authorization code.
    AuthorizationCode,
    /// OpenID Connect ID token.
    IdToken,
}

impl TokenType {
    /// Returns the token type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessToken => "access_token",
            Self::RefreshToken => "refresh_token",
            Self::AuthorizationCode => "authorization_code",
            Self::IdToken => "id_token",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
