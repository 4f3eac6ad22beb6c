//! # jwtbearer-grant
//!
//! OAuth 2.0 JWT bearer assertion grant (RFC 7523) for the token endpoint.
//!
//! A client presents a signed JWT in place of an authorization grant. The
//! handler verifies the signature against a key registered for the
//! assertion's issuer and subject, validates its claims, enforces single
//! use of its `jti`, authorizes the requested scopes, and binds the
//! resulting access token to the assertion's subject.
//!
//! ## Modules
//!
//! - [`config`] - Grant configuration
//! - [`error`] - Token endpoint errors
//! - [`grant`] - Key resolution, claim validation, replay protection, scopes, and the handler
//! - [`jwt`] - Assertion parsing and verification
//! - [`oauth`] - Access request/response, sessions, and the token endpoint
//! - [`storage`] - Key and JWT ID storage traits
//! - [`strategy`] - Scope and audience matching strategies
//! - [`token`] - Access token issuance
//! - [`clock`] - Injectable time source
//! - [`types`] - Clients, grant types, token types

pub mod clock;
pub mod config;
pub mod error;
pub mod grant;
pub mod jwt;
pub mod oauth;
pub mod storage;
pub mod strategy;
pub mod token;
pub mod types;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, JwtBearerConfig};
pub use error::{ErrorCategory, GrantError};
pub use grant::JwtBearerGrantHandler;
pub use oauth::{
    AccessRequest, AccessResponse, DefaultSession, JwtBearerSession, Session, SubjectSession,
    TokenEndpoint, TokenEndpointHandler,
};
pub use storage::{JtiStorage, PublicKeyStorage};
pub use token::{AccessTokenIssuer, JwtAccessTokenIssuer};
pub use types::{Client, GrantType, JWT_BEARER_GRANT_TYPE, TokenType};

/// Type alias for token endpoint results.
pub type GrantResult<T> = Result<T, GrantError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use jwtbearer_grant::prelude::*;
/// ```
pub mod prelude {
    pub use crate::GrantResult;
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::{ConfigError, JwtBearerConfig};
    pub use crate::error::{ErrorCategory, GrantError};
    pub use crate::grant::JwtBearerGrantHandler;
    pub use crate::jwt::{Assertion, AssertionClaims, JwtError};
    pub use crate::oauth::{
        AccessRequest, AccessResponse, DefaultSession, JwtBearerSession, Session,
        SubjectSession, TokenEndpoint, TokenEndpointHandler,
    };
    pub use crate::storage::{JtiStorage, PublicKeyStorage};
    pub use crate::strategy::{
        AudienceStrategy, ExactAudienceStrategy, ExactScopeStrategy, HierarchicScopeStrategy,
        ScopeStrategy, UrlAudienceStrategy, WildcardScopeStrategy,
    };
    pub use crate::token::{AccessTokenIssuer, JwtAccessTokenIssuer};
    pub use crate::types::{Client, GrantType, JWT_BEARER_GRANT_TYPE, TokenType};
}
