//! Signed JWT access tokens.
//!
//! Tokens follow the RFC 9068 claim layout:
//!
//! ```json
//! {
//!   "iss": "https://as.example",
//!   "sub": "alice",
//!   "aud": ["https://api.example"],
//!   "exp": 1700003600,
//!   "iat": 1700000000,
//!   "jti": "4c1f0b1e-...",
//!   "scope": "read write",
//!   "client_id": "svc"
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::{Deserialize, Serialize};

use super::issuer::AccessTokenIssuer;
use crate::GrantResult;
use crate::clock::{Clock, SystemClock, expiry_after};
use crate::error::GrantError;
use crate::oauth::{AccessRequest, AccessResponse};
use crate::types::TokenType;

/// Access token type written to responses.
pub const BEARER_TOKEN_TYPE: &str = "bearer";

/// Claims of an issued access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Issuer (authorization server URL).
    pub iss: String,

    /// Subject of the verified assertion.
    pub sub: String,

    /// Granted audiences.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aud: Vec<String>,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at (Unix timestamp).
    pub iat: i64,

    /// Unique token identifier.
    pub jti: String,

    /// Space-separated granted scopes.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,

    /// OAuth client ID.
    pub client_id: String,
}

/// Issues access tokens as signed JWTs.
pub struct JwtAccessTokenIssuer {
    issuer: String,
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    kid: Option<String>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for JwtAccessTokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAccessTokenIssuer")
            .field("issuer", &self.issuer)
            .field("algorithm", &self.algorithm)
            .field("kid", &self.kid)
            .finish_non_exhaustive()
    }
}

impl JwtAccessTokenIssuer {
    /// Creates an issuer signing with `encoding_key` using `algorithm`.
    #[must_use]
    pub fn new(issuer: impl Into<String>, algorithm: Algorithm, encoding_key: EncodingKey) -> Self {
        Self {
            issuer: issuer.into(),
            algorithm,
            encoding_key,
            kid: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Creates an issuer signing with an HS256 shared secret.
    #[must_use]
    pub fn hmac(issuer: impl Into<String>, secret: &[u8]) -> Self {
        Self::new(issuer, Algorithm::HS256, EncodingKey::from_secret(secret))
    }

    /// Sets the `kid` header of issued tokens.
    #[must_use]
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    /// Replaces the time source.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The `iss` claim of issued tokens.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Signing algorithm.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }
}

#[async_trait]
impl AccessTokenIssuer for JwtAccessTokenIssuer {
    async fn issue_access_token(
        &self,
        lifespan: time::Duration,
        request: &AccessRequest,
        response: &mut AccessResponse,
    ) -> GrantResult<()> {
        let now = self.clock.now();
        // The session expiry set during validation wins over the lifespan.
        let expires_at = match request.session().expires_at(TokenType::AccessToken) {
            Some(at) => at,
            None => expiry_after(now, lifespan).ok_or_else(|| {
                GrantError::server_error_from(format!(
                    "access token lifespan {lifespan} does not yield a representable expiry"
                ))
            })?,
        };

        let claims = AccessTokenClaims {
            iss: self.issuer.clone(),
            sub: request.session().subject().to_string(),
            aud: request.granted_audience().to_vec(),
            exp: expires_at.unix_timestamp(),
            iat: now.unix_timestamp(),
            jti: uuid::Uuid::new_v4().to_string(),
            scope: request.granted_scopes().join(" "),
            client_id: request.client().client_id.clone(),
        };

        let mut header = Header::new(self.algorithm);
        header.kid = self.kid.clone();
        let token = encode(&header, &claims, &self.encoding_key)
            .map_err(|e| GrantError::server_error_from(format!("Failed to encode access token: {e}")))?;

        let expires_in = (expires_at - now).whole_seconds().max(0);

        response.access_token = token;
        response.token_type = BEARER_TOKEN_TYPE.to_string();
        response.expires_in = u64::try_from(expires_in).ok();
        response.scope = claims.scope;

        tracing::debug!(
            request_id = %request.id(),
            subject = %claims.sub,
            jti = %claims.jti,
            expires_in,
            "Issued access token"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{DecodingKey, Validation, decode};
    use time::OffsetDateTime;

    use crate::clock::FixedClock;
    use crate::oauth::{JwtBearerSession, Session, SubjectSession};
    use crate::types::Client;

    const SECRET: &[u8] = b"access-token-secret-0123456789ab";
    const NOW: i64 = 1_700_000_000;

    fn issuer() -> JwtAccessTokenIssuer {
        JwtAccessTokenIssuer::hmac("https://as.example", SECRET)
            .with_kid("at-1")
            .with_clock(Arc::new(FixedClock::at_unix(NOW)))
    }

    fn request() -> AccessRequest {
        let mut session = JwtBearerSession::new();
        session.set_subject("alice");
        let mut request = AccessRequest::new(Arc::new(Client::new("svc")), Box::new(session));
        request.grant_scope("read");
        request.grant_scope("write");
        request.grant_audience("https://api.example");
        request
    }

    fn decode_claims(token: &str) -> AccessTokenClaims {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        decode::<AccessTokenClaims>(token, &DecodingKey::from_secret(SECRET), &validation)
            .unwrap()
            .claims
    }

    #[tokio::test]
    async fn test_issue_uses_lifespan_without_session_expiry() {
        let mut response = AccessResponse::new();
        issuer()
            .issue_access_token(time::Duration::hours(1), &request(), &mut response)
            .await
            .unwrap();

        assert_eq!(response.token_type, "bearer");
        assert_eq!(response.expires_in, Some(3600));
        assert_eq!(response.scope, "read write");

        let header = jsonwebtoken::decode_header(&response.access_token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("at-1"));

        let claims = decode_claims(&response.access_token);
        assert_eq!(claims.iss, "https://as.example");
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.aud, ["https://api.example"]);
        assert_eq!(claims.client_id, "svc");
        assert_eq!(claims.iat, NOW);
        assert_eq!(claims.exp, NOW + 3600);
        assert!(uuid::Uuid::parse_str(&claims.jti).is_ok());
    }

    #[tokio::test]
    async fn test_issue_prefers_session_expiry() {
        let mut request = request();
        request.session_mut().set_expires_at(
            TokenType::AccessToken,
            OffsetDateTime::from_unix_timestamp(NOW + 600).unwrap(),
        );

        let mut response = AccessResponse::new();
        issuer()
            .issue_access_token(time::Duration::hours(1), &request, &mut response)
            .await
            .unwrap();

        assert_eq!(response.expires_in, Some(600));
        assert_eq!(decode_claims(&response.access_token).exp, NOW + 600);
    }

    #[tokio::test]
    async fn test_issue_rejects_unrepresentable_expiry() {
        let mut response = AccessResponse::new();
        let err = issuer()
            .issue_access_token(time::Duration::MAX, &request(), &mut response)
            .await
            .unwrap_err();
        assert!(err.is_server_error());
        assert!(response.access_token.is_empty());
    }

    #[tokio::test]
    async fn test_unique_token_ids() {
        let request = request();
        let mut first = AccessResponse::new();
        let mut second = AccessResponse::new();
        let issuer = issuer();
        issuer
            .issue_access_token(time::Duration::minutes(5), &request, &mut first)
            .await
            .unwrap();
        issuer
            .issue_access_token(time::Duration::minutes(5), &request, &mut second)
            .await
            .unwrap();
        assert_ne!(
            decode_claims(&first.access_token).jti,
            decode_claims(&second.access_token).jti
        );
    }
}
