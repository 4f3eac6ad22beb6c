//! JWT bearer grant handler (RFC 7523 §2.1).
//!
//! Validation runs every check before the single persistent side effect,
//! recording the assertion's `jti`. A request that fails any check leaves
//! no trace: no grants, no session changes, no replay record.

use std::sync::Arc;

use async_trait::async_trait;

use super::claims::ClaimValidator;
use super::key_resolver::KeyResolver;
use super::replay::ReplayGuard;
use super::scope::ScopeAuthorizer;
use crate::GrantResult;
use crate::clock::{Clock, SystemClock, expiry_after};
use crate::config::JwtBearerConfig;
use crate::error::GrantError;
use crate::jwt::Assertion;
use crate::oauth::{AccessRequest, AccessResponse, TokenEndpointHandler};
use crate::storage::{JtiStorage, PublicKeyStorage};
use crate::strategy::{AudienceStrategy, ScopeStrategy, UrlAudienceStrategy};
use crate::token::AccessTokenIssuer;
use crate::types::{GrantType, JWT_BEARER_GRANT_TYPE, TokenType};

/// Token endpoint handler for `urn:ietf:params:oauth:grant-type:jwt-bearer`.
///
/// # Example
///
/// ```ignore
/// let handler = JwtBearerGrantHandler::new(config, keys, jtis, issuer)
///     .with_scope_strategy(Arc::new(ExactScopeStrategy));
/// let endpoint = TokenEndpoint::new().with_handler(Arc::new(handler));
/// let response = endpoint.exchange(&mut request).await?;
/// ```
#[derive(Clone)]
pub struct JwtBearerGrantHandler {
    config: Arc<JwtBearerConfig>,
    keys: Arc<dyn PublicKeyStorage>,
    key_resolver: KeyResolver,
    claim_validator: ClaimValidator,
    replay_guard: ReplayGuard,
    scope_authorizer: ScopeAuthorizer,
    audience_strategy: Arc<dyn AudienceStrategy>,
    token_issuer: Arc<dyn AccessTokenIssuer>,
    clock: Arc<dyn Clock>,
}

impl JwtBearerGrantHandler {
    /// Creates a handler with the hierarchic scope strategy, the URL
    /// audience strategy and the system clock.
    pub fn new(
        config: JwtBearerConfig,
        keys: Arc<dyn PublicKeyStorage>,
        jtis: Arc<dyn JtiStorage>,
        token_issuer: Arc<dyn AccessTokenIssuer>,
    ) -> Self {
        Self {
            claim_validator: ClaimValidator::new(&config),
            config: Arc::new(config),
            key_resolver: KeyResolver::new(keys.clone()),
            keys,
            replay_guard: ReplayGuard::new(jtis),
            scope_authorizer: ScopeAuthorizer::default(),
            audience_strategy: Arc::new(UrlAudienceStrategy),
            token_issuer,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replaces the scope matching strategy.
    #[must_use]
    pub fn with_scope_strategy(mut self, strategy: Arc<dyn ScopeStrategy>) -> Self {
        self.scope_authorizer = ScopeAuthorizer::new(strategy);
        self
    }

    /// Replaces the audience matching strategy.
    ///
    /// Audiences claimed by a verified assertion are granted as-is; the
    /// strategy is exposed for the enclosing framework through
    /// [`Self::audience_strategy`].
    #[must_use]
    pub fn with_audience_strategy(mut self, strategy: Arc<dyn AudienceStrategy>) -> Self {
        self.audience_strategy = strategy;
        self
    }

    /// Replaces the time source used for claim validation and expiry.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The handler configuration.
    #[must_use]
    pub fn config(&self) -> &JwtBearerConfig {
        &self.config
    }

    /// The configured audience matching strategy.
    #[must_use]
    pub fn audience_strategy(&self) -> &Arc<dyn AudienceStrategy> {
        &self.audience_strategy
    }

    /// Checks that the request is a JWT bearer request the client may make.
    ///
    /// # Errors
    ///
    /// Returns `UnknownRequest` for other grant types and
    /// `UnauthorizedClient` if client authentication is required and the
    /// client is not registered for this grant.
    pub fn check_request(&self, request: &AccessRequest) -> GrantResult<()> {
        if !self.can_handle_token_endpoint_request(request) {
            return Err(GrantError::UnknownRequest);
        }

        if !self.can_skip_client_auth(request)
            && !request.client().is_grant_type_allowed(GrantType::JwtBearer)
        {
            tracing::debug!(
                client_id = %request.client().client_id,
                "Client not registered for the JWT bearer grant"
            );
            return Err(GrantError::unauthorized_client(format!(
                "The OAuth 2.0 Client is not allowed to use authorization grant \"{JWT_BEARER_GRANT_TYPE}\"."
            )));
        }

        Ok(())
    }

    fn access_token_lifespan(&self, request: &AccessRequest) -> time::Duration {
        request.client().effective_lifespan(
            GrantType::JwtBearer,
            TokenType::AccessToken,
            self.config.access_token_span(),
        )
    }
}

#[async_trait]
impl TokenEndpointHandler for JwtBearerGrantHandler {
    fn can_handle_token_endpoint_request(&self, request: &AccessRequest) -> bool {
        request.has_exactly_one_grant_type(JWT_BEARER_GRANT_TYPE)
    }

    fn can_skip_client_auth(&self, _request: &AccessRequest) -> bool {
        self.config.skip_client_auth
    }

    async fn handle_token_endpoint_request(&self, request: &mut AccessRequest) -> GrantResult<()> {
        self.check_request(request)?;

        let raw = request.form_value("assertion").ok_or_else(|| {
            GrantError::invalid_request(format!(
                "The assertion request parameter must be set when using grant_type of '{JWT_BEARER_GRANT_TYPE}'."
            ))
        })?;

        let assertion = Assertion::parse(raw).map_err(|e| {
            tracing::debug!(error = %e, "Unparseable assertion");
            GrantError::invalid_grant(
                "Unable to parse the JSON Web Token passed in the \"assertion\" request parameter.",
            )
        })?;

        let unverified = assertion.unverified_claims();
        if unverified.issuer().is_empty() {
            return Err(GrantError::invalid_grant(
                "The JWT in \"assertion\" request parameter MUST contain an \"iss\" (issuer) claim.",
            ));
        }
        if unverified.subject().is_empty() {
            return Err(GrantError::invalid_grant(
                "The JWT in \"assertion\" request parameter MUST contain a \"sub\" (subject) claim.",
            ));
        }

        let verified = self
            .key_resolver
            .resolve(&assertion, unverified.issuer(), unverified.subject())
            .await?;
        let claims = verified.claims;

        self.claim_validator
            .validate(&claims, self.clock.now(), &self.replay_guard)
            .await?;

        let issuer = claims.issuer();
        let subject = claims.subject();

        let registered = self
            .keys
            .get_public_key_scopes(issuer, subject, &verified.key_id)
            .await
            .map_err(GrantError::server_error_from)?;
        self.scope_authorizer
            .authorize(&registered, request.requested_scopes(), issuer, subject)?;

        let lifespan = self.access_token_lifespan(request);
        let expires_at = expiry_after(self.clock.now(), lifespan).ok_or_else(|| {
            GrantError::server_error_from(format!(
                "access token lifespan {lifespan} does not yield a representable expiry"
            ))
        })?;

        // Must fail before the jti is recorded.
        if request.session_mut().as_subject_session().is_none() {
            let type_name = request.session().type_name();
            tracing::warn!(session_type = type_name, "Session cannot carry a subject");
            return Err(GrantError::server_error(format!(
                "Session must support setting a subject for the JWT bearer grant, but got type: {type_name}"
            )));
        }

        if let (Some(jti), Some(exp)) = (claims.jti.as_deref().filter(|j| !j.is_empty()), claims.exp) {
            self.replay_guard.mark_used(jti, exp).await?;
        }

        for scope in request.requested_scopes().to_vec() {
            request.grant_scope(&scope);
        }
        for audience in claims.aud.iter() {
            request.grant_audience(audience);
        }

        let session = request.session_mut();
        session.set_expires_at(TokenType::AccessToken, expires_at);
        if let Some(subject_session) = session.as_subject_session() {
            subject_session.set_subject(subject);
        }

        tracing::info!(
            request_id = %request.id(),
            issuer,
            subject,
            kid = %verified.key_id,
            jti = claims.jwt_id(),
            "Accepted JWT bearer assertion"
        );
        Ok(())
    }

    async fn populate_token_endpoint_response(
        &self,
        request: &AccessRequest,
        response: &mut AccessResponse,
    ) -> GrantResult<()> {
        self.check_request(request)?;

        let lifespan = self.access_token_lifespan(request);
        self.token_issuer
            .issue_access_token(lifespan, request, response)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use jsonwebtoken::jwk::{Jwk, JwkSet};
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use serde_json::{Value, json};
    use time::OffsetDateTime;

    use crate::clock::FixedClock;
    use crate::oauth::{DefaultSession, JwtBearerSession, Session};
    use crate::types::Client;

    const TOKEN_URL: &str = "https://as.example/token";
    const SECRET: &[u8] = b"handler-test-secret-0123456789ab";
    const NOW: i64 = 1_700_000_000;

    /// One key for ("iss", "alice", "kid1"); counts lookups. Scope lookups
    /// fail when `scopes` is `None`.
    struct OneKey {
        scopes: Option<Vec<String>>,
        lookups: AtomicUsize,
    }

    #[async_trait]
    impl PublicKeyStorage for OneKey {
        async fn get_public_key(
            &self,
            issuer: &str,
            subject: &str,
            key_id: &str,
        ) -> GrantResult<Option<Jwk>> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok((issuer == "iss" && subject == "alice" && key_id == "kid1").then(jwk))
        }

        async fn get_public_keys(&self, issuer: &str, subject: &str) -> GrantResult<JwkSet> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            let keys = if issuer == "iss" && subject == "alice" {
                vec![jwk()]
            } else {
                Vec::new()
            };
            Ok(JwkSet { keys })
        }

        async fn get_public_key_scopes(
            &self,
            _issuer: &str,
            _subject: &str,
            _key_id: &str,
        ) -> GrantResult<Vec<String>> {
            self.scopes
                .clone()
                .ok_or_else(|| GrantError::storage("scope table unavailable"))
        }
    }

    #[derive(Default)]
    struct Jtis {
        used: Mutex<HashMap<String, OffsetDateTime>>,
        read_only: bool,
    }

    #[async_trait]
    impl JtiStorage for Jtis {
        async fn mark_used(&self, jti: &str, expires_at: OffsetDateTime) -> GrantResult<bool> {
            if self.read_only {
                return Err(GrantError::storage("replica is read-only"));
            }
            let mut used = self.used.lock().unwrap();
            if used.contains_key(jti) {
                return Ok(false);
            }
            used.insert(jti.to_string(), expires_at);
            Ok(true)
        }

        async fn is_used(&self, jti: &str) -> GrantResult<bool> {
            Ok(self.used.lock().unwrap().contains_key(jti))
        }

        async fn cleanup_expired(&self) -> GrantResult<u64> {
            Ok(0)
        }
    }

    /// Writes a fixed token.
    struct StaticIssuer;

    #[async_trait]
    impl AccessTokenIssuer for StaticIssuer {
        async fn issue_access_token(
            &self,
            lifespan: time::Duration,
            _request: &AccessRequest,
            response: &mut AccessResponse,
        ) -> GrantResult<()> {
            response.access_token = "at".to_string();
            response.token_type = "bearer".to_string();
            response.expires_in = u64::try_from(lifespan.whole_seconds()).ok();
            Ok(())
        }
    }

    fn jwk() -> Jwk {
        serde_json::from_value(json!({
            "kty": "oct",
            "kid": "kid1",
            "alg": "HS256",
            "k": URL_SAFE_NO_PAD.encode(SECRET),
        }))
        .unwrap()
    }

    fn claims() -> Value {
        json!({
            "iss": "iss",
            "sub": "alice",
            "aud": [TOKEN_URL],
            "exp": NOW + 300,
            "iat": NOW,
            "jti": "abc123",
        })
    }

    fn sign(claims: &Value) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some("kid1".to_string());
        encode(&header, claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    struct Fixture {
        handler: JwtBearerGrantHandler,
        keys: Arc<OneKey>,
        jtis: Arc<Jtis>,
    }

    fn fixture(config: JwtBearerConfig) -> Fixture {
        fixture_with(
            config,
            Some(vec!["read".to_string(), "write".to_string()]),
            Jtis::default(),
        )
    }

    fn fixture_with(config: JwtBearerConfig, scopes: Option<Vec<String>>, jtis: Jtis) -> Fixture {
        let keys = Arc::new(OneKey {
            scopes,
            lookups: AtomicUsize::new(0),
        });
        let jtis = Arc::new(jtis);
        let handler = JwtBearerGrantHandler::new(config, keys.clone(), jtis.clone(), Arc::new(StaticIssuer))
            .with_clock(Arc::new(FixedClock::at_unix(NOW)));
        Fixture { handler, keys, jtis }
    }

    fn config() -> JwtBearerConfig {
        JwtBearerConfig::new(TOKEN_URL).with_skip_client_auth(true)
    }

    fn request(assertion: &str) -> AccessRequest {
        AccessRequest::new(Arc::new(Client::new("svc")), Box::new(JwtBearerSession::new()))
            .with_grant_type(JWT_BEARER_GRANT_TYPE)
            .with_form_value("assertion", assertion)
    }

    #[tokio::test]
    async fn test_accepts_valid_assertion() {
        let f = fixture(config());
        let mut req = request(&sign(&claims())).with_requested_scope("read");

        f.handler.handle_token_endpoint_request(&mut req).await.unwrap();

        assert_eq!(req.granted_scopes(), ["read"]);
        assert_eq!(req.granted_audience(), [TOKEN_URL]);
        assert_eq!(req.session().subject(), "alice");
        assert_eq!(
            req.session().expires_at(TokenType::AccessToken),
            Some(OffsetDateTime::from_unix_timestamp(NOW + 3600).unwrap())
        );
        assert!(f.jtis.used.lock().unwrap().contains_key("abc123"));

        let mut response = AccessResponse::new();
        f.handler
            .populate_token_endpoint_response(&req, &mut response)
            .await
            .unwrap();
        assert_eq!(response.access_token, "at");
        assert_eq!(response.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_other_grant_types_are_unknown() {
        let f = fixture(config());
        let mut req = AccessRequest::new(Arc::new(Client::new("svc")), Box::new(JwtBearerSession::new()))
            .with_grant_type("client_credentials");
        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert!(matches!(err, GrantError::UnknownRequest));

        let mut response = AccessResponse::new();
        let err = f
            .handler
            .populate_token_endpoint_response(&req, &mut response)
            .await
            .unwrap_err();
        assert!(matches!(err, GrantError::UnknownRequest));
    }

    #[tokio::test]
    async fn test_client_must_be_registered_unless_auth_skipped() {
        let f = fixture(JwtBearerConfig::new(TOKEN_URL));
        let mut req = request(&sign(&claims()));
        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "unauthorized_client");

        let client = Client::new("svc").with_grant_type(GrantType::JwtBearer);
        let mut req = AccessRequest::new(Arc::new(client), Box::new(JwtBearerSession::new()))
            .with_grant_type(JWT_BEARER_GRANT_TYPE)
            .with_form_value("assertion", sign(&claims()));
        f.handler.handle_token_endpoint_request(&mut req).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_assertion() {
        let f = fixture(config());
        let mut req = AccessRequest::new(Arc::new(Client::new("svc")), Box::new(JwtBearerSession::new()))
            .with_grant_type(JWT_BEARER_GRANT_TYPE);
        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_request");
    }

    #[tokio::test]
    async fn test_malformed_assertion() {
        let f = fixture(config());
        let mut req = request("definitely.not.a-jwt");
        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_grant");
    }

    #[tokio::test]
    async fn test_missing_issuer_or_subject_skips_key_lookup() {
        let f = fixture(config());
        for claim in ["iss", "sub"] {
            let mut claims = claims();
            claims.as_object_mut().unwrap().remove(claim);
            let mut req = request(&sign(&claims));
            let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
            assert!(err.hint().contains(&format!("\"{claim}\"")));
        }
        assert_eq!(f.keys.lookups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unregistered_scope_does_not_mark_jti() {
        let f = fixture(config());
        let token = sign(&claims());

        let mut req = request(&token).with_requested_scope("admin");
        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_scope");
        assert!(req.granted_scopes().is_empty());
        assert!(f.jtis.used.lock().unwrap().is_empty());

        // The corrected request is still accepted.
        let mut req = request(&token).with_requested_scope("write");
        f.handler.handle_token_endpoint_request(&mut req).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_without_subject_capability() {
        let f = fixture(config());
        let mut req = AccessRequest::new(Arc::new(Client::new("svc")), Box::new(DefaultSession::default()))
            .with_grant_type(JWT_BEARER_GRANT_TYPE)
            .with_form_value("assertion", sign(&claims()));

        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert!(err.is_server_error());
        assert!(err.hint().contains("DefaultSession"));
        assert!(f.jtis.used.lock().unwrap().is_empty());
        assert!(req.granted_audience().is_empty());
    }

    #[tokio::test]
    async fn test_replayed_assertion() {
        let f = fixture(config());
        let token = sign(&claims());

        let mut req = request(&token);
        f.handler.handle_token_endpoint_request(&mut req).await.unwrap();

        let mut req = request(&token);
        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert!(err.is_jti_known());
        assert_eq!(req.session().subject(), "");
    }

    #[tokio::test]
    async fn test_client_lifespan_override() {
        let f = fixture(config());
        let client = Client::new("svc").with_lifespan(
            GrantType::JwtBearer,
            TokenType::AccessToken,
            std::time::Duration::from_secs(600),
        );
        let mut req = AccessRequest::new(Arc::new(client), Box::new(JwtBearerSession::new()))
            .with_grant_type(JWT_BEARER_GRANT_TYPE)
            .with_form_value("assertion", sign(&claims()));
        f.handler.handle_token_endpoint_request(&mut req).await.unwrap();
        assert_eq!(
            req.session().expires_at(TokenType::AccessToken),
            Some(OffsetDateTime::from_unix_timestamp(NOW + 600).unwrap())
        );
    }

    #[tokio::test]
    async fn test_scope_lookup_failure_is_server_error() {
        let f = fixture_with(config(), None, Jtis::default());
        let mut req = request(&sign(&claims())).with_requested_scope("read");

        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert!(matches!(err, GrantError::ServerError { .. }));
        assert_eq!(err.oauth_error_code(), "server_error");
        assert!(!err.hint().contains("scope table"));
        assert!(req.granted_scopes().is_empty());
        assert!(req.granted_audience().is_empty());
        assert_eq!(req.session().subject(), "");
        assert!(f.jtis.used.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_jti_storage_failure_is_server_error() {
        let jtis = Jtis {
            read_only: true,
            ..Jtis::default()
        };
        let f = fixture_with(config(), Some(vec!["read".to_string()]), jtis);
        let mut req = request(&sign(&claims())).with_requested_scope("read");

        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert!(matches!(err, GrantError::ServerError { .. }));
        assert!(!err.hint().contains("read-only"));
        assert!(req.granted_scopes().is_empty());
        assert!(req.granted_audience().is_empty());
        assert_eq!(req.session().subject(), "");
        assert_eq!(req.session().expires_at(TokenType::AccessToken), None);
    }

    #[tokio::test]
    async fn test_unrepresentable_lifespan_is_server_error() {
        let lifetime = std::time::Duration::from_secs(400_000 * 365 * 24 * 3600);
        let config = config().with_access_token_lifetime(lifetime);
        assert!(config.validate().is_ok());
        let f = fixture(config);
        let mut req = request(&sign(&claims()));

        let err = f.handler.handle_token_endpoint_request(&mut req).await.unwrap_err();
        assert!(matches!(err, GrantError::ServerError { .. }));
        assert!(f.jtis.used.lock().unwrap().is_empty());
        assert_eq!(req.session().subject(), "");
        assert!(req.granted_audience().is_empty());
    }
}
