//! Claim validation (RFC 7523 §3).
//!
//! Rules are checked in a fixed order and the first violation is reported:
//!
//! 1. `aud` is present
//! 2. `aud` contains the token endpoint URL
//! 3. `exp` is present
//! 4. `exp` is after now
//! 5. `nbf`, if present, is not after now
//! 6. `iat` is present, unless optional
//! 7. `exp - iat` (or `exp - now` without `iat`) is within the maximum
//! 8. `jti` is present, unless optional
//! 9. `jti`, if present, has not been used
//!
//! Only the last rule touches storage.

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use super::replay::ReplayGuard;
use crate::GrantResult;
use crate::config::JwtBearerConfig;
use crate::error::GrantError;
use crate::jwt::AssertionClaims;

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Validates verified assertion claims against the grant configuration.
#[derive(Debug, Clone)]
pub struct ClaimValidator {
    token_url: String,
    jwt_id_optional: bool,
    issued_at_optional: bool,
    max_duration: time::Duration,
}

impl ClaimValidator {
    /// Creates a validator from the grant configuration.
    #[must_use]
    pub fn new(config: &JwtBearerConfig) -> Self {
        Self {
            token_url: config.token_url.clone(),
            jwt_id_optional: config.jwt_id_optional,
            issued_at_optional: config.issued_at_optional,
            max_duration: config.max_assertion_span(),
        }
    }

    /// Applies every rule, including the replay check.
    ///
    /// # Errors
    ///
    /// Returns the first violated rule as `InvalidGrant` (`JtiKnown` for a
    /// used `jti`), or `ServerError` if the replay lookup fails.
    pub async fn validate(
        &self,
        claims: &AssertionClaims,
        now: OffsetDateTime,
        replay: &ReplayGuard,
    ) -> GrantResult<()> {
        self.validate_stateless(claims, now)?;

        if let Some(jti) = claims.jti.as_deref().filter(|j| !j.is_empty()) {
            replay.ensure_unused(jti).await?;
        }
        Ok(())
    }

    /// Applies every rule except the replay check.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` describing the first violated rule.
    pub fn validate_stateless(
        &self,
        claims: &AssertionClaims,
        now: OffsetDateTime,
    ) -> GrantResult<()> {
        if claims.aud.is_empty() {
            return Err(GrantError::invalid_grant(
                "The JWT in \"assertion\" request parameter MUST contain an \"aud\" (audience) claim.",
            ));
        }

        if !claims.aud.contains(&self.token_url) {
            tracing::debug!(
                audience = ?claims.aud.as_slice(),
                token_url = %self.token_url,
                "Assertion audience does not name the token endpoint"
            );
            return Err(GrantError::invalid_grant(format!(
                "The JWT in \"assertion\" request parameter MUST contain an \"aud\" (audience) \
                 claim containing the value \"{}\" that identifies the authorization server as \
                 an intended audience.",
                self.token_url
            )));
        }

        let Some(exp) = claims.exp else {
            return Err(GrantError::invalid_grant(
                "The JWT in \"assertion\" request parameter MUST contain an \"exp\" (expiration time) claim.",
            ));
        };

        let now_nanos = now.unix_timestamp_nanos();
        let exp_nanos = i128::from(exp) * NANOS_PER_SECOND;

        if exp_nanos <= now_nanos {
            tracing::debug!(exp, now = now.unix_timestamp(), "Assertion expired");
            return Err(GrantError::invalid_grant(
                "The JWT in \"assertion\" request parameter expired.",
            ));
        }

        if let Some(nbf) = claims.nbf
            && i128::from(nbf) * NANOS_PER_SECOND > now_nanos
        {
            tracing::debug!(nbf, now = now.unix_timestamp(), "Assertion not yet valid");
            return Err(GrantError::invalid_grant(format!(
                "The JWT in \"assertion\" request parameter contains an \"nbf\" (not before) \
                 claim that identifies the time '{}' before which the token MUST NOT be accepted.",
                rfc3339(nbf)
            )));
        }

        if !self.issued_at_optional && claims.iat.is_none() {
            return Err(GrantError::invalid_grant(
                "The JWT in \"assertion\" request parameter MUST contain an \"iat\" (issued at) claim.",
            ));
        }

        let issued_nanos = claims
            .iat
            .map_or(now_nanos, |iat| i128::from(iat) * NANOS_PER_SECOND);
        if exp_nanos - issued_nanos > self.max_duration.whole_nanoseconds() {
            let issued = match claims.iat {
                Some(iat) => rfc3339(iat),
                None => now.format(&Rfc3339).unwrap_or_default(),
            };
            tracing::debug!(exp, issued = %issued, "Assertion lifetime exceeds maximum");
            return Err(GrantError::invalid_grant(format!(
                "The JWT in \"assertion\" request parameter contains an \"exp\" (expiration time) \
                 claim with value \"{}\" that is unreasonably far in the future, considering the \
                 token was issued at \"{issued}\".",
                rfc3339(exp)
            )));
        }

        if !self.jwt_id_optional && claims.jwt_id().is_empty() {
            return Err(GrantError::invalid_grant(
                "The JWT in \"assertion\" request parameter MUST contain a \"jti\" (JWT ID) claim.",
            ));
        }

        Ok(())
    }
}

fn rfc3339(timestamp: i64) -> String {
    OffsetDateTime::from_unix_timestamp(timestamp)
        .ok()
        .and_then(|at| at.format(&Rfc3339).ok())
        .unwrap_or_else(|| timestamp.to_string())
}
