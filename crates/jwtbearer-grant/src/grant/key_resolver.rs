//! Public key resolution for assertions.
//!
//! If the assertion header names a key ID, the single key registered under
//! (issuer, subject, kid) is used. Otherwise every key registered under
//! (issuer, subject) is tried in the order storage returns them, and the
//! first one that verifies the signature wins.

use std::sync::Arc;

use jsonwebtoken::jwk::Jwk;

use crate::GrantResult;
use crate::error::GrantError;
use crate::jwt::{Assertion, AssertionClaims};
use crate::storage::PublicKeyStorage;

/// An assertion whose signature verified against a registered key.
#[derive(Debug, Clone)]
pub struct VerifiedAssertion {
    /// The key that verified the signature.
    pub key: Jwk,
    /// Key ID the scopes are registered under.
    pub key_id: String,
    /// Claims read from the verified token.
    pub claims: AssertionClaims,
}

/// Finds the key an assertion was signed with.
#[derive(Clone)]
pub struct KeyResolver {
    storage: Arc<dyn PublicKeyStorage>,
}

impl KeyResolver {
    /// Creates a resolver backed by `storage`.
    pub fn new(storage: Arc<dyn PublicKeyStorage>) -> Self {
        Self { storage }
    }

    /// Resolves the signing key and verifies the assertion against it.
    ///
    /// `issuer` and `subject` come from the unverified claims.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if no registered key is found or none
    /// verifies the signature. Storage failures are reported the same way.
    pub async fn resolve(
        &self,
        assertion: &Assertion,
        issuer: &str,
        subject: &str,
    ) -> GrantResult<VerifiedAssertion> {
        match assertion.key_id() {
            Some(kid) => self.resolve_by_key_id(assertion, issuer, subject, kid).await,
            None => self.resolve_by_trial(assertion, issuer, subject).await,
        }
    }

    async fn resolve_by_key_id(
        &self,
        assertion: &Assertion,
        issuer: &str,
        subject: &str,
        kid: &str,
    ) -> GrantResult<VerifiedAssertion> {
        let key = match self.storage.get_public_key(issuer, subject, kid).await {
            Ok(Some(key)) => key,
            Ok(None) => {
                tracing::debug!(issuer, subject, kid, "No public key registered");
                return Err(key_not_found(issuer, subject));
            }
            Err(e) => {
                tracing::debug!(issuer, subject, kid, error = %e, "Public key lookup failed");
                return Err(key_not_found(issuer, subject));
            }
        };

        let claims = assertion.verify(&key).map_err(|e| {
            tracing::debug!(issuer, subject, kid, error = %e, "Assertion signature rejected");
            GrantError::invalid_grant(format!(
                "Unable to verify the integrity of the 'assertion' value. No public JWK \
                 registered for issuer \"{issuer}\" and subject \"{subject}\" matches its signature."
            ))
        })?;

        Ok(VerifiedAssertion {
            key_id: key.common.key_id.clone().unwrap_or_else(|| kid.to_string()),
            key,
            claims,
        })
    }

    async fn resolve_by_trial(
        &self,
        assertion: &Assertion,
        issuer: &str,
        subject: &str,
    ) -> GrantResult<VerifiedAssertion> {
        let set = self
            .storage
            .get_public_keys(issuer, subject)
            .await
            .map_err(|e| {
                tracing::debug!(issuer, subject, error = %e, "Public key lookup failed");
                key_not_found(issuer, subject)
            })?;

        for key in set.keys {
            match assertion.verify(&key) {
                Ok(claims) => {
                    return Ok(VerifiedAssertion {
                        key_id: key.common.key_id.clone().unwrap_or_default(),
                        key,
                        claims,
                    });
                }
                Err(e) => {
                    tracing::trace!(
                        issuer,
                        subject,
                        kid = key.common.key_id.as_deref().unwrap_or_default(),
                        error = %e,
                        "Candidate key did not verify assertion"
                    );
                }
            }
        }

        tracing::debug!(issuer, subject, "No registered public key verified the assertion");
        Err(key_not_found(issuer, subject))
    }
}

fn key_not_found(issuer: &str, subject: &str) -> GrantError {
    GrantError::invalid_grant(format!(
        "No public JWK was registered for issuer \"{issuer}\" and subject \"{subject}\", \
         and a public key is required to check the signature of the JWT in the \"assertion\" \
         request parameter."
    ))
}
