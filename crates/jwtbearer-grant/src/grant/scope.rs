//! Scope authorization against the scopes registered for a key.

use std::sync::Arc;

use crate::GrantResult;
use crate::error::GrantError;
use crate::strategy::{HierarchicScopeStrategy, ScopeStrategy};

/// Decides whether requested scopes may be granted.
#[derive(Clone)]
pub struct ScopeAuthorizer {
    strategy: Arc<dyn ScopeStrategy>,
}

impl Default for ScopeAuthorizer {
    fn default() -> Self {
        Self::new(Arc::new(HierarchicScopeStrategy))
    }
}

impl ScopeAuthorizer {
    /// Creates an authorizer using `strategy`.
    pub fn new(strategy: Arc<dyn ScopeStrategy>) -> Self {
        Self { strategy }
    }

    /// Checks every requested scope against `registered`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidScope` naming the first scope the strategy rejects.
    pub fn authorize(
        &self,
        registered: &[String],
        requested: &[String],
        issuer: &str,
        subject: &str,
    ) -> GrantResult<()> {
        for scope in requested {
            if !self.strategy.matches(registered, scope) {
                tracing::debug!(issuer, subject, scope = %scope, "Requested scope not registered for key");
                return Err(GrantError::invalid_scope(format!(
                    "The public key registered for issuer \"{issuer}\" and subject \"{subject}\" \
                     is not allowed to request scope \"{scope}\"."
                )));
            }
        }
        Ok(())
    }
}
