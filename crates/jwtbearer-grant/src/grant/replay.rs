//! Single-use enforcement for assertion JWT IDs.

use std::sync::Arc;

use time::{OffsetDateTime, PrimitiveDateTime};

use crate::GrantResult;
use crate::error::GrantError;
use crate::storage::JtiStorage;

/// Checks and records used JWT IDs through a [`JtiStorage`].
#[derive(Clone)]
pub struct ReplayGuard {
    storage: Arc<dyn JtiStorage>,
}

impl ReplayGuard {
    /// Creates a guard backed by `storage`.
    pub fn new(storage: Arc<dyn JtiStorage>) -> Self {
        Self { storage }
    }

    /// Fails with `JtiKnown` if `jti` was already used.
    ///
    /// # Errors
    ///
    /// Returns `JtiKnown` on reuse and `ServerError` if storage fails.
    pub async fn ensure_unused(&self, jti: &str) -> GrantResult<()> {
        let used = self
            .storage
            .is_used(jti)
            .await
            .map_err(GrantError::server_error_from)?;
        if used {
            tracing::debug!(jti, "Assertion JWT ID already used");
            return Err(GrantError::jti_known(jti));
        }
        Ok(())
    }

    /// Records `jti` as used until `exp` (Unix seconds).
    ///
    /// The storage check-and-mark is atomic, so when two requests race
    /// with the same `jti` exactly one of them succeeds here.
    ///
    /// # Errors
    ///
    /// Returns `JtiKnown` if another request recorded `jti` first and
    /// `ServerError` if storage fails.
    pub async fn mark_used(&self, jti: &str, exp: i64) -> GrantResult<()> {
        let expires_at = OffsetDateTime::from_unix_timestamp(exp)
            .unwrap_or_else(|_| PrimitiveDateTime::MAX.assume_utc());

        let first = self
            .storage
            .mark_used(jti, expires_at)
            .await
            .map_err(GrantError::server_error_from)?;
        if !first {
            tracing::warn!(jti, "Concurrent replay of assertion JWT ID rejected");
            return Err(GrantError::jti_known(jti));
        }
        Ok(())
    }
}
