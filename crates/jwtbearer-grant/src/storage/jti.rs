//! JWT ID (JTI) storage trait for replay prevention.
//!
//! # Security Considerations
//!
//! - JTIs must be stored with the expiry of the assertion that carried them
//! - `mark_used` must be an atomic check-and-mark
//! - Expired JTIs may be forgotten, but never before their expiry
//!
//! If `mark_used` were a separate check followed by a write, two concurrent
//! requests carrying the same assertion could both be accepted. The grant
//! handler relies on the return value of `mark_used` alone to reject the
//! loser of that race.

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::GrantResult;

/// Storage trait for JWT ID (JTI) tracking.
///
/// # Example Implementation
///
/// ```ignore
/// use jwtbearer_grant::storage::JtiStorage;
/// use jwtbearer_grant::GrantResult;
/// use time::OffsetDateTime;
///
/// struct LockedJtiStorage {
///     used: std::sync::Mutex<std::collections::HashMap<String, OffsetDateTime>>,
/// }
///
/// #[async_trait::async_trait]
/// impl JtiStorage for LockedJtiStorage {
///     async fn mark_used(&self, jti: &str, expires_at: OffsetDateTime) -> GrantResult<bool> {
///         let mut used = self.used.lock().map_err(|e| GrantError::storage(e.to_string()))?;
///         if used.contains_key(jti) {
///             return Ok(false);
///         }
///         used.insert(jti.to_string(), expires_at);
///         Ok(true)
///     }
///     // ... other methods
/// }
/// ```
#[async_trait]
pub trait JtiStorage: Send + Sync {
    /// Atomically marks a JTI as used if not already used.
    ///
    /// # Arguments
    ///
    /// * `jti` - The JWT ID to mark as used
    /// * `expires_at` - When this entry may be forgotten (the assertion's `exp`)
    ///
    /// # Returns
    ///
    /// `true` if this call recorded the JTI, `false` if it was already
    /// recorded and has not expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    ///
    /// # Atomicity
    ///
    /// A SQL backend would use a conditional insert:
    ///
    /// ```sql
    /// INSERT INTO used_jtis (jti, expires_at)
    /// VALUES ($1, $2)
    /// ON CONFLICT (jti) DO UPDATE SET expires_at = EXCLUDED.expires_at
    ///     WHERE used_jtis.expires_at <= now()
    /// RETURNING jti
    /// ```
    async fn mark_used(&self, jti: &str, expires_at: OffsetDateTime) -> GrantResult<bool>;

    /// Checks if a JTI has been used and has not expired yet.
    ///
    /// Prefer `mark_used`, which checks and records in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn is_used(&self, jti: &str) -> GrantResult<bool>;

    /// Deletes expired JTI entries and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cleanup operation fails.
    async fn cleanup_expired(&self) -> GrantResult<u64>;
}
