//! In-memory JWT ID storage.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use jwtbearer_grant::{Clock, GrantResult, JtiStorage, SystemClock};
use time::OffsetDateTime;

/// Used JWT IDs with the time each may be forgotten.
///
/// `mark_used` holds the shard lock of the JTI for the whole
/// check-and-mark, so concurrent calls with the same JTI are serialized.
pub struct InMemoryJtiStorage {
    used: DashMap<String, OffsetDateTime>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryJtiStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InMemoryJtiStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryJtiStorage")
            .field("entries", &self.used.len())
            .finish_non_exhaustive()
    }
}

impl InMemoryJtiStorage {
    /// Creates an empty storage using the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Creates an empty storage using `clock` to decide expiry.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            used: DashMap::new(),
            clock,
        }
    }

    /// Number of stored entries, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.used.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

#[async_trait]
impl JtiStorage for InMemoryJtiStorage {
    async fn mark_used(&self, jti: &str, expires_at: OffsetDateTime) -> GrantResult<bool> {
        let now = self.clock.now();
        match self.used.entry(jti.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    return Ok(false);
                }
                entry.insert(expires_at);
                Ok(true)
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                Ok(true)
            }
        }
    }

    async fn is_used(&self, jti: &str) -> GrantResult<bool> {
        let now = self.clock.now();
        Ok(self.used.get(jti).is_some_and(|expires_at| *expires_at > now))
    }

    async fn cleanup_expired(&self) -> GrantResult<u64> {
        let now = self.clock.now();
        let before = self.used.len();
        self.used.retain(|_, expires_at| *expires_at > now);
        let removed = before.saturating_sub(self.used.len()) as u64;
        if removed > 0 {
            tracing::debug!(removed, "Removed expired JWT IDs");
        }
        Ok(removed)
    }
}
