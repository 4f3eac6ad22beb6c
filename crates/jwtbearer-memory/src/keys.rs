//! In-memory public key storage.

use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::jwk::{Jwk, JwkSet};
use jwtbearer_grant::{GrantError, GrantResult, PublicKeyStorage};

/// A trusted key and the scopes its holder may request.
#[derive(Debug, Clone)]
pub struct KeyRecord {
    /// Key ID, empty if the JWK has none.
    pub key_id: String,
    /// The public key.
    pub jwk: Jwk,
    /// Scopes registered for the key.
    pub scopes: Vec<String>,
}

/// Public keys grouped by (issuer, subject).
///
/// Within a group keys are returned in registration order.
#[derive(Debug, Default)]
pub struct InMemoryKeyStorage {
    keys: DashMap<(String, String), Vec<KeyRecord>>,
}

impl InMemoryKeyStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `jwk` for `(issuer, subject)` with `scopes`.
    ///
    /// Keys are identified by (issuer, subject, key ID), with a missing key
    /// ID counting as the empty one. Registering an existing identity
    /// replaces the key and its scopes in place, so at most one key without
    /// a key ID exists per (issuer, subject).
    pub fn add_key(
        &self,
        issuer: impl Into<String>,
        subject: impl Into<String>,
        jwk: Jwk,
        scopes: Vec<String>,
    ) {
        let issuer = issuer.into();
        let subject = subject.into();
        let key_id = jwk.common.key_id.clone().unwrap_or_default();
        tracing::debug!(issuer = %issuer, subject = %subject, kid = %key_id, "Registering public key");

        let record = KeyRecord {
            key_id,
            jwk,
            scopes,
        };
        let mut group = self.keys.entry((issuer, subject)).or_default();
        match group.iter_mut().find(|r| r.key_id == record.key_id) {
            Some(existing) => {
                tracing::debug!(kid = %record.key_id, "Replacing registered public key");
                *existing = record;
            }
            None => group.push(record),
        }
    }

    /// Removes the key `(issuer, subject, key_id)`. Returns `true` if it
    /// was registered.
    pub fn remove_key(&self, issuer: &str, subject: &str, key_id: &str) -> bool {
        let key = (issuer.to_string(), subject.to_string());
        let removed = match self.keys.get_mut(&key) {
            Some(mut group) => {
                let before = group.len();
                group.retain(|r| r.key_id != key_id);
                before != group.len()
            }
            None => false,
        };
        self.keys.remove_if(&key, |_, group| group.is_empty());
        removed
    }

    /// Total number of registered keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.iter().map(|group| group.len()).sum()
    }

    /// Returns `true` if no key is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn find(&self, issuer: &str, subject: &str, key_id: &str) -> Option<KeyRecord> {
        self.keys
            .get(&(issuer.to_string(), subject.to_string()))
            .and_then(|group| group.iter().find(|r| r.key_id == key_id).cloned())
    }
}

#[async_trait]
impl PublicKeyStorage for InMemoryKeyStorage {
    async fn get_public_key(
        &self,
        issuer: &str,
        subject: &str,
        key_id: &str,
    ) -> GrantResult<Option<Jwk>> {
        Ok(self.find(issuer, subject, key_id).map(|r| r.jwk))
    }

    async fn get_public_keys(&self, issuer: &str, subject: &str) -> GrantResult<JwkSet> {
        let keys = self
            .keys
            .get(&(issuer.to_string(), subject.to_string()))
            .map(|group| group.iter().map(|r| r.jwk.clone()).collect())
            .unwrap_or_default();
        Ok(JwkSet { keys })
    }

    async fn get_public_key_scopes(
        &self,
        issuer: &str,
        subject: &str,
        key_id: &str,
    ) -> GrantResult<Vec<String>> {
        self.find(issuer, subject, key_id)
            .map(|r| r.scopes)
            .ok_or_else(|| {
                GrantError::storage(format!(
                    "no public key registered for issuer \"{issuer}\", subject \"{subject}\" and key ID \"{key_id}\""
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;

    fn jwk(kid: Option<&str>, secret: &str) -> Jwk {
        let mut value = serde_json::json!({
            "kty": "oct",
            "k": URL_SAFE_NO_PAD.encode(secret),
        });
        if let Some(kid) = kid {
            value["kid"] = serde_json::json!(kid);
        }
        serde_json::from_value(value).unwrap()
    }

    fn scopes(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_lookup_by_key_id() {
        let storage = InMemoryKeyStorage::new();
        storage.add_key("iss", "alice", jwk(Some("kid1"), "one"), scopes(&["read"]));

        let key = storage.get_public_key("iss", "alice", "kid1").await.unwrap();
        assert_eq!(key.unwrap().common.key_id.as_deref(), Some("kid1"));
        assert!(storage.get_public_key("iss", "bob", "kid1").await.unwrap().is_none());
        assert!(storage.get_public_key("iss", "alice", "kid2").await.unwrap().is_none());
        assert_eq!(
            storage.get_public_key_scopes("iss", "alice", "kid1").await.unwrap(),
            ["read"]
        );
    }

    #[tokio::test]
    async fn test_keys_keep_registration_order() {
        let storage = InMemoryKeyStorage::new();
        storage.add_key("iss", "alice", jwk(Some("b"), "two"), Vec::new());
        storage.add_key("iss", "alice", jwk(Some("a"), "one"), Vec::new());
        storage.add_key("iss", "alice", jwk(None, "three"), Vec::new());

        let set = storage.get_public_keys("iss", "alice").await.unwrap();
        let kids: Vec<_> = set
            .keys
            .iter()
            .map(|k| k.common.key_id.clone().unwrap_or_default())
            .collect();
        assert_eq!(kids, ["b", "a", ""]);
        assert!(storage.get_public_keys("iss", "nobody").await.unwrap().keys.is_empty());
    }

    #[tokio::test]
    async fn test_replace_and_remove() {
        let storage = InMemoryKeyStorage::new();
        storage.add_key("iss", "alice", jwk(Some("kid1"), "one"), scopes(&["read"]));
        storage.add_key("iss", "alice", jwk(Some("kid1"), "two"), scopes(&["write"]));
        assert_eq!(storage.len(), 1);
        assert_eq!(
            storage.get_public_key_scopes("iss", "alice", "kid1").await.unwrap(),
            ["write"]
        );

        assert!(storage.remove_key("iss", "alice", "kid1"));
        assert!(!storage.remove_key("iss", "alice", "kid1"));
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_key_without_id_is_replaced() {
        let storage = InMemoryKeyStorage::new();
        storage.add_key("iss", "alice", jwk(None, "one"), scopes(&["admin"]));
        storage.add_key("iss", "alice", jwk(Some("kid1"), "two"), scopes(&["write"]));
        storage.add_key("iss", "alice", jwk(None, "three"), scopes(&["read"]));

        assert_eq!(storage.len(), 2);
        assert_eq!(
            storage.get_public_key_scopes("iss", "alice", "").await.unwrap(),
            ["read"]
        );
        let set = storage.get_public_keys("iss", "alice").await.unwrap();
        assert_eq!(set.keys.len(), 2);
        assert!(set.keys[0].common.key_id.is_none());
        assert_eq!(set.keys[1].common.key_id.as_deref(), Some("kid1"));
    }

    #[tokio::test]
    async fn test_scopes_of_unknown_key() {
        let storage = InMemoryKeyStorage::new();
        let err = storage
            .get_public_key_scopes("iss", "alice", "kid1")
            .await
            .unwrap_err();
        assert!(err.is_server_error());
    }
}
