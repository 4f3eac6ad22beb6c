//! Public key storage trait.
//!
//! Trust anchors for the JWT bearer grant are addressed by
//! (issuer, subject, key ID) rather than a fixed PKI. Each registered key
//! carries the scopes its holder may request.

use async_trait::async_trait;
use jsonwebtoken::jwk::{Jwk, JwkSet};

use crate::GrantResult;

/// Storage trait for public keys trusted to sign assertions.
#[async_trait]
pub trait PublicKeyStorage: Send + Sync {
    /// Gets the key registered under `(issuer, subject, key_id)`.
    ///
    /// # Returns
    ///
    /// Returns `None` if no such key is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_public_key(
        &self,
        issuer: &str,
        subject: &str,
        key_id: &str,
    ) -> GrantResult<Option<Jwk>>;

    /// Gets every key registered under `(issuer, subject)`.
    ///
    /// The order of `keys` is the order in which the grant handler tries
    /// them when an assertion carries no key ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn get_public_keys(&self, issuer: &str, subject: &str) -> GrantResult<JwkSet>;

    /// Gets the scopes registered for the key `(issuer, subject, key_id)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the storage operation
    /// fails.
    async fn get_public_key_scopes(
        &self,
        issuer: &str,
        subject: &str,
        key_id: &str,
    ) -> GrantResult<Vec<String>>;
}
