//! Key registry documents.
//!
//! A registry lists the keys trusted to sign assertions:
//!
//! ```json
//! {
//!   "keys": [
//!     {
//!       "issuer": "https://issuer.example",
//!       "subject": "alice",
//!       "scopes": ["read"],
//!       "jwk": { "kty": "RSA", "kid": "kid1", "alg": "RS256", "n": "...", "e": "AQAB" }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use jsonwebtoken::jwk::Jwk;
use serde::{Deserialize, Serialize};

use crate::keys::InMemoryKeyStorage;

/// Registry loading errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The registry file could not be read.
    #[error("Failed to read key registry: {0}")]
    Io(#[from] std::io::Error),

    /// The registry is not valid JSON or does not match the schema.
    #[error("Failed to parse key registry: {0}")]
    Parse(#[from] serde_json::Error),

    /// An entry is incomplete.
    #[error("Invalid key registry entry #{index}: {message}")]
    InvalidEntry {
        /// Position of the entry in `keys`.
        index: usize,
        /// Description of the problem.
        message: String,
    },
}

/// One trusted key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Expected `iss` of assertions signed with this key.
    pub issuer: String,
    /// Expected `sub` of assertions signed with this key.
    pub subject: String,
    /// Scopes the key holder may request.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// The public key.
    pub jwk: Jwk,
}

/// A list of trusted keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyRegistry {
    /// Registry entries, in registration order.
    #[serde(default)]
    pub keys: Vec<RegistryEntry>,
}

impl KeyRegistry {
    /// Parses and validates a registry document.
    ///
    /// # Errors
    ///
    /// Returns `Parse` for malformed JSON and `InvalidEntry` if an entry
    /// has an empty issuer or subject.
    pub fn from_json_str(source: &str) -> Result<Self, RegistryError> {
        let registry: Self = serde_json::from_str(source)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Reads a registry document from `path`.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, otherwise see
    /// [`Self::from_json_str`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&source)
    }

    /// Checks that every entry names an issuer and a subject, and that no
    /// two entries share an (issuer, subject, key ID) identity.
    ///
    /// # Errors
    ///
    /// Returns `InvalidEntry` for the first incomplete or duplicate entry.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        for (index, entry) in self.keys.iter().enumerate() {
            if entry.issuer.is_empty() {
                return Err(RegistryError::InvalidEntry {
                    index,
                    message: "issuer is empty".to_string(),
                });
            }
            if entry.subject.is_empty() {
                return Err(RegistryError::InvalidEntry {
                    index,
                    message: "subject is empty".to_string(),
                });
            }
            let kid = entry.jwk.common.key_id.as_deref().unwrap_or_default();
            if !seen.insert((entry.issuer.as_str(), entry.subject.as_str(), kid)) {
                return Err(RegistryError::InvalidEntry {
                    index,
                    message: format!(
                        "duplicate key \"{kid}\" for issuer \"{}\" and subject \"{}\"",
                        entry.issuer, entry.subject
                    ),
                });
            }
        }
        Ok(())
    }

    /// Registers every entry in `storage`.
    pub fn register(&self, storage: &InMemoryKeyStorage) {
        for entry in &self.keys {
            storage.add_key(
                entry.issuer.clone(),
                entry.subject.clone(),
                entry.jwk.clone(),
                entry.scopes.clone(),
            );
        }
        tracing::info!(keys = self.keys.len(), "Loaded key registry");
    }

    /// Builds a storage holding every entry.
    #[must_use]
    pub fn into_storage(self) -> InMemoryKeyStorage {
        let storage = InMemoryKeyStorage::new();
        self.register(&storage);
        storage
    }
}
