//! Token endpoint sessions.
//!
//! A session is the state an issued token is bound to. The generic
//! [`Session`] interface covers per-token-type expiry. The JWT bearer grant
//! additionally needs to write the subject; that is a separate capability,
//! [`SubjectSession`], which a session type may or may not offer.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::types::TokenType;

/// Generic OAuth 2.0 session.
pub trait Session: fmt::Debug + Send + Sync {
    /// Sets the expiry of tokens of `token_type`.
    fn set_expires_at(&mut self, token_type: TokenType, at: OffsetDateTime);

    /// Returns the expiry of tokens of `token_type`, if set.
    fn expires_at(&self, token_type: TokenType) -> Option<OffsetDateTime>;

    /// Returns the subject the session belongs to (empty if unknown).
    fn subject(&self) -> &str;

    /// Returns the subject-setting capability, if this session type has it.
    fn as_subject_session(&mut self) -> Option<&mut dyn SubjectSession> {
        None
    }

    /// Short name of the concrete session type, used in error hints.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Capability of sessions whose subject is set by the grant.
pub trait SubjectSession {
    /// Sets the subject the issued token is bound to.
    fn set_subject(&mut self, subject: &str);
}

/// Session that only implements the generic interface.
///
/// Its subject is fixed at construction; the JWT bearer grant rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultSession {
    /// Subject set by the framework.
    pub subject: String,

    /// Expiry per token type.
    #[serde(default, with = "expiry_map")]
    pub expires_at: HashMap<TokenType, OffsetDateTime>,
}

impl Session for DefaultSession {
    fn set_expires_at(&mut self, token_type: TokenType, at: OffsetDateTime) {
        self.expires_at.insert(token_type, at);
    }

    fn expires_at(&self, token_type: TokenType) -> Option<OffsetDateTime> {
        self.expires_at.get(&token_type).copied()
    }

    fn subject(&self) -> &str {
        &self.subject
    }
}

/// Session for the JWT bearer grant: the subject comes from the verified
/// assertion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtBearerSession {
    /// Subject of the verified assertion.
    pub subject: String,

    /// Expiry per token type.
    #[serde(default, with = "expiry_map")]
    pub expires_at: HashMap<TokenType, OffsetDateTime>,
}

impl JwtBearerSession {
    /// Creates an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Session for JwtBearerSession {
    fn set_expires_at(&mut self, token_type: TokenType, at: OffsetDateTime) {
        self.expires_at.insert(token_type, at);
    }

    fn expires_at(&self, token_type: TokenType) -> Option<OffsetDateTime> {
        self.expires_at.get(&token_type).copied()
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn as_subject_session(&mut self) -> Option<&mut dyn SubjectSession> {
        Some(self)
    }
}

impl SubjectSession for JwtBearerSession {
    fn set_subject(&mut self, subject: &str) {
        self.subject = subject.to_string();
    }
}

/// Serializes expiry maps as `{ "<token_type>": <unix seconds> }`.
mod expiry_map {
    use std::collections::HashMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use time::OffsetDateTime;

    use crate::types::TokenType;

    pub fn serialize<S: Serializer>(
        map: &HashMap<TokenType, OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let raw: HashMap<TokenType, i64> = map
            .iter()
            .map(|(k, v)| (*k, v.unix_timestamp()))
            .collect();
        raw.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<HashMap<TokenType, OffsetDateTime>, D::Error> {
        let raw = HashMap::<TokenType, i64>::deserialize(deserializer)?;
        raw.into_iter()
            .map(|(k, v)| {
                OffsetDateTime::from_unix_timestamp(v)
                    .map(|at| (k, at))
                    .map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
