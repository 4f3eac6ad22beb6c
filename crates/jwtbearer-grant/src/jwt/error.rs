//! Assertion parse and verification errors.

/// Errors that can occur while parsing or verifying an assertion.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// The assertion is not a compact-serialized JWS.
    #[error("Malformed JWT: {message}")]
    Malformed {
        /// Description of the structural problem.
        message: String,
    },

    /// The payload is not a JSON claims set.
    #[error("Invalid claims: {message}")]
    InvalidClaims {
        /// Description of why claims are invalid.
        message: String,
    },

    /// The signature does not verify against the key.
    #[error("Invalid signature")]
    InvalidSignature,

    /// The key cannot be used to verify the assertion.
    #[error("Invalid key: {message}")]
    InvalidKey {
        /// Description of why the key is unusable.
        message: String,
    },

    /// The assertion's `alg` differs from the one the key is registered for.
    #[error("Algorithm mismatch: key requires {expected}, assertion uses {found}")]
    AlgorithmMismatch {
        /// Algorithm the key is registered for.
        expected: String,
        /// Algorithm named in the assertion header.
        found: String,
    },

    /// Any other decoding failure.
    #[error("Failed to decode token: {message}")]
    Decoding {
        /// Description of the decoding error.
        message: String,
    },
}

impl JwtError {
    /// Creates a new `Malformed` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidClaims` error.
    #[must_use]
    pub fn invalid_claims(message: impl Into<String>) -> Self {
        Self::InvalidClaims {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidKey` error.
    #[must_use]
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a new `Decoding` error.
    #[must_use]
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Returns `true` if the failure is attributable to the key rather than
    /// the assertion.
    #[must_use]
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidKey { .. } | Self::AlgorithmMismatch { .. }
        )
    }
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;

        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidAlgorithmName
            | ErrorKind::MissingAlgorithm => Self::malformed(err.to_string()),
            ErrorKind::InvalidAlgorithm => Self::invalid_key(err.to_string()),
            ErrorKind::InvalidRsaKey(_)
            | ErrorKind::InvalidEcdsaKey
            | ErrorKind::InvalidKeyFormat => Self::invalid_key(err.to_string()),
            ErrorKind::MissingRequiredClaim(_) => Self::invalid_claims(err.to_string()),
            _ => Self::decoding(err.to_string()),
        }
    }
}
