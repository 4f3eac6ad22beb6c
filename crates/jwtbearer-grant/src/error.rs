//! Token endpoint error types.
//!
//! Every failure of the JWT bearer grant surfaces as a [`GrantError`]. Each
//! variant maps to exactly one OAuth 2.0 error code (RFC 6749 §5.2) and
//! carries a human-readable hint that is safe to return to the caller.

use std::fmt;

use serde_json::{Value, json};

/// Hint returned to callers for any backing-service failure.
const SERVER_ERROR_HINT: &str =
    "The authorization server encountered an unexpected condition that prevented it from fulfilling the request.";

/// Errors that can occur while processing a token endpoint request.
#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    /// The request is not addressed to this handler.
    ///
    /// The enclosing token endpoint should try the next handler.
    #[error("Unknown request: the handler is not responsible for this request")]
    UnknownRequest,

    /// No registered handler accepted the requested grant type.
    #[error("Unsupported grant type: {grant_type}")]
    UnsupportedGrantType {
        /// The grant type(s) declared by the request.
        grant_type: String,
    },

    /// A required parameter is missing or malformed.
    #[error("Invalid request: {hint}")]
    InvalidRequest {
        /// Description of what is wrong with the request.
        hint: String,
    },

    /// The authenticated client may not use this grant type.
    #[error("Unauthorized client: {hint}")]
    UnauthorizedClient {
        /// Description of why the client is not authorized.
        hint: String,
    },

    /// The assertion is malformed, unverifiable, or carries invalid claims.
    #[error("Invalid grant: {hint}")]
    InvalidGrant {
        /// Description of why the grant is invalid.
        hint: String,
    },

    /// The assertion's JWT ID has already been used.
    #[error("Invalid grant: the JWT ID \"{jti}\" has already been used")]
    JtiKnown {
        /// The replayed JWT ID.
        jti: String,
    },

    /// A requested scope exceeds what is registered for the signing key.
    #[error("Invalid scope: {hint}")]
    InvalidScope {
        /// Description of why the scope is invalid.
        hint: String,
    },

    /// The server could not complete the request.
    ///
    /// `hint` is generic; `debug` holds the internal cause and must only be
    /// logged, never returned to the caller.
    #[error("Server error: {hint}")]
    ServerError {
        /// Caller-facing description.
        hint: String,
        /// Internal detail, for logs only.
        debug: Option<String>,
    },

    /// A storage collaborator failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },
}

impl GrantError {
    /// Creates a new `UnsupportedGrantType` error.
    #[must_use]
    pub fn unsupported_grant_type(grant_type: impl Into<String>) -> Self {
        Self::UnsupportedGrantType {
            grant_type: grant_type.into(),
        }
    }

    /// Creates a new `InvalidRequest` error.
    #[must_use]
    pub fn invalid_request(hint: impl Into<String>) -> Self {
        Self::InvalidRequest { hint: hint.into() }
    }

    /// Creates a new `UnauthorizedClient` error.
    #[must_use]
    pub fn unauthorized_client(hint: impl Into<String>) -> Self {
        Self::UnauthorizedClient { hint: hint.into() }
    }

    /// Creates a new `InvalidGrant` error.
    #[must_use]
    pub fn invalid_grant(hint: impl Into<String>) -> Self {
        Self::InvalidGrant { hint: hint.into() }
    }

    /// Creates a new `JtiKnown` error.
    #[must_use]
    pub fn jti_known(jti: impl Into<String>) -> Self {
        Self::JtiKnown { jti: jti.into() }
    }

    /// Creates a new `InvalidScope` error.
    #[must_use]
    pub fn invalid_scope(hint: impl Into<String>) -> Self {
        Self::InvalidScope { hint: hint.into() }
    }

    /// Creates a new `ServerError` with a caller-facing hint and no detail.
    #[must_use]
    pub fn server_error(hint: impl Into<String>) -> Self {
        Self::ServerError {
            hint: hint.into(),
            debug: None,
        }
    }

    /// Wraps an internal failure as a `ServerError`.
    ///
    /// The cause is logged and kept in `debug`; the caller only sees the
    /// generic hint.
    #[must_use]
    pub fn server_error_from(cause: impl fmt::Display) -> Self {
        let detail = cause.to_string();
        tracing::warn!(error = %detail, "Token endpoint backing service failed");
        Self::ServerError {
            hint: SERVER_ERROR_HINT.to_string(),
            debug: Some(detail),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownRequest
                | Self::UnsupportedGrantType { .. }
                | Self::InvalidRequest { .. }
                | Self::UnauthorizedClient { .. }
                | Self::InvalidGrant { .. }
                | Self::JtiKnown { .. }
                | Self::InvalidScope { .. }
        )
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ServerError { .. } | Self::Storage { .. })
    }

    /// Returns `true` if the assertion was rejected because its JWT ID was
    /// already used.
    #[must_use]
    pub fn is_jti_known(&self) -> bool {
        matches!(self, Self::JtiKnown { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownRequest => ErrorCategory::Routing,
            Self::UnsupportedGrantType { .. } => ErrorCategory::Routing,
            Self::InvalidRequest { .. } => ErrorCategory::Validation,
            Self::UnauthorizedClient { .. } => ErrorCategory::Authentication,
            Self::InvalidGrant { .. } => ErrorCategory::Assertion,
            Self::JtiKnown { .. } => ErrorCategory::Replay,
            Self::InvalidScope { .. } => ErrorCategory::Authorization,
            Self::ServerError { .. } => ErrorCategory::Internal,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::UnknownRequest => "invalid_request",
            Self::UnsupportedGrantType { .. } => "unsupported_grant_type",
            Self::InvalidRequest { .. } => "invalid_request",
            Self::UnauthorizedClient { .. } => "unauthorized_client",
            Self::InvalidGrant { .. } => "invalid_grant",
            Self::JtiKnown { .. } => "invalid_grant",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::ServerError { .. } => "server_error",
            Self::Storage { .. } => "server_error",
        }
    }

    /// Returns the HTTP status code the token endpoint should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::ServerError { .. } | Self::Storage { .. } => 500,
            _ => 400,
        }
    }

    /// Returns the caller-facing hint.
    ///
    /// Server-side failures never expose their internal detail.
    #[must_use]
    pub fn hint(&self) -> String {
        match self {
            Self::UnknownRequest => {
                "The handler is not responsible for this request.".to_string()
            }
            Self::UnsupportedGrantType { grant_type } => format!(
                "The authorization grant type \"{grant_type}\" is not supported by the authorization server."
            ),
            Self::InvalidRequest { hint }
            | Self::UnauthorizedClient { hint }
            | Self::InvalidGrant { hint }
            | Self::InvalidScope { hint }
            | Self::ServerError { hint, .. } => hint.clone(),
            Self::JtiKnown { jti } => format!(
                "The JWT ID \"{jti}\" of the assertion has already been used and cannot be replayed."
            ),
            Self::Storage { .. } => SERVER_ERROR_HINT.to_string(),
        }
    }

    /// Builds the RFC 6749 §5.2 error response body.
    #[must_use]
    pub fn to_error_body(&self) -> Value {
        json!({
            "error": self.oauth_error_code(),
            "error_description": self.hint(),
        })
    }
}

/// Categories of token endpoint errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// The request was not routed to a handler that accepts it.
    Routing,
    /// Request validation errors.
    Validation,
    /// Client authentication/authorization errors.
    Authentication,
    /// Assertion content errors (signature, claims).
    Assertion,
    /// Replayed assertions.
    Replay,
    /// Scope authorization errors.
    Authorization,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Internal server errors.
    Internal,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Routing => write!(f, "routing"),
            Self::Validation => write!(f, "validation"),
            Self::Authentication => write!(f, "authentication"),
            Self::Assertion => write!(f, "assertion"),
            Self::Replay => write!(f, "replay"),
            Self::Authorization => write!(f, "authorization"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Internal => write!(f, "internal"),
        }
    }
}
