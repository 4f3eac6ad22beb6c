//! JWT bearer grant configuration.
//!
//! The configuration is static: it is loaded once, validated, and then shared
//! immutably by the grant handler.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Configuration of the JWT bearer grant handler.
///
/// # Example (TOML)
///
/// ```toml
/// token_url = "https://as.example/token"
/// skip_client_auth = false
/// jwt_id_optional = false
/// issued_at_optional = false
/// max_assertion_duration = "1h"
/// access_token_lifetime = "1h"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JwtBearerConfig {
    /// URL of the authorization server's token endpoint.
    /// Every assertion must list it in its `aud` claim.
    pub token_url: String,

    /// Allow requests without an authenticated client.
    /// When disabled, the client must be registered for the JWT bearer grant.
    pub skip_client_auth: bool,

    /// Accept assertions without a `jti` claim.
    /// Assertions without `jti` cannot be protected against replay.
    pub jwt_id_optional: bool,

    /// Accept assertions without an `iat` claim.
    /// When absent, the current time is used as the issue date.
    pub issued_at_optional: bool,

    /// Maximum time between the assertion's issue date and its expiry.
    #[serde(with = "humantime_serde")]
    pub max_assertion_duration: Duration,

    /// Default access token lifetime for this grant.
    /// Clients may override it per grant type.
    #[serde(with = "humantime_serde")]
    pub access_token_lifetime: Duration,
}

impl Default for JwtBearerConfig {
    fn default() -> Self {
        Self {
            token_url: String::new(),
            skip_client_auth: false,
            jwt_id_optional: false,
            issued_at_optional: false,
            max_assertion_duration: Duration::from_secs(24 * 3600), // 24 hours
            access_token_lifetime: Duration::from_secs(3600),       // 1 hour
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration document could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(String),
}

impl JwtBearerConfig {
    /// Creates a configuration for the given token endpoint URL with defaults
    /// for everything else.
    #[must_use]
    pub fn new(token_url: impl Into<String>) -> Self {
        Self {
            token_url: token_url.into(),
            ..Self::default()
        }
    }

    /// Allows requests without client authentication.
    #[must_use]
    pub fn with_skip_client_auth(mut self, skip: bool) -> Self {
        self.skip_client_auth = skip;
        self
    }

    /// Makes the `jti` claim optional.
    #[must_use]
    pub fn with_jwt_id_optional(mut self, optional: bool) -> Self {
        self.jwt_id_optional = optional;
        self
    }

    /// Makes the `iat` claim optional.
    #[must_use]
    pub fn with_issued_at_optional(mut self, optional: bool) -> Self {
        self.issued_at_optional = optional;
        self
    }

    /// Sets the maximum assertion lifetime.
    #[must_use]
    pub fn with_max_assertion_duration(mut self, duration: Duration) -> Self {
        self.max_assertion_duration = duration;
        self
    }

    /// Sets the default access token lifetime.
    #[must_use]
    pub fn with_access_token_lifetime(mut self, lifetime: Duration) -> Self {
        self.access_token_lifetime = lifetime;
        self
    }

    /// Maximum assertion lifetime as a signed duration.
    #[must_use]
    pub fn max_assertion_span(&self) -> time::Duration {
        time::Duration::try_from(self.max_assertion_duration).unwrap_or(time::Duration::MAX)
    }

    /// Default access token lifetime as a signed duration.
    #[must_use]
    pub fn access_token_span(&self) -> time::Duration {
        time::Duration::try_from(self.access_token_lifetime).unwrap_or(time::Duration::MAX)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the token URL is empty, and
    /// `ConfigError::InvalidValue` if:
    /// - The token URL is not an absolute http(s) URL
    /// - The maximum assertion duration is zero
    /// - The access token lifetime is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_url.is_empty() {
            return Err(ConfigError::Missing("token_url".to_string()));
        }

        let url = Url::parse(&self.token_url).map_err(|e| {
            ConfigError::InvalidValue(format!("token_url '{}': {}", self.token_url, e))
        })?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::InvalidValue(format!(
                "token_url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        if self.max_assertion_duration.is_zero() {
            return Err(ConfigError::InvalidValue(
                "max_assertion_duration must be > 0".to_string(),
            ));
        }

        if self.access_token_lifetime.is_zero() {
            return Err(ConfigError::InvalidValue(
                "access_token_lifetime must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be parsed or is invalid.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or is invalid.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded JWT bearer configuration");
        Self::from_toml_str(&source)
    }
}
