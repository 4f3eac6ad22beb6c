//! Token endpoint response.

use serde::Serialize;
use serde_json::{Map, Value};

/// Successful token response (RFC 6749 §5.1).
///
/// # Example Response
///
/// ```json
/// {
///   "access_token": "eyJhbG...",
///   "token_type": "bearer",
///   "expires_in": 3600,
///   "scope": "read write"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AccessResponse {
    /// The issued access token.
    pub access_token: String,

    /// Token type, "bearer" for tokens issued by this grant.
    pub token_type: String,

    /// Access token lifetime in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,

    /// Granted scopes (space-separated).
    #[serde(skip_serializing_if = "String::is_empty")]
    pub scope: String,

    /// Additional response parameters.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AccessResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an additional response parameter.
    pub fn set_extra(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.extra.insert(key.into(), value.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_skips_empty_fields() {
        let response = AccessResponse {
            access_token: "token".to_string(),
            token_type: "bearer".to_string(),
            ..AccessResponse::default()
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["access_token"], "token");
        assert!(json.get("expires_in").is_none());
        assert!(json.get("scope").is_none());
    }

    #[test]
    fn test_extra_parameters_are_flattened() {
        let mut response = AccessResponse::new();
        response.expires_in = Some(3600);
        response.scope = "read".to_string();
        response.set_extra("issued_token_type", "urn:ietf:params:oauth:token-type:jwt");
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["expires_in"], 3600);
        assert_eq!(json["issued_token_type"], "urn:ietf:params:oauth:token-type:jwt");
    }
}
