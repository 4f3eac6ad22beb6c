//! Assertion claims (RFC 7523 §3).

use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Registered claims of a JWT bearer assertion.
///
/// Every claim is optional at the parsing level; the claim validator decides
/// which ones are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionClaims {
    /// Issuer of the assertion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Principal the assertion is about.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Intended recipients. Can be a single string or an array of strings.
    #[serde(default, skip_serializing_if = "Audience::is_empty")]
    pub aud: Audience,

    /// Expiration time as Unix timestamp.
    #[serde(default, with = "numeric_date", skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Not-before time as Unix timestamp.
    #[serde(default, with = "numeric_date", skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Issued-at time as Unix timestamp.
    #[serde(default, with = "numeric_date", skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// JWT ID, used for replay detection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl AssertionClaims {
    /// Issuer, or the empty string if absent.
    #[must_use]
    pub fn issuer(&self) -> &str {
        self.iss.as_deref().unwrap_or_default()
    }

    /// Subject, or the empty string if absent.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.sub.as_deref().unwrap_or_default()
    }

    /// JWT ID, or the empty string if absent.
    #[must_use]
    pub fn jwt_id(&self) -> &str {
        self.jti.as_deref().unwrap_or_default()
    }

    /// Expiration time, if present and representable.
    #[must_use]
    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.exp.and_then(to_datetime)
    }
}

fn to_datetime(timestamp: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(timestamp).ok()
}

/// The `aud` claim.
///
/// Serialized as a plain string when it holds exactly one value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Audience(Vec<String>);

impl Audience {
    /// Creates an audience from a list of values.
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// Checks if the audience contains the specified value.
    #[must_use]
    pub fn contains(&self, value: &str) -> bool {
        self.0.iter().any(|s| s == value)
    }

    /// Returns `true` if the audience has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the values in claim order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the values as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for Audience {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Audience claim can be a single string or an array of strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrArray {
    String(String),
    Array(Vec<String>),
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<StringOrArray>::deserialize(deserializer)? {
            None => Self::default(),
            Some(StringOrArray::String(s)) if s.is_empty() => Self::default(),
            Some(StringOrArray::String(s)) => Self(vec![s]),
            Some(StringOrArray::Array(values)) => Self(values),
        })
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            values => values.serialize(serializer),
        }
    }
}

/// NumericDate values (RFC 7519 §2); fractional seconds are truncated.
mod numeric_date {
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Numeric {
        Int(i64),
        Float(f64),
    }

    pub fn serialize<S: Serializer>(value: &Option<i64>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(v) => serializer.serialize_i64(*v),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
        match Option::<Numeric>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Numeric::Int(v)) => Ok(Some(v)),
            Some(Numeric::Float(v)) if v.is_finite() => Ok(Some(v.trunc() as i64)),
            Some(Numeric::Float(_)) => Err(serde::de::Error::custom("NumericDate must be finite")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_contains() {
        let aud: Audience = ["https://as.example/token", "https://api.example"]
            .into_iter()
            .collect();
        assert!(aud.contains("https://as.example/token"));
        assert!(aud.contains("https://api.example"));
        assert!(!aud.contains("https://other.example/token"));
    }

    #[test]
    fn test_audience_string_or_array() {
        let claims: AssertionClaims =
            serde_json::from_str(r#"{"aud":"https://as.example/token"}"#).unwrap();
        assert_eq!(claims.aud.as_slice(), ["https://as.example/token"]);

        let claims: AssertionClaims =
            serde_json::from_str(r#"{"aud":["a","b"]}"#).unwrap();
        assert_eq!(claims.aud.len(), 2);

        let claims: AssertionClaims = serde_json::from_str(r#"{"aud":""}"#).unwrap();
        assert!(claims.aud.is_empty());

        let claims: AssertionClaims = serde_json::from_str(r#"{}"#).unwrap();
        assert!(claims.aud.is_empty());
    }

    #[test]
    fn test_audience_serializes_single_value_as_string() {
        let aud: Audience = ["only"].into_iter().collect();
        assert_eq!(serde_json::to_value(&aud).unwrap(), serde_json::json!("only"));

        let aud: Audience = ["a", "b"].into_iter().collect();
        assert_eq!(serde_json::to_value(&aud).unwrap(), serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_numeric_dates() {
        let claims: AssertionClaims =
            serde_json::from_str(r#"{"exp":1700000000,"nbf":1699999999.75,"iat":null}"#).unwrap();
        assert_eq!(claims.exp, Some(1_700_000_000));
        assert_eq!(claims.nbf, Some(1_699_999_999));
        assert_eq!(claims.iat, None);
        assert_eq!(
            claims.expires_at().map(OffsetDateTime::unix_timestamp),
            Some(1_700_000_000)
        );

        assert!(serde_json::from_str::<AssertionClaims>(r#"{"exp":"soon"}"#).is_err());
    }

    #[test]
    fn test_missing_claims_are_empty() {
        let claims = AssertionClaims::default();
        assert_eq!(claims.issuer(), "");
        assert_eq!(claims.subject(), "");
        assert_eq!(claims.jwt_id(), "");
        assert!(claims.expires_at().is_none());
    }
}
