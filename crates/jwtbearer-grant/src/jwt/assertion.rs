//! Signed JWT assertions.
//!
//! An [`Assertion`] is parsed once without verification so the issuer,
//! subject and key ID can drive key lookup, then verified against each
//! candidate key with [`Assertion::verify`].

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::jwk::Jwk;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};

use super::claims::AssertionClaims;
use super::error::JwtError;

/// A compact-serialized JWS whose header and claims were decoded but whose
/// signature has not been checked yet.
#[derive(Debug, Clone)]
pub struct Assertion {
    raw: String,
    header: Header,
    unverified: AssertionClaims,
}

impl Assertion {
    /// Parses a compact-serialized signed JWT.
    ///
    /// # Warning
    ///
    /// This does NOT verify the signature. Only use the claims returned by
    /// [`Self::unverified_claims`] to decide which key to verify with.
    ///
    /// # Errors
    ///
    /// Returns `Malformed` if the token is not three base64url segments
    /// with a valid JOSE header, or `InvalidClaims` if the payload is not a
    /// JSON claims set.
    pub fn parse(raw: &str) -> Result<Self, JwtError> {
        let parts: Vec<&str> = raw.split('.').collect();
        if parts.len() != 3 {
            return Err(JwtError::malformed(format!(
                "expected 3 segments, found {}",
                parts.len()
            )));
        }
        if parts[2].is_empty() {
            return Err(JwtError::malformed("the assertion is not signed"));
        }

        let header = jsonwebtoken::decode_header(raw)?;

        let payload = URL_SAFE_NO_PAD
            .decode(parts[1])
            .map_err(|_| JwtError::malformed("invalid payload encoding"))?;
        let unverified: AssertionClaims = serde_json::from_slice(&payload)
            .map_err(|e| JwtError::invalid_claims(format!("invalid payload JSON: {e}")))?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            unverified,
        })
    }

    /// The JOSE header.
    #[must_use]
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Key ID from the header, if present and non-empty.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.header.kid.as_deref().filter(|kid| !kid.is_empty())
    }

    /// Signing algorithm named in the header.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// Claims decoded without signature verification.
    #[must_use]
    pub fn unverified_claims(&self) -> &AssertionClaims {
        &self.unverified
    }

    /// Verifies the signature with `jwk` and returns the verified claims.
    ///
    /// Only the signature is checked here. Time-based and audience rules
    /// are left to the claim validator so that each failure gets its own
    /// error.
    ///
    /// # Errors
    ///
    /// Returns `AlgorithmMismatch` if the key is pinned to a different
    /// algorithm, `InvalidKey` if the key cannot be used, and
    /// `InvalidSignature` if the signature does not verify.
    pub fn verify(&self, jwk: &Jwk) -> Result<AssertionClaims, JwtError> {
        if let Some(pinned) = &jwk.common.key_algorithm {
            let expected = algorithm_name(pinned);
            let found = algorithm_name(&self.header.alg);
            if expected != found {
                return Err(JwtError::AlgorithmMismatch { expected, found });
            }
        }

        let key = DecodingKey::from_jwk(jwk)?;

        let mut validation = Validation::new(self.header.alg);
        validation.required_spec_claims.clear();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<AssertionClaims>(&self.raw, &key, &validation)?;
        Ok(data.claims)
    }
}

/// JOSE name of an algorithm (`"RS256"`, `"HS256"`, ...).
fn algorithm_name<T: serde::Serialize>(alg: &T) -> String {
    match serde_json::to_value(alg) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}
