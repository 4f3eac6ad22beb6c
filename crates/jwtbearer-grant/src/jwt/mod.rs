//! JWT bearer assertions.
//!
//! Signature math is delegated to `jsonwebtoken`; this module adds the
//! two-pass parse (unverified, then verified against a JWK) the grant needs
//! for key discovery.

mod assertion;
mod claims;
mod error;

pub use assertion::Assertion;
pub use claims::{AssertionClaims, Audience};
pub use error::JwtError;
