//! Access token issuance.
//!
//! - [`issuer`] - the issuance strategy trait
//! - [`jwt`] - signed JWT access tokens

pub mod issuer;
pub mod jwt;

pub use issuer::AccessTokenIssuer;
pub use jwt::{AccessTokenClaims, BEARER_TOKEN_TYPE, JwtAccessTokenIssuer};
