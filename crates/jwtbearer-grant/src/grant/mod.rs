//! The JWT bearer grant.
//!
//! - [`key_resolver`] - finds the key an assertion was signed with
//! - [`claims`] - the claim rule set
//! - [`replay`] - single-use JWT IDs
//! - [`scope`] - scope authorization
//! - [`handler`] - the token endpoint handler composing the above

pub mod claims;
pub mod handler;
pub mod key_resolver;
pub mod replay;
pub mod scope;

pub use claims::ClaimValidator;
pub use handler::JwtBearerGrantHandler;
pub use key_resolver::{KeyResolver, VerifiedAssertion};
pub use replay::ReplayGuard;
pub use scope::ScopeAuthorizer;
