//! Storage traits for the JWT bearer grant.
//!
//! - Public keys trusted to sign assertions, with their registered scopes
//! - Used JWT IDs for replay prevention
//!
//! # Implementations
//!
//! - `jwtbearer-memory` - concurrent in-memory storage

pub mod jti;
pub mod key;

pub use jti::JtiStorage;
pub use key::PublicKeyStorage;
