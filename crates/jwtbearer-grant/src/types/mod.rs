//! Domain types shared by the token endpoint.

pub mod client;
pub mod grant_type;

pub use client::{Client, LifespanOverride};
pub use grant_type::{GrantType, JWT_BEARER_GRANT_TYPE, TokenType, UnknownGrantType};
