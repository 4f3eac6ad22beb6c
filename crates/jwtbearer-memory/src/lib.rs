//! In-memory storage for the JWT bearer grant.
//!
//! This crate provides concurrent in-memory implementations of the storage
//! traits from `jwtbearer-grant`, built on `DashMap`:
//!
//! - [`InMemoryKeyStorage`] - trusted public keys and their scopes
//! - [`InMemoryJtiStorage`] - used JWT IDs with atomic check-and-mark
//! - [`KeyRegistry`] - JSON documents listing trusted keys
//!
//! # Example
//!
//! ```ignore
//! use jwtbearer_memory::{InMemoryJtiStorage, KeyRegistry};
//!
//! let keys = KeyRegistry::load("keys.json")?.into_storage();
//! let jtis = InMemoryJtiStorage::new();
//! ```

pub mod jti;
pub mod keys;
pub mod registry;

pub use jti::InMemoryJtiStorage;
pub use keys::{InMemoryKeyStorage, KeyRecord};
pub use registry::{KeyRegistry, RegistryEntry, RegistryError};
