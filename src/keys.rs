//! Signing-key material, retrieval, and resolution.

pub mod fetch;
pub mod resolver;
pub mod store;
