//! Core data types for dlindex.
//!
//! This crate defines what a download index is made of: the `Index.toml`
//! manifest, credential bindings, the bucket key layout of release artifacts,
//! release version ordering, the grouped catalog that gets rendered, and
//! pipeline stage definitions.
//!
//! Nothing here is async or touches the network.

pub mod artifact;
pub mod catalog;
pub mod credentials;
pub mod manifest;
pub mod properties;
pub mod stage;
pub mod version;
