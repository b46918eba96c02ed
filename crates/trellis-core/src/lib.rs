//! Core data types for the Trellis resolver.
//!
//! This crate defines the vocabulary shared by the resolver and the CLI:
//! opaque versions and the injectable version order, version selectors and
//! constraints, module and component identities, the `Trellis.toml`
//! scenario, lockfiles and configuration.
//!
//! This crate is intentionally free of resolution logic.

pub mod config;
pub mod lockfile;
pub mod module;
pub mod scenario;
pub mod selector;
pub mod version;
