//! Dependency graph resolution: selector state and ordering, module
//! selection with forces, rejects and strict constraints, virtual platform
//! alignment, and conflict reporting.

pub mod builder;
pub mod conflict;
pub mod dependency;
pub mod graph;
pub mod latch;
pub mod module_selectors;
pub mod platform;
pub mod reason;
pub mod repository;
pub mod result;
pub mod selector_state;
pub mod state;

pub use builder::{resolve, ResolutionResult};
