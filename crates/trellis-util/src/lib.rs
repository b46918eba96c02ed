//! Shared utilities for Trellis.
//!
//! This crate provides cross-cutting concerns used by the other Trellis
//! crates: the unified error type and small filesystem helpers.

pub mod errors;
pub mod fs;
