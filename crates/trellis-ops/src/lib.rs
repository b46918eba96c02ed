pub mod ops_lock;
pub mod ops_resolve;

/// Scenario manifest file name.
pub const MANIFEST_FILE: &str = "Trellis.toml";

/// Lockfile file name.
pub const LOCK_FILE: &str = "Trellis.lock";
