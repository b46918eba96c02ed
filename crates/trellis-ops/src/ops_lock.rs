//! Operation: resolve from scratch and regenerate Trellis.lock.

use std::path::Path;

use trellis_core::lockfile::Lockfile;

use crate::ops_resolve::{ensure_resolved, resolve_project};
use crate::LOCK_FILE;

/// Re-resolve every dependency, ignoring the current lockfile, and write `Trellis.lock`.
pub fn lock(project_root: &Path, verbose: bool) -> miette::Result<()> {
    let result = resolve_project(project_root, false)?;
    ensure_resolved(&result)?;

    if !result.conflicts.is_empty() && verbose {
        eprint!("{}", result.conflicts);
    }

    let lockfile = Lockfile::generate(result.locked_packages());
    lockfile.write_to(&project_root.join(LOCK_FILE))?;

    eprintln!("Locked {} modules", lockfile.package.len());
    Ok(())
}
