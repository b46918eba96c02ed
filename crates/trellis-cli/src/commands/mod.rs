//! Command dispatch and handler modules.

mod lock;
mod resolve;
mod why;

use std::path::PathBuf;

use miette::Result;
use trellis_ops::MANIFEST_FILE;
use trellis_util::errors::TrellisError;
use trellis_util::fs::find_ancestor_with;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Resolve {
            depth,
            reasons,
            conflicts,
        } => resolve::exec(depth, reasons, conflicts),
        Command::Why { module } => why::exec(&module),
        Command::Lock => lock::exec(cli.verbose),
    }
}

/// The nearest directory, from the current one upwards, holding a `Trellis.toml`.
fn project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(TrellisError::Io)?;
    find_ancestor_with(&cwd, MANIFEST_FILE).ok_or_else(|| {
        TrellisError::Manifest {
            message: format!("No {MANIFEST_FILE} found in {} or any parent", cwd.display()),
        }
        .into()
    })
}
