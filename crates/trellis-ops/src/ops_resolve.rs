//! Operation: resolve the scenario and report the selected graph.

use std::path::Path;

use tracing::debug;
use trellis_core::config::{GlobalConfig, ResolutionConfig};
use trellis_core::lockfile::Lockfile;
use trellis_core::scenario::Scenario;
use trellis_resolver::builder::{self, ResolutionResult};
use trellis_util::errors::TrellisError;

use crate::{LOCK_FILE, MANIFEST_FILE};

/// Options for `trellis resolve`.
#[derive(Debug, Default)]
pub struct ResolveOptions {
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Print the selection reason of every module.
    pub reasons: bool,
    /// Print the version conflict report instead of the tree.
    pub conflicts: bool,
}

/// The scenario's own `[resolution]` section wins over the global one.
pub fn effective_config(global: &GlobalConfig, scenario: &Scenario) -> ResolutionConfig {
    scenario
        .resolution
        .clone()
        .unwrap_or_else(|| global.resolution.clone())
}

/// Load `Trellis.toml` and `Trellis.lock` from `project_root` and resolve.
///
/// `use_lock = false` ignores an existing lockfile.
pub fn resolve_project(project_root: &Path, use_lock: bool) -> miette::Result<ResolutionResult> {
    let scenario = Scenario::from_path(&project_root.join(MANIFEST_FILE))?;
    let config = effective_config(&GlobalConfig::load()?, &scenario);

    let lock_path = project_root.join(LOCK_FILE);
    let lockfile = if use_lock && lock_path.is_file() {
        debug!(path = %lock_path.display(), "using lockfile");
        Some(Lockfile::from_path(&lock_path)?)
    } else {
        None
    };

    let result = builder::resolve(&scenario, lockfile.as_ref(), &config)?;
    debug!(
        selected = result.selections.len(),
        failures = result.failures.len(),
        conflicts = result.conflicts.len(),
        "resolution finished"
    );
    Ok(result)
}

/// Fail when any dependency was left unresolved, listing each one.
pub fn ensure_resolved(result: &ResolutionResult) -> miette::Result<()> {
    if result.failures.is_empty() {
        return Ok(());
    }
    let mut message = format!(
        "{} dependenc{} could not be resolved",
        result.failures.len(),
        if result.failures.len() == 1 { "y" } else { "ies" }
    );
    for failure in &result.failures {
        message.push_str(&format!("\n  {} (from {})", failure.failure, failure.from));
    }
    Err(TrellisError::Resolution { message }.into())
}

/// Render the selection of every module with its reason.
pub fn format_reasons(result: &ResolutionResult) -> String {
    let mut output = String::new();
    for selection in &result.selections {
        output.push_str(&format!(
            "{}:{}\n    {}\n",
            selection.module, selection.version, selection.reason
        ));
    }
    output
}

/// Resolve and print the dependency tree.
pub fn resolve(project_root: &Path, opts: &ResolveOptions) -> miette::Result<()> {
    let result = resolve_project(project_root, true)?;

    if opts.conflicts {
        if result.conflicts.is_empty() {
            println!("No version conflicts.");
        } else {
            print!("{}", result.conflicts);
        }
        return ensure_resolved(&result);
    }

    print!("{}", result.graph.print_tree(opts.depth));
    if opts.reasons {
        println!();
        print!("{}", format_reasons(&result));
    }
    ensure_resolved(&result)
}

/// Explain how `target` ended up in the graph.
pub fn why(project_root: &Path, target: &str) -> miette::Result<()> {
    let result = resolve_project(project_root, true)?;

    let Some(path) = result.graph.find_path(target) else {
        println!("Dependency '{target}' not found in the graph.");
        return Ok(());
    };
    println!("Path to {target}:");
    for (i, node) in path.iter().enumerate() {
        let indent = "  ".repeat(i);
        println!("{indent}{node}");
    }
    if let Some(selection) = path.last().and_then(|node| result.selection(&node.module)) {
        println!("Selected because: {}", selection.reason);
    }
    println!();
    print!("{}", result.graph.print_inverted_tree(target));
    Ok(())
}
