//! CLI argument definitions for Trellis.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "trellis",
    version,
    about = "Resolve a dependency scenario the way a Gradle-style engine would",
    long_about = "Trellis reads a Trellis.toml scenario (a project, its dependencies and an \
                  in-memory repository), resolves it with forces, rejects, strict constraints \
                  and virtual platform alignment, and explains the result."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the scenario and print the dependency tree
    Resolve {
        /// Maximum depth
        #[arg(long)]
        depth: Option<usize>,
        /// Print why each module was selected
        #[arg(long)]
        reasons: bool,
        /// Print version conflicts instead of the tree
        #[arg(long)]
        conflicts: bool,
    },

    /// Explain why a module is in the graph
    Why {
        /// Module as group:name, or just the name
        module: String,
    },

    /// Resolve from scratch and write Trellis.lock
    Lock,
}

pub fn parse() -> Cli {
    Cli::parse()
}
