use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Trellis operations.
#[derive(Debug, Error, Diagnostic)]
pub enum TrellisError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed scenario manifest (e.g. Trellis.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Trellis.toml for syntax errors"))]
    Manifest { message: String },

    /// Dependency resolution failed (version conflicts, missing deps, etc.).
    #[error("Dependency resolution failed: {message}")]
    Resolution { message: String },

    /// A requested version could not be turned into a version selector.
    #[error("Invalid version selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    /// The graph builder broke one of the resolver's bookkeeping contracts.
    #[error("Inconsistent resolver state: {message}")]
    #[diagnostic(help("This is a bug in the graph builder, not in your build"))]
    Invariant { message: String },

    /// Two different client module definitions were merged onto one selector.
    #[error("{selector} has more than one client module definitions.")]
    ConflictingClientModule { selector: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type TrellisResult<T> = miette::Result<T>;
