use std::path::{Path, PathBuf};

use crate::errors::TrellisError;

/// Walk up from `start` looking for a file named `filename`.
/// Returns the path to the directory containing the file, or `None`.
pub fn find_ancestor_with(start: &Path, filename: &str) -> Option<PathBuf> {
    let mut current = start;
    loop {
        let candidate = current.join(filename);
        if candidate.is_file() {
            return Some(current.to_path_buf());
        }
        current = current.parent()?;
    }
}

/// Read a whole file, naming it in the error message on failure.
pub fn read_to_string(path: &Path, what: &str) -> Result<String, TrellisError> {
    std::fs::read_to_string(path).map_err(|e| TrellisError::Generic {
        message: format!("Failed to read {what} {}: {e}", path.display()),
    })
}

/// Write `contents` to `path`, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<(), TrellisError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, contents)?;
    Ok(())
}
