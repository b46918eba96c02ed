use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use trellis_util::errors::TrellisError;

/// Global user configuration loaded from `~/.trellis/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolution: ResolutionConfig,
}

/// How competing candidates for one module are settled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictResolution {
    /// The highest version wins.
    #[default]
    Latest,
    /// An in-build project wins over any published version.
    PreferProjects,
}

/// Resolution settings from `[resolution]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default, rename = "conflict-resolution")]
    pub conflict_resolution: ConflictResolution,
    #[serde(default, rename = "fail-on-version-conflict")]
    pub fail_on_version_conflict: bool,
    #[serde(default = "default_max_selection_changes", rename = "max-selection-changes")]
    pub max_selection_changes: u32,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            conflict_resolution: ConflictResolution::default(),
            fail_on_version_conflict: false,
            max_selection_changes: default_max_selection_changes(),
        }
    }
}

fn default_max_selection_changes() -> u32 {
    1000
}

impl GlobalConfig {
    /// Load the global configuration from `~/.trellis/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> miette::Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load the configuration from an explicit path, or return defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> miette::Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| TrellisError::Generic {
            message: format!("Failed to read global config: {e}"),
        })?;
        toml::from_str(&content).map_err(|e| {
            TrellisError::Generic {
                message: format!("Failed to parse global config: {e}"),
            }
            .into()
        })
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the Trellis data directory (`~/.trellis/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".trellis")
}
