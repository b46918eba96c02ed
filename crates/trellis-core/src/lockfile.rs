use serde::{Deserialize, Serialize};
use std::path::Path;

use trellis_util::errors::TrellisError;

use crate::module::ModuleKey;
use crate::version::Version;

/// Deterministic lockfile recording the version selected for every module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub package: Vec<LockedPackage>,
}

/// A single locked module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedPackage {
    pub module: ModuleKey,
    pub version: Version,
}

impl Lockfile {
    /// Build a lockfile from selections, sorted by module for stable output.
    pub fn generate(mut package: Vec<LockedPackage>) -> Self {
        package.sort_by(|a, b| a.module.cmp(&b.module));
        package.dedup_by(|a, b| a.module == b.module);
        Self { package }
    }

    /// Load and parse a `Trellis.lock` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = trellis_util::fs::read_to_string(path, "lockfile")?;
        Self::parse_toml(&content)
    }

    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        toml::from_str(content).map_err(|e| {
            TrellisError::Generic {
                message: format!("Failed to parse lockfile: {e}"),
            }
            .into()
        })
    }

    /// Serialize the lockfile to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Write the lockfile to `path`.
    pub fn write_to(&self, path: &Path) -> miette::Result<()> {
        let content = self.to_string_pretty().map_err(|e| TrellisError::Generic {
            message: format!("Failed to serialize lockfile: {e}"),
        })?;
        trellis_util::fs::write_string(path, &content)?;
        Ok(())
    }

    pub fn locked_version(&self, module: &ModuleKey) -> Option<&Version> {
        self.package
            .iter()
            .find(|p| &p.module == module)
            .map(|p| &p.version)
    }
}
