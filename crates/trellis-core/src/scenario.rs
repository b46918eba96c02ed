//! The `Trellis.toml` scenario: the requesting project, its in-build
//! projects, and an in-memory repository of published components.

use serde::{Deserialize, Serialize};
use std::path::Path;

use trellis_util::errors::TrellisError;

use crate::config::ResolutionConfig;
use crate::module::{ComponentSelector, ModuleKey, RequestedVersion};
use crate::selector::ComponentStatus;
use crate::version::Version;

/// The parsed representation of a `Trellis.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub project: ProjectMetadata,

    #[serde(default)]
    pub resolution: Option<ResolutionConfig>,

    #[serde(default)]
    pub dependencies: Vec<DependencyDecl>,

    #[serde(default)]
    pub projects: Vec<ProjectDecl>,

    #[serde(default)]
    pub components: Vec<ComponentDecl>,
}

/// Identity of the project being resolved, from `[project]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub group: String,
    pub name: String,
    pub version: Version,
}

impl ProjectMetadata {
    pub fn key(&self) -> ModuleKey {
        ModuleKey::new(self.group.clone(), self.name.clone())
    }
}

/// One dependency declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyDecl {
    pub module: ModuleKey,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub prefer: Option<String>,
    #[serde(default)]
    pub strictly: bool,
    #[serde(default)]
    pub reject: Vec<String>,
    #[serde(default)]
    pub force: bool,
    #[serde(default)]
    pub changing: bool,
    /// Target an in-build project instead of a published module.
    #[serde(default)]
    pub project: bool,
    /// Constraints only shape selection; they never pull a module in.
    #[serde(default)]
    pub constraint: bool,
    #[serde(default, rename = "client-module")]
    pub client_module: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl DependencyDecl {
    pub fn new(module: ModuleKey, version: impl Into<String>) -> Self {
        Self {
            module,
            version: Some(version.into()),
            prefer: None,
            strictly: false,
            reject: Vec::new(),
            force: false,
            changing: false,
            project: false,
            constraint: false,
            client_module: None,
            reason: None,
        }
    }

    pub fn requested(&self) -> RequestedVersion {
        RequestedVersion {
            require: self.version.clone(),
            prefer: self.prefer.clone(),
            strictly: self.strictly,
            reject: self.reject.clone(),
        }
    }

    pub fn selector(&self) -> ComponentSelector {
        if self.project {
            ComponentSelector::Project {
                module: self.module.clone(),
            }
        } else {
            ComponentSelector::module(self.module.clone(), self.requested())
        }
    }
}

/// A project that is part of the build, from `[[projects]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDecl {
    pub module: ModuleKey,
    pub version: Version,
    #[serde(default)]
    pub dependencies: Vec<DependencyDecl>,
    #[serde(default)]
    pub platforms: Vec<ModuleKey>,
}

/// A published component in the in-memory repository, from `[[components]]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDecl {
    pub module: ModuleKey,
    pub version: Version,
    #[serde(default)]
    pub status: ComponentStatus,
    /// Set when a component selection rule rejects this version.
    #[serde(default, rename = "rejected-reason")]
    pub rejected_reason: Option<String>,
    /// Virtual platforms this component belongs to.
    #[serde(default)]
    pub platforms: Vec<ModuleKey>,
    #[serde(default)]
    pub dependencies: Vec<DependencyDecl>,
}

impl Scenario {
    /// Load and parse a `Trellis.toml` file from the given path.
    pub fn from_path(path: &Path) -> miette::Result<Self> {
        let content = trellis_util::fs::read_to_string(path, "manifest")?;
        Self::parse_toml(&content)
    }

    /// Parse a scenario from a TOML string.
    pub fn parse_toml(content: &str) -> miette::Result<Self> {
        let scenario: Scenario = toml::from_str(content).map_err(|e| TrellisError::Manifest {
            message: e.to_string(),
        })?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<(), TrellisError> {
        let all_deps = self
            .dependencies
            .iter()
            .chain(self.projects.iter().flat_map(|p| p.dependencies.iter()))
            .chain(self.components.iter().flat_map(|c| c.dependencies.iter()));
        for dep in all_deps {
            if dep.project {
                if !self.projects.iter().any(|p| p.module == dep.module) {
                    return Err(TrellisError::Manifest {
                        message: format!("dependency on unknown project {}", dep.module),
                    });
                }
            } else if dep.version.is_none() && dep.prefer.is_none() {
                return Err(TrellisError::Manifest {
                    message: format!("dependency on {} has no version", dep.module),
                });
            }
        }
        Ok(())
    }

    pub fn project(&self, module: &ModuleKey) -> Option<&ProjectDecl> {
        self.projects.iter().find(|p| &p.module == module)
    }
}
