use std::fmt;

use serde::{Deserialize, Serialize};

use crate::version::Version;

/// A module identity, `group:name`, without any version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleKey {
    pub group: String,
    pub name: String,
}

impl ModuleKey {
    pub fn new(group: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    /// Parse `"group:name"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, name) = s.split_once(':')?;
        if group.is_empty() || name.is_empty() || name.contains(':') {
            return None;
        }
        Some(Self::new(group, name))
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.name)
    }
}

impl TryFrom<String> for ModuleKey {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("expected 'group:name', got '{value}'"))
    }
}

impl From<ModuleKey> for String {
    fn from(key: ModuleKey) -> Self {
        key.to_string()
    }
}

/// The version part of a dependency declaration, before parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RequestedVersion {
    pub require: Option<String>,
    pub prefer: Option<String>,
    pub strictly: bool,
    pub reject: Vec<String>,
}

impl RequestedVersion {
    pub fn require(version: impl Into<String>) -> Self {
        Self {
            require: Some(version.into()),
            ..Self::default()
        }
    }

    pub fn strictly(version: impl Into<String>) -> Self {
        Self {
            require: Some(version.into()),
            strictly: true,
            ..Self::default()
        }
    }
}

impl fmt::Display for RequestedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.require, &self.prefer) {
            (Some(r), _) if self.strictly => write!(f, "{{strictly {r}}}"),
            (Some(r), None) => f.write_str(r),
            (Some(r), Some(p)) => write!(f, "{{require {r}; prefer {p}}}"),
            (None, Some(p)) => write!(f, "{{prefer {p}}}"),
            (None, None) => Ok(()),
        }
    }
}

/// What an edge asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentSelector {
    Module {
        module: ModuleKey,
        version: RequestedVersion,
    },
    /// A project that is part of the current build.
    Project { module: ModuleKey },
}

impl ComponentSelector {
    pub fn module(module: ModuleKey, version: RequestedVersion) -> Self {
        Self::Module { module, version }
    }

    pub fn target(&self) -> &ModuleKey {
        match self {
            Self::Module { module, .. } | Self::Project { module } => module,
        }
    }

    pub fn is_project(&self) -> bool {
        matches!(self, Self::Project { .. })
    }
}

impl fmt::Display for ComponentSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { module, version } => {
                let v = version.to_string();
                if v.is_empty() {
                    write!(f, "{module}")
                } else {
                    write!(f, "{module}:{v}")
                }
            }
            Self::Project { module } => write!(f, "project {module}"),
        }
    }
}

/// A concrete component a selector resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ComponentIdentifier {
    Module { module: ModuleKey, version: Version },
    Project { module: ModuleKey, version: Version },
}

impl ComponentIdentifier {
    pub fn module(&self) -> &ModuleKey {
        match self {
            Self::Module { module, .. } | Self::Project { module, .. } => module,
        }
    }

    pub fn version(&self) -> &Version {
        match self {
            Self::Module { version, .. } | Self::Project { version, .. } => version,
        }
    }

    pub fn is_project(&self) -> bool {
        matches!(self, Self::Project { .. })
    }
}

impl fmt::Display for ComponentIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module { module, version } => write!(f, "{module}:{version}"),
            Self::Project { module, .. } => write!(f, "project {module}"),
        }
    }
}
