//! Version selectors and the resolved version constraint of a dependency.

use std::fmt;

use serde::{Deserialize, Serialize};
use trellis_util::errors::TrellisError;

use crate::module::RequestedVersion;
use crate::version::{Version, VersionOrder, VersionRange};

/// Publication status of a component, used by `latest.*` selectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Integration,
    #[default]
    Release,
}

impl ComponentStatus {
    /// Whether a component with this status satisfies `latest.<wanted>`.
    pub fn satisfies(self, wanted: ComponentStatus) -> bool {
        match wanted {
            ComponentStatus::Integration => true,
            ComponentStatus::Release => self == ComponentStatus::Release,
        }
    }
}

impl fmt::Display for ComponentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComponentStatus::Integration => f.write_str("integration"),
            ComponentStatus::Release => f.write_str("release"),
        }
    }
}

/// A parsed version selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelector {
    /// `1.2.3`
    Exact(Version),
    /// `[1.0,2.0)`
    Range(VersionRange),
    /// `1.+`, or `+` for any version. Holds the text before the `+`.
    Prefix(String),
    /// `latest.release`, `latest.integration`
    Latest(ComponentStatus),
}

impl VersionSelector {
    pub fn parse(selector: &str) -> Result<Self, TrellisError> {
        let s = selector.trim();
        if s.is_empty() {
            return Err(TrellisError::InvalidSelector {
                selector: selector.to_string(),
                message: "empty version".to_string(),
            });
        }
        if let Some(status) = s.strip_prefix("latest.") {
            return match status {
                "release" => Ok(Self::Latest(ComponentStatus::Release)),
                "integration" => Ok(Self::Latest(ComponentStatus::Integration)),
                other => Err(TrellisError::InvalidSelector {
                    selector: selector.to_string(),
                    message: format!("unknown status '{other}'"),
                }),
            };
        }
        if s.starts_with('[') || s.starts_with('(') {
            return VersionRange::parse(s)
                .map(Self::Range)
                .ok_or_else(|| TrellisError::InvalidSelector {
                    selector: selector.to_string(),
                    message: "malformed version range".to_string(),
                });
        }
        if let Some(prefix) = s.strip_suffix('+') {
            return Ok(Self::Prefix(prefix.to_string()));
        }
        Ok(Self::Exact(Version::new(s)))
    }

    /// Anything but an exact version is dynamic.
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, Self::Exact(_))
    }

    pub fn is_latest(&self) -> bool {
        matches!(self, Self::Latest(_))
    }

    pub fn exact_version(&self) -> Option<&Version> {
        match self {
            Self::Exact(v) => Some(v),
            _ => None,
        }
    }

    /// Whether `version`, published with `status`, satisfies this selector.
    pub fn accept(&self, version: &Version, status: ComponentStatus, order: &dyn VersionOrder) -> bool {
        match self {
            Self::Exact(v) => order.compare(v, version).is_eq(),
            Self::Range(range) => range.contains(version, order),
            Self::Prefix(prefix) => version.as_str().starts_with(prefix.as_str()),
            Self::Latest(wanted) => status.satisfies(*wanted),
        }
    }
}

impl fmt::Display for VersionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(v) => write!(f, "{v}"),
            Self::Range(r) => write!(f, "{r}"),
            Self::Prefix(p) => write!(f, "{p}+"),
            Self::Latest(status) => write!(f, "latest.{status}"),
        }
    }
}

/// The union of every version rejected somewhere in the graph.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionRejects {
    selectors: Vec<VersionSelector>,
}

impl VersionRejects {
    pub fn new(selectors: Vec<VersionSelector>) -> Self {
        Self { selectors }
    }

    pub fn extend<'a>(&mut self, selectors: impl IntoIterator<Item = &'a VersionSelector>) {
        for selector in selectors {
            if !self.selectors.contains(selector) {
                self.selectors.push(selector.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// Status is irrelevant to rejection, so `latest.*` rejects match any release.
    pub fn rejects(&self, version: &Version, order: &dyn VersionOrder) -> bool {
        self.selectors
            .iter()
            .any(|s| s.accept(version, ComponentStatus::Release, order))
    }
}

/// A requested version, parsed into selectors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionConstraint {
    pub required: Option<VersionSelector>,
    pub preferred: Option<VersionSelector>,
    pub strict: bool,
    pub rejects: Vec<VersionSelector>,
}

impl VersionConstraint {
    /// The constraint with no opinion at all, used for versions inherited from an ancestor.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn resolve(requested: &RequestedVersion) -> Result<Self, TrellisError> {
        let required = requested
            .require
            .as_deref()
            .map(VersionSelector::parse)
            .transpose()?;
        let preferred = requested
            .prefer
            .as_deref()
            .map(VersionSelector::parse)
            .transpose()?;
        let rejects = requested
            .reject
            .iter()
            .map(|r| VersionSelector::parse(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            required,
            preferred,
            strict: requested.strictly,
            rejects,
        })
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn required_exact(&self) -> Option<&Version> {
        self.required.as_ref().and_then(VersionSelector::exact_version)
    }

    pub fn preferred_exact(&self) -> Option<&Version> {
        self.preferred.as_ref().and_then(VersionSelector::exact_version)
    }
}
