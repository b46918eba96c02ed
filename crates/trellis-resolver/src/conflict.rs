//! Version conflict tracking and reporting.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use trellis_core::module::ModuleKey;
use trellis_core::version::Version;

/// Candidate versions seen per module while selecting.
#[derive(Debug, Default)]
pub struct ConflictTracker {
    candidates: IndexMap<ModuleKey, IndexSet<Version>>,
}

impl ConflictTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note the candidates offered by one selection round for `module`.
    pub fn record<'a>(&mut self, module: &ModuleKey, versions: impl IntoIterator<Item = &'a Version>) {
        let seen = self.candidates.entry(module.clone()).or_default();
        seen.extend(versions.into_iter().cloned());
    }

    /// Whether `module` has already been offered more than one version.
    pub fn has_known_conflict(&self, module: &ModuleKey) -> bool {
        self.candidates.get(module).is_some_and(|v| v.len() > 1)
    }

    /// Build the report against the final selections.
    pub fn report(&self, mut selected: impl FnMut(&ModuleKey) -> Option<Version>) -> ConflictReport {
        let mut report = ConflictReport::new();
        for (module, versions) in &self.candidates {
            if versions.len() < 2 {
                continue;
            }
            let Some(resolved) = selected(module) else {
                continue;
            };
            report.add(VersionConflict {
                module: module.clone(),
                requested: versions.iter().cloned().collect(),
                resolved,
                reason: "conflict resolution".to_string(),
            });
        }
        report
    }
}

/// A report of all version conflicts encountered during resolution.
#[derive(Debug, Default)]
pub struct ConflictReport {
    pub conflicts: Vec<VersionConflict>,
}

/// One module that was offered several versions but ended up with one.
#[derive(Debug, Clone)]
pub struct VersionConflict {
    pub module: ModuleKey,
    pub requested: Vec<Version>,
    pub resolved: Version,
    pub reason: String,
}

impl ConflictReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, conflict: VersionConflict) {
        self.conflicts.push(conflict);
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len()
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.conflicts.is_empty() {
            return write!(f, "No version conflicts.");
        }
        writeln!(f, "Version conflicts ({}):", self.conflicts.len())?;
        for c in &self.conflicts {
            writeln!(f, "  {c}")?;
        }
        Ok(())
    }
}

impl fmt::Display for VersionConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requested: Vec<&str> = self.requested.iter().map(Version::as_str).collect();
        write!(
            f,
            "{} between versions {} resolved to {} ({})",
            self.module,
            requested.join(", "),
            self.resolved,
            self.reason
        )
    }
}
