//! Id resolution against an in-memory component repository.

use std::collections::HashSet;
use std::rc::Rc;

use tracing::trace;

use trellis_core::module::{ComponentIdentifier, ComponentSelector, ModuleKey};
use trellis_core::scenario::{DependencyDecl, Scenario};
use trellis_core::selector::{ComponentStatus, VersionRejects, VersionSelector};
use trellis_core::version::{Version, VersionOrder};

use crate::dependency::DependencyState;
use crate::result::{ComponentIdResolver, IdResolveResult, RejectedVersion, RejectionKind, ResolveFailure};

/// What the repository knows about one component.
#[derive(Debug, Clone, Copy)]
pub struct ComponentMetadata<'a> {
    pub status: ComponentStatus,
    pub rejected_reason: Option<&'a str>,
    pub dependencies: &'a [DependencyDecl],
    pub platforms: &'a [ModuleKey],
}

pub trait ComponentMetadataSource {
    /// Every published version of `module`, in no particular order.
    fn versions(&self, module: &ModuleKey) -> Vec<Version>;

    /// Versions published by members of the platform `platform`.
    fn platform_versions(&self, platform: &ModuleKey) -> Vec<Version>;

    fn metadata(&self, id: &ComponentIdentifier) -> Option<ComponentMetadata<'_>>;

    /// The in-build project for `module`, if there is one.
    fn project(&self, module: &ModuleKey) -> Option<ComponentIdentifier>;
}

impl ComponentMetadataSource for Scenario {
    fn versions(&self, module: &ModuleKey) -> Vec<Version> {
        self.components
            .iter()
            .filter(|c| &c.module == module)
            .map(|c| c.version.clone())
            .collect()
    }

    fn platform_versions(&self, platform: &ModuleKey) -> Vec<Version> {
        let mut versions: Vec<Version> = Vec::new();
        for c in self.components.iter().filter(|c| c.platforms.contains(platform)) {
            if !versions.contains(&c.version) {
                versions.push(c.version.clone());
            }
        }
        versions
    }

    fn metadata(&self, id: &ComponentIdentifier) -> Option<ComponentMetadata<'_>> {
        match id {
            ComponentIdentifier::Module { module, version } => self
                .components
                .iter()
                .find(|c| &c.module == module && &c.version == version)
                .map(|c| ComponentMetadata {
                    status: c.status,
                    rejected_reason: c.rejected_reason.as_deref(),
                    dependencies: &c.dependencies,
                    platforms: &c.platforms,
                }),
            ComponentIdentifier::Project { module, .. } => self.project(module).map(|p| ComponentMetadata {
                status: ComponentStatus::Integration,
                rejected_reason: None,
                dependencies: &p.dependencies,
                platforms: &p.platforms,
            }),
        }
    }

    fn project(&self, module: &ModuleKey) -> Option<ComponentIdentifier> {
        Scenario::project(self, module).map(|p| ComponentIdentifier::Project {
            module: p.module.clone(),
            version: p.version.clone(),
        })
    }
}

/// Resolves selectors by listing the versions a [`ComponentMetadataSource`] publishes.
pub struct RepositoryResolver<'a, S: ?Sized> {
    source: &'a S,
    order: Rc<dyn VersionOrder>,
    virtual_platforms: HashSet<ModuleKey>,
}

impl<'a, S: ComponentMetadataSource + ?Sized> RepositoryResolver<'a, S> {
    pub fn new(source: &'a S, order: Rc<dyn VersionOrder>) -> Self {
        Self {
            source,
            order,
            virtual_platforms: HashSet::new(),
        }
    }

    /// From now on `platform` publishes every version its members publish.
    pub fn declare_virtual_platform(&mut self, platform: ModuleKey) {
        self.virtual_platforms.insert(platform);
    }

    fn available(&self, module: &ModuleKey) -> Vec<Version> {
        let mut versions = if self.virtual_platforms.contains(module) {
            self.source.platform_versions(module)
        } else {
            self.source.versions(module)
        };
        self.order.sort_descending(&mut versions);
        versions
    }

    fn resolve_module(
        &self,
        requested: &ComponentSelector,
        module: &ModuleKey,
        selector: &VersionSelector,
        rejects: Option<&VersionRejects>,
    ) -> IdResolveResult {
        let order = self.order.as_ref();
        let rejected_by = |v: &Version| rejects.is_some_and(|r| r.rejects(v, order));
        let id_for = |version: &Version| ComponentIdentifier::Module {
            module: module.clone(),
            version: version.clone(),
        };

        if let Some(version) = selector.exact_version() {
            let id = id_for(version);
            if rejected_by(version) {
                return IdResolveResult::rejected(id);
            }
            if let Some(reason) = self.source.metadata(&id).and_then(|m| m.rejected_reason) {
                let rejection = RejectedVersion {
                    version: version.clone(),
                    kind: RejectionKind::ByRule {
                        reason: Some(reason.to_string()),
                    },
                };
                return IdResolveResult::rejected(id).with_rejected_versions(vec![rejection]);
            }
            return IdResolveResult::resolved(id);
        }

        let versions = self.available(module);
        if versions.is_empty() {
            return IdResolveResult::failed(ResolveFailure::new(
                requested.to_string(),
                format!("no versions of {module} are available"),
            ));
        }
        let mut unmatched = Vec::new();
        let mut rejected = Vec::new();
        for version in versions {
            let id = id_for(&version);
            let metadata = self.source.metadata(&id);
            let status = metadata.map_or(ComponentStatus::Release, |m| m.status);
            if !selector.accept(&version, status, order) {
                unmatched.push(version);
                continue;
            }
            if rejected_by(&version) {
                rejected.push(RejectedVersion {
                    version,
                    kind: RejectionKind::BySelector,
                });
                continue;
            }
            if let Some(reason) = metadata.and_then(|m| m.rejected_reason) {
                rejected.push(RejectedVersion {
                    version,
                    kind: RejectionKind::ByRule {
                        reason: Some(reason.to_string()),
                    },
                });
                continue;
            }
            trace!(%requested, %version, "dynamic selector matched");
            return IdResolveResult::resolved(id)
                .with_rejected_versions(rejected)
                .with_unmatched_versions(unmatched);
        }
        IdResolveResult::failed(ResolveFailure::new(
            requested.to_string(),
            format!("no version of {module} matches {selector}"),
        ))
        .with_rejected_versions(rejected)
        .with_unmatched_versions(unmatched)
    }
}

impl<S: ComponentMetadataSource + ?Sized> ComponentIdResolver for RepositoryResolver<'_, S> {
    fn resolve(
        &mut self,
        dependency: &DependencyState,
        selector: Option<&VersionSelector>,
        rejects: Option<&VersionRejects>,
    ) -> IdResolveResult {
        if let Some(failure) = &dependency.failure {
            return IdResolveResult::failed(failure.clone());
        }
        let requested = &dependency.requested;
        match requested {
            ComponentSelector::Project { module } => match self.source.project(module) {
                Some(id) => IdResolveResult::resolved(id),
                None => IdResolveResult::failed(ResolveFailure::new(
                    requested.to_string(),
                    "project is not part of this build",
                )),
            },
            ComponentSelector::Module { module, .. } => {
                let any = VersionSelector::Prefix(String::new());
                self.resolve_module(requested, module, selector.unwrap_or(&any), rejects)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::module::RequestedVersion;
    use trellis_core::version::MavenOrder;

    const REPO: &str = r#"
[project]
group = "com.example"
name = "app"
version = "1.0"

[[projects]]
module = "com.example:lib"
version = "0.1"

[[components]]
module = "org.a:core"
version = "1.0"

[[components]]
module = "org.a:core"
version = "1.1"
rejected-reason = "broken build"

[[components]]
module = "org.a:core"
version = "1.2"

[[components]]
module = "org.a:core"
version = "2.0-rc1"
status = "integration"

[[components]]
module = "org.a:core"
version = "2.0"
platforms = ["org.a:bom"]
"#;

    fn scenario() -> Scenario {
        Scenario::parse_toml(REPO).unwrap()
    }

    fn dep(version: &str) -> DependencyState {
        DependencyState::new(ComponentSelector::module(
            ModuleKey::new("org.a", "core"),
            RequestedVersion::require(version),
        ))
    }

    fn resolve(source: &Scenario, selector: &str, rejects: &[&str]) -> IdResolveResult {
        let mut resolver = RepositoryResolver::new(source, Rc::new(MavenOrder));
        let selector = VersionSelector::parse(selector).unwrap();
        let rejects = VersionRejects::new(rejects.iter().map(|r| VersionSelector::parse(r).unwrap()).collect());
        resolver.resolve(&dep(&selector.to_string()), Some(&selector), Some(&rejects))
    }

    #[test]
    fn range_skips_rejected_and_unmatched() {
        let s = scenario();
        let result = resolve(&s, "[1.0,1.9]", &["1.2"]);
        assert_eq!(result.version(), Some(&Version::new("1.0")));
        let unmatched: Vec<&str> = result.unmatched_versions().iter().map(Version::as_str).collect();
        assert_eq!(unmatched, vec!["2.0", "2.0-rc1"]);
        let kinds: Vec<_> = result.rejected_versions().iter().map(|r| r.kind.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                RejectionKind::BySelector,
                RejectionKind::ByRule {
                    reason: Some("broken build".to_string())
                }
            ]
        );
    }

    #[test]
    fn latest_release_ignores_integration_builds() {
        let s = scenario();
        assert_eq!(resolve(&s, "latest.release", &[]).version(), Some(&Version::new("2.0")));
        assert_eq!(
            resolve(&s, "latest.release", &["2.0"]).version(),
            Some(&Version::new("1.2"))
        );
        assert_eq!(
            resolve(&s, "latest.integration", &["2.0"]).version(),
            Some(&Version::new("2.0-rc1"))
        );
    }

    #[test]
    fn exact_versions_resolve_directly() {
        let s = scenario();
        let result = resolve(&s, "9.9", &[]);
        assert_eq!(result.version(), Some(&Version::new("9.9")));
        assert!(!result.is_rejected());

        assert!(resolve(&s, "1.0", &["1.0"]).is_rejected());
        let by_rule = resolve(&s, "1.1", &[]);
        assert!(by_rule.is_rejected());
        assert_eq!(by_rule.rejected_versions().len(), 1);
    }

    #[test]
    fn nothing_acceptable_is_a_failure() {
        let s = scenario();
        let result = resolve(&s, "3.+", &[]);
        assert!(result.is_failed());
        assert_eq!(result.unmatched_versions().len(), 5);
        let failure = result.failure().unwrap();
        assert_eq!(failure.message, "no version of org.a:core matches 3.+");
    }

    #[test]
    fn pre_attached_failure_short_circuits() {
        let s = scenario();
        let mut resolver = RepositoryResolver::new(&s, Rc::new(MavenOrder));
        let mut d = dep("1.0");
        d.failure = Some(ResolveFailure::new("org.a:core:1.0", "offline"));
        let result = resolver.resolve(&d, None, None);
        assert_eq!(result.failure().map(|f| f.message.as_str()), Some("offline"));
    }

    #[test]
    fn projects_and_platforms() {
        let s = scenario();
        let mut resolver = RepositoryResolver::new(&s, Rc::new(MavenOrder));
        let project = DependencyState::new(ComponentSelector::Project {
            module: ModuleKey::new("com.example", "lib"),
        });
        let result = resolver.resolve(&project, None, None);
        assert!(result.id().is_some_and(ComponentIdentifier::is_project));

        let bom = DependencyState::new(ComponentSelector::module(
            ModuleKey::new("org.a", "bom"),
            RequestedVersion::require("+"),
        ));
        let any = VersionSelector::parse("+").unwrap();
        assert!(resolver.resolve(&bom, Some(&any), None).is_failed());
        resolver.declare_virtual_platform(ModuleKey::new("org.a", "bom"));
        assert_eq!(
            resolver.resolve(&bom, Some(&any), None).version(),
            Some(&Version::new("2.0"))
        );
    }
}
