//! Resolution state of one dependency selector.
//!
//! A selector is shared by every edge that states the same requirement. It
//! caches the id resolved for the required and preferred halves of its
//! version constraint, and drops that cache whenever the requirement gains
//! force or lock status.

use std::fmt;
use std::rc::Rc;

use trellis_core::module::ComponentSelector;
use trellis_core::selector::{VersionConstraint, VersionRejects, VersionSelector};
use trellis_core::version::VersionOrder;
use trellis_util::errors::TrellisError;

use crate::dependency::{ClientModule, DependencyState};
use crate::latch::Latch;
use crate::module_selectors::ResolvableSelector;
use crate::reason::{plural_ending, SelectionCause, SelectionDescriptor, SelectionReason};
use crate::result::{ComponentIdResolver, IdResolveResult, RejectionKind, ResolveFailure};
use crate::state::{ModuleId, ResolveOptimizations, SelectorId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorStatus {
    Unresolved,
    Resolved,
    /// Sticky until the selector is released by its last edge.
    Failed(ResolveFailure),
}

#[derive(Debug)]
pub struct SelectorState {
    id: SelectorId,
    dependency: Rc<DependencyState>,
    constraint: Option<VersionConstraint>,
    /// Set when the requested version could not be parsed.
    constraint_failure: Option<ResolveFailure>,
    dependency_reasons: Vec<SelectionDescriptor>,
    /// The module this selector belongs to while in use.
    requested_module: ModuleId,
    target: ModuleId,
    is_project: bool,
    require_result: Option<Rc<IdResolveResult>>,
    prefer_result: Option<Rc<IdResolveResult>>,
    status: SelectorStatus,
    forced: Latch,
    soft_forced: Latch,
    from_lock: Latch,
    changing: Latch,
    reusable: bool,
    marked_reusable_already: Latch,
    client_module: Option<ClientModule>,
    use_count: usize,
}

impl SelectorState {
    pub fn new(
        id: SelectorId,
        dependency: Rc<DependencyState>,
        target: ModuleId,
        version_by_ancestor: bool,
        optimizations: &mut ResolveOptimizations,
    ) -> Result<Self, TrellisError> {
        let (constraint, constraint_failure) = match &dependency.requested {
            _ if version_by_ancestor => (Some(VersionConstraint::empty()), None),
            ComponentSelector::Module { version, .. } => match VersionConstraint::resolve(version) {
                Ok(c) => (Some(c), None),
                Err(e) => (
                    None,
                    Some(ResolveFailure::new(dependency.requested.to_string(), e.to_string())),
                ),
            },
            ComponentSelector::Project { .. } => (None, None),
        };
        let mut dependency_reasons = Vec::new();
        if version_by_ancestor {
            dependency_reasons.push(SelectionDescriptor::new(SelectionCause::ByAncestor));
        }
        let mut state = Self {
            id,
            is_project: dependency.requested.is_project(),
            dependency: Rc::clone(&dependency),
            constraint,
            constraint_failure,
            dependency_reasons,
            requested_module: target,
            target,
            require_result: None,
            prefer_result: None,
            status: SelectorStatus::Unresolved,
            forced: Latch::new(),
            soft_forced: Latch::new(),
            from_lock: Latch::new(),
            changing: Latch::new(),
            reusable: false,
            marked_reusable_already: Latch::new(),
            client_module: None,
            use_count: 0,
        };
        state.merge(&dependency, optimizations)?;
        Ok(state)
    }

    pub fn id(&self) -> SelectorId {
        self.id
    }

    pub fn dependency(&self) -> &Rc<DependencyState> {
        &self.dependency
    }

    pub fn requested(&self) -> &ComponentSelector {
        &self.dependency.requested
    }

    pub fn requested_module(&self) -> ModuleId {
        self.requested_module
    }

    /// The module whose selection this selector follows. Differs from the
    /// requested module once the selection is pinned elsewhere.
    pub fn target_module(&self) -> ModuleId {
        self.target
    }

    pub fn status(&self) -> &SelectorStatus {
        &self.status
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self.status, SelectorStatus::Unresolved)
    }

    pub fn failure(&self) -> Option<&ResolveFailure> {
        match &self.status {
            SelectorStatus::Failed(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_soft_force(&self) -> bool {
        self.soft_forced.is_set()
    }

    pub fn is_changing(&self) -> bool {
        self.changing.is_set()
    }

    pub fn client_module(&self) -> Option<&ClientModule> {
        self.client_module.as_ref()
    }

    pub fn use_count(&self) -> usize {
        self.use_count
    }

    /// Forced, or carrying a strict version constraint.
    pub fn has_strong_opinion(&self) -> bool {
        self.forced.is_set() || self.constraint.as_ref().is_some_and(VersionConstraint::is_strict)
    }

    pub fn require_result(&self) -> Option<&Rc<IdResolveResult>> {
        self.require_result.as_ref()
    }

    pub fn prefer_result(&self) -> Option<&Rc<IdResolveResult>> {
        self.prefer_result.as_ref()
    }

    /// Returns `true` on the 0 to 1 transition, when the selector must join its module.
    pub(crate) fn increment_use(&mut self) -> bool {
        self.use_count += 1;
        self.use_count == 1
    }

    /// Returns `true` on the 1 to 0 transition, when the selector must leave its module.
    pub(crate) fn decrement_use(&mut self) -> Result<bool, TrellisError> {
        if self.use_count == 0 {
            return Err(TrellisError::Invariant {
                message: format!("selector {self} released more often than it was used"),
            });
        }
        self.use_count -= 1;
        Ok(self.use_count == 0)
    }

    /// Drop cached results after the last edge went away.
    pub(crate) fn mark_unresolved(&mut self) {
        self.status = SelectorStatus::Unresolved;
        self.require_result = None;
        self.prefer_result = None;
    }

    /// Resolve the required half of the constraint, reusing the cached id
    /// unless `rejects` now refuses it.
    pub fn resolve(
        &mut self,
        rejects: Option<&VersionRejects>,
        resolver: &mut dyn ComponentIdResolver,
        order: &dyn VersionOrder,
    ) -> Rc<IdResolveResult> {
        let selector = self.constraint.as_ref().and_then(|c| c.required.clone());
        let previous = self.require_result.take();
        let result = self.resolve_half(selector.as_ref(), rejects, previous, resolver, order);
        self.require_result = Some(Rc::clone(&result));
        result
    }

    /// Resolve the preferred half. `None` when there is no preference.
    pub fn resolve_prefer(
        &mut self,
        rejects: Option<&VersionRejects>,
        resolver: &mut dyn ComponentIdResolver,
        order: &dyn VersionOrder,
    ) -> Option<Rc<IdResolveResult>> {
        let selector = self.constraint.as_ref().and_then(|c| c.preferred.clone())?;
        let previous = self.prefer_result.take();
        let result = self.resolve_half(Some(&selector), rejects, previous, resolver, order);
        self.prefer_result = Some(Rc::clone(&result));
        Some(result)
    }

    fn resolve_half(
        &mut self,
        selector: Option<&VersionSelector>,
        rejects: Option<&VersionRejects>,
        previous: Option<Rc<IdResolveResult>>,
        resolver: &mut dyn ComponentIdResolver,
        order: &dyn VersionOrder,
    ) -> Rc<IdResolveResult> {
        self.reusable = false;
        if let Some(previous) = previous {
            if !requires_resolve(&previous, rejects, order) {
                self.record(&previous);
                return previous;
            }
        }
        let pre_failure = self.dependency.failure.clone().or_else(|| self.constraint_failure.clone());
        let result = match pre_failure {
            Some(failure) => IdResolveResult::failed(failure),
            None => resolver.resolve(&self.dependency, selector, rejects),
        };
        let result = Rc::new(result);
        self.record(&result);
        result
    }

    fn record(&mut self, result: &IdResolveResult) {
        if let Some(failure) = result.failure() {
            self.status = SelectorStatus::Failed(failure.clone());
        } else if self.status == SelectorStatus::Unresolved {
            self.status = SelectorStatus::Resolved;
        }
    }

    /// Offer this selector for reuse. Returns `true` when the caller may
    /// treat it as already counted this round.
    pub fn mark_for_reuse(&mut self) -> bool {
        if !self.is_resolved() {
            return true;
        }
        self.reusable = true;
        !self.marked_reusable_already.set()
    }

    pub fn can_resolve(&self) -> bool {
        self.reusable || !self.is_resolved()
    }

    /// Pin this selector to a selection made elsewhere, retargeting it at the
    /// module that owns it.
    pub fn override_selection(&mut self, module: ModuleId) {
        if self.failure().is_none() {
            self.status = SelectorStatus::Resolved;
        }
        self.reusable = false;
        self.target = module;
    }

    /// Merge a newer edge's statement of the same requirement.
    pub fn update(
        &mut self,
        dependency: Rc<DependencyState>,
        optimizations: &mut ResolveOptimizations,
    ) -> Result<(), TrellisError> {
        if Rc::ptr_eq(&dependency, &self.dependency) {
            return Ok(());
        }
        self.merge(&dependency, optimizations)?;
        self.dependency = dependency;
        Ok(())
    }

    fn merge(
        &mut self,
        dependency: &DependencyState,
        optimizations: &mut ResolveOptimizations,
    ) -> Result<(), TrellisError> {
        if dependency.forced && self.forced.set() {
            if dependency.lenient_platform {
                self.soft_forced.set();
                optimizations.declare_forced_platform_in_use();
            }
            self.invalidate();
        }
        if dependency.from_lock && self.from_lock.set() {
            self.invalidate();
        }
        dependency.add_selection_reasons(&mut self.dependency_reasons);
        self.track_client_module(dependency)?;
        if dependency.changing {
            self.changing.set();
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        if self.failure().is_none() {
            self.mark_unresolved();
        }
    }

    fn track_client_module(&mut self, dependency: &DependencyState) -> Result<(), TrellisError> {
        let Some(next) = &dependency.client_module else {
            return Ok(());
        };
        match &self.client_module {
            None => self.client_module = Some(next.clone()),
            Some(current) if current != next => {
                return Err(TrellisError::ConflictingClientModule {
                    selector: dependency.requested.to_string(),
                })
            }
            Some(_) => {}
        }
        Ok(())
    }

    pub fn selection_reason(&self) -> SelectionReason {
        SelectionReason::of(&self.dependency_reasons)
    }

    /// Add this selector's causes, plus any rejections its results recorded.
    ///
    /// The preferred result wins over the required one. Only requested and
    /// constraint causes carry the rejected or unmatched versions.
    pub fn add_reasons_for_selector(&self, reason: &mut SelectionReason) {
        let result = self.prefer_result.as_ref().or(self.require_result.as_ref());
        let mut by_selector = Vec::new();
        if let Some(result) = result {
            for rejected in result.rejected_versions() {
                match &rejected.kind {
                    RejectionKind::BySelector => by_selector.push(&rejected.version),
                    RejectionKind::ByRule { reason: rule } => {
                        let mut text = format!("{} by rule", rejected.version);
                        if let Some(rule) = rule {
                            text.push_str(&format!(" because {rule}"));
                        }
                        reason.add_cause(
                            SelectionDescriptor::new(SelectionCause::Rejection).with_description(text),
                        );
                    }
                    RejectionKind::ByAttributes { description } => {
                        reason.add_cause(
                            SelectionDescriptor::new(SelectionCause::Rejection)
                                .with_description(format!("version {}: {description}", rejected.version)),
                        );
                    }
                }
            }
        }
        let unmatched = result.map(|r| r.unmatched_versions()).unwrap_or_default();

        for descriptor in &self.dependency_reasons {
            let decorated = matches!(descriptor.cause, SelectionCause::Requested | SelectionCause::Constraint);
            if decorated && !by_selector.is_empty() {
                reason.add_cause(with_detail(
                    descriptor,
                    format!("rejected version{} {}", plural_ending(&by_selector), join(&by_selector)),
                ));
            } else if decorated && !unmatched.is_empty() {
                reason.add_cause(with_detail(
                    descriptor,
                    format!("didn't match version{} {}", plural_ending(unmatched), join(unmatched)),
                ));
            } else {
                reason.add_cause(descriptor.clone());
            }
        }
    }
}

/// Whether a fresh resolution is needed given the previous result.
fn requires_resolve(previous: &IdResolveResult, rejects: Option<&VersionRejects>, order: &dyn VersionOrder) -> bool {
    if previous.is_failed() || previous.is_rejected() {
        return false;
    }
    match (rejects, previous.version()) {
        (Some(rejects), Some(version)) => rejects.rejects(version, order),
        _ => false,
    }
}

fn with_detail(descriptor: &SelectionDescriptor, detail: String) -> SelectionDescriptor {
    if descriptor.has_custom_description() {
        descriptor.with_description(format!("{detail} because {}", descriptor.description()))
    } else {
        descriptor.with_description(detail)
    }
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl ResolvableSelector for SelectorState {
    fn is_project(&self) -> bool {
        self.is_project
    }

    fn is_from_lock(&self) -> bool {
        self.from_lock.is_set()
    }

    fn is_force(&self) -> bool {
        self.forced.is_set()
    }

    fn version_constraint(&self) -> Option<&VersionConstraint> {
        self.constraint.as_ref()
    }
}

impl fmt::Display for SelectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dependency.requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::module::{ComponentIdentifier, ModuleKey, RequestedVersion};
    use trellis_core::version::{MavenOrder, Version};

    use crate::result::RejectedVersion;

    /// Hands out queued results and counts calls.
    #[derive(Default)]
    struct Scripted {
        calls: usize,
        results: Vec<IdResolveResult>,
    }

    impl ComponentIdResolver for Scripted {
        fn resolve(
            &mut self,
            dependency: &DependencyState,
            _selector: Option<&VersionSelector>,
            _rejects: Option<&VersionRejects>,
        ) -> IdResolveResult {
            self.calls += 1;
            if self.results.is_empty() {
                IdResolveResult::failed(ResolveFailure::new(dependency.requested.to_string(), "exhausted"))
            } else {
                self.results.remove(0)
            }
        }
    }

    fn id(version: &str) -> ComponentIdentifier {
        ComponentIdentifier::Module {
            module: ModuleKey::new("org.a", "lib"),
            version: Version::new(version),
        }
    }

    fn dep(requested: RequestedVersion) -> DependencyState {
        DependencyState::new(ComponentSelector::module(ModuleKey::new("org.a", "lib"), requested))
    }

    fn selector(dependency: DependencyState) -> SelectorState {
        SelectorState::new(
            SelectorId(0),
            Rc::new(dependency),
            ModuleId(0),
            false,
            &mut ResolveOptimizations::default(),
        )
        .unwrap()
    }

    fn rejects(versions: &[&str]) -> VersionRejects {
        VersionRejects::new(
            versions
                .iter()
                .map(|v| VersionSelector::Exact(Version::new(*v)))
                .collect(),
        )
    }

    #[test]
    fn cached_result_is_reused_while_not_rejected() {
        let mut resolver = Scripted {
            results: vec![IdResolveResult::resolved(id("1.2")), IdResolveResult::resolved(id("1.1"))],
            ..Scripted::default()
        };
        let mut s = selector(dep(RequestedVersion::require("[1.0,2.0)")));
        let first = s.resolve(None, &mut resolver, &MavenOrder);
        let unrelated = rejects(&["0.9"]);
        let second = s.resolve(Some(&unrelated), &mut resolver, &MavenOrder);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(resolver.calls, 1);

        let covering = rejects(&["0.9", "1.2"]);
        let third = s.resolve(Some(&covering), &mut resolver, &MavenOrder);
        assert_eq!(resolver.calls, 2);
        assert_eq!(third.version(), Some(&Version::new("1.1")));
    }

    #[test]
    fn failure_is_sticky() {
        let mut resolver = Scripted::default();
        let mut s = selector(dep(RequestedVersion::require("1.0")));
        let failed = s.resolve(None, &mut resolver, &MavenOrder);
        assert!(failed.is_failed());
        assert!(s.failure().is_some());

        let everything = rejects(&["1.0"]);
        let again = s.resolve(Some(&everything), &mut resolver, &MavenOrder);
        assert!(Rc::ptr_eq(&failed, &again));
        assert_eq!(resolver.calls, 1);

        // Escalation does not clear a failure.
        s.update(Rc::new(dep(RequestedVersion::require("1.0")).forced()), &mut ResolveOptimizations::default())
            .unwrap();
        assert!(s.failure().is_some());
        s.resolve(None, &mut resolver, &MavenOrder);
        assert_eq!(resolver.calls, 1);
    }

    #[test]
    fn rejected_result_is_not_re_resolved() {
        let mut resolver = Scripted {
            results: vec![IdResolveResult::rejected(id("1.0"))],
            ..Scripted::default()
        };
        let mut s = selector(dep(RequestedVersion::require("1.0")));
        let first = s.resolve(None, &mut resolver, &MavenOrder);
        let second = s.resolve(Some(&rejects(&["1.0"])), &mut resolver, &MavenOrder);
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(resolver.calls, 1);
    }

    #[test]
    fn escalation_is_monotonic_and_invalidates() {
        let mut resolver = Scripted {
            results: vec![
                IdResolveResult::resolved(id("1.0")),
                IdResolveResult::resolved(id("1.0")),
                IdResolveResult::resolved(id("1.0")),
            ],
            ..Scripted::default()
        };
        let mut opts = ResolveOptimizations::default();
        let mut s = selector(dep(RequestedVersion::require("1.0")));
        s.resolve(None, &mut resolver, &MavenOrder);
        assert!(s.is_resolved());

        s.update(Rc::new(dep(RequestedVersion::require("1.0")).forced()), &mut opts).unwrap();
        assert!(s.is_force());
        assert!(!s.is_resolved());
        s.resolve(None, &mut resolver, &MavenOrder);
        assert_eq!(resolver.calls, 2);

        // A plain restatement neither un-forces nor invalidates.
        s.update(Rc::new(dep(RequestedVersion::require("1.0"))), &mut opts).unwrap();
        assert!(s.is_force());
        assert!(s.is_resolved());

        s.update(Rc::new(dep(RequestedVersion::require("1.0")).from_lock()), &mut opts).unwrap();
        assert!(s.is_from_lock());
        assert!(!s.is_resolved());
        s.resolve(None, &mut resolver, &MavenOrder);
        assert_eq!(resolver.calls, 3);

        s.update(Rc::new(dep(RequestedVersion::require("1.0"))), &mut opts).unwrap();
        assert!(s.is_force() && s.is_from_lock());
    }

    #[test]
    fn same_dependency_update_is_ignored() {
        let d = Rc::new(dep(RequestedVersion::require("1.0")).forced());
        let mut opts = ResolveOptimizations::default();
        let mut s = SelectorState::new(SelectorId(0), Rc::clone(&d), ModuleId(0), false, &mut opts).unwrap();
        let mut resolver = Scripted {
            results: vec![IdResolveResult::resolved(id("1.0"))],
            ..Scripted::default()
        };
        s.resolve(None, &mut resolver, &MavenOrder);
        s.update(d, &mut opts).unwrap();
        assert!(s.is_resolved());
    }

    #[test]
    fn lenient_platform_force_is_soft_and_declared() {
        let mut opts = ResolveOptimizations::default();
        let d = dep(RequestedVersion::require("2.0")).forced().lenient_platform();
        let s = SelectorState::new(SelectorId(0), Rc::new(d), ModuleId(0), false, &mut opts).unwrap();
        assert!(s.is_force());
        assert!(s.is_soft_force());
        assert!(opts.is_forced_platform_in_use());
    }

    #[test]
    fn conflicting_client_modules_fail() {
        let mut opts = ResolveOptimizations::default();
        let with_client = |id: &str| {
            let mut d = dep(RequestedVersion::require("1.0"));
            d.client_module = Some(ClientModule { id: id.to_string() });
            Rc::new(d)
        };
        let mut s = SelectorState::new(SelectorId(0), with_client("a"), ModuleId(0), false, &mut opts).unwrap();
        s.update(with_client("a"), &mut opts).unwrap();
        let err = s.update(with_client("b"), &mut opts).unwrap_err();
        assert_eq!(err.to_string(), "org.a:lib:1.0 has more than one client module definitions.");
    }

    #[test]
    fn reuse_protocol() {
        let mut resolver = Scripted {
            results: vec![IdResolveResult::resolved(id("1.0"))],
            ..Scripted::default()
        };
        let mut s = selector(dep(RequestedVersion::require("1.0")));
        assert!(s.can_resolve());
        assert!(s.mark_for_reuse());

        s.resolve(None, &mut resolver, &MavenOrder);
        assert!(!s.can_resolve());
        assert!(!s.mark_for_reuse());
        assert!(s.can_resolve());
        assert!(s.mark_for_reuse());

        s.resolve(None, &mut resolver, &MavenOrder);
        assert!(!s.can_resolve());
    }

    #[test]
    fn override_retargets() {
        let mut s = selector(dep(RequestedVersion::require("1.0")));
        s.override_selection(ModuleId(7));
        assert!(s.is_resolved());
        assert!(!s.can_resolve());
        assert_eq!(s.target_module(), ModuleId(7));
    }

    #[test]
    fn use_count_underflow_is_an_error() {
        let mut s = selector(dep(RequestedVersion::require("1.0")));
        assert!(s.increment_use());
        assert!(!s.increment_use());
        assert!(!s.decrement_use().unwrap());
        assert!(s.decrement_use().unwrap());
        assert!(s.decrement_use().is_err());
        assert_eq!(s.use_count(), 0);
    }

    #[test]
    fn invalid_version_fails_without_lookup() {
        let mut resolver = Scripted::default();
        let mut s = selector(dep(RequestedVersion::require("[1.0,")));
        let result = s.resolve(None, &mut resolver, &MavenOrder);
        assert!(result.is_failed());
        assert_eq!(resolver.calls, 0);
    }

    #[test]
    fn no_preference_means_no_prefer_result() {
        let mut resolver = Scripted::default();
        let mut s = selector(dep(RequestedVersion::require("1.0")));
        assert!(s.resolve_prefer(None, &mut resolver, &MavenOrder).is_none());
        assert_eq!(resolver.calls, 0);
    }

    #[test]
    fn rejection_reasons() {
        let result = IdResolveResult::resolved(id("1.1"))
            .with_unmatched_versions(vec![Version::new("2.0")])
            .with_rejected_versions(vec![
                RejectedVersion {
                    version: Version::new("1.3"),
                    kind: RejectionKind::BySelector,
                },
                RejectedVersion {
                    version: Version::new("1.2"),
                    kind: RejectionKind::ByRule {
                        reason: Some("broken".to_string()),
                    },
                },
            ]);
        let mut resolver = Scripted {
            results: vec![result],
            ..Scripted::default()
        };
        let mut d = dep(RequestedVersion::require("1.+"));
        d.reason = Some("needs api".to_string());
        let mut s = selector(d);
        s.resolve(None, &mut resolver, &MavenOrder);

        let mut reason = SelectionReason::new();
        s.add_reasons_for_selector(&mut reason);
        let text: Vec<&str> = reason.descriptors().iter().map(|d| d.description()).collect();
        assert_eq!(
            text,
            vec!["1.2 by rule because broken", "rejected version 1.3 because needs api"]
        );
    }

    #[test]
    fn forced_cause_keeps_its_plain_description() {
        let result = IdResolveResult::resolved(id("1.1")).with_unmatched_versions(vec![Version::new("2.0")]);
        let mut resolver = Scripted {
            results: vec![result],
            ..Scripted::default()
        };
        let mut s = selector(dep(RequestedVersion::require("1.+")).forced());
        s.resolve(None, &mut resolver, &MavenOrder);

        let mut reason = SelectionReason::new();
        s.add_reasons_for_selector(&mut reason);
        let text: Vec<String> = reason.descriptors().iter().map(ToString::to_string).collect();
        assert_eq!(text, vec!["requested: didn't match version 2.0", "forced"]);
    }

    #[test]
    fn preferred_result_drives_the_reasons() {
        let required = IdResolveResult::resolved(id("1.1")).with_unmatched_versions(vec![Version::new("2.0")]);
        let preferred = IdResolveResult::resolved(id("1.1")).with_unmatched_versions(vec![Version::new("1.4")]);
        let mut resolver = Scripted {
            results: vec![required, preferred],
            ..Scripted::default()
        };
        let requested = RequestedVersion {
            prefer: Some("1.1".to_string()),
            ..RequestedVersion::require("[1.0,2.0)")
        };
        let mut s = selector(dep(requested));
        s.resolve(None, &mut resolver, &MavenOrder);
        s.resolve_prefer(None, &mut resolver, &MavenOrder);

        let mut reason = SelectionReason::new();
        s.add_reasons_for_selector(&mut reason);
        let text: Vec<&str> = reason.descriptors().iter().map(|d| d.description()).collect();
        assert_eq!(text, vec!["didn't match version 1.4"]);
    }

    #[test]
    fn cached_prefer_result_is_reused_until_rejected() {
        let mut resolver = Scripted {
            results: vec![
                IdResolveResult::resolved(id("1.0")),
                IdResolveResult::resolved(id("1.4")),
                IdResolveResult::resolved(id("1.3")),
            ],
            ..Scripted::default()
        };
        let requested = RequestedVersion {
            prefer: Some("[1.0,1.5)".to_string()),
            ..RequestedVersion::require("1.0")
        };
        let mut s = selector(dep(requested));
        s.resolve(None, &mut resolver, &MavenOrder);
        let first = s.resolve_prefer(None, &mut resolver, &MavenOrder).unwrap();
        let unrelated = rejects(&["0.9"]);
        let second = s.resolve_prefer(Some(&unrelated), &mut resolver, &MavenOrder).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(resolver.calls, 2);

        let covering = rejects(&["1.4"]);
        let third = s.resolve_prefer(Some(&covering), &mut resolver, &MavenOrder).unwrap();
        assert_eq!(resolver.calls, 3);
        assert_eq!(third.version(), Some(&Version::new("1.3")));
        assert!(Rc::ptr_eq(s.prefer_result().unwrap(), &third));
    }

    #[test]
    fn release_drops_a_failure_so_reuse_resolves_again() {
        let mut resolver = Scripted::default();
        let mut s = selector(dep(RequestedVersion::require("1.0")));
        assert!(s.increment_use());
        assert!(s.resolve(None, &mut resolver, &MavenOrder).is_failed());
        assert!(s.failure().is_some());

        assert!(s.decrement_use().unwrap());
        s.mark_for_reuse();
        s.mark_unresolved();
        assert!(s.failure().is_none());
        assert!(s.require_result().is_none());

        resolver.results.push(IdResolveResult::resolved(id("1.0")));
        assert!(s.increment_use());
        let again = s.resolve(None, &mut resolver, &MavenOrder);
        assert_eq!(resolver.calls, 2);
        assert_eq!(again.version(), Some(&Version::new("1.0")));
        assert_eq!(s.status(), &SelectorStatus::Resolved);
    }
}
