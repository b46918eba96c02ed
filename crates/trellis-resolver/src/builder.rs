//! Worklist traversal that drives selectors, module selection and virtual
//! platform alignment, then turns the final state into a [`ResolutionResult`].

use std::collections::{HashSet, VecDeque};
use std::convert::Infallible;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use trellis_core::config::{ConflictResolution, ResolutionConfig};
use trellis_core::lockfile::{LockedPackage, Lockfile};
use trellis_core::module::{ComponentIdentifier, ComponentSelector, ModuleKey, RequestedVersion};
use trellis_core::scenario::Scenario;
use trellis_core::selector::{ComponentStatus, VersionRejects, VersionSelector};
use trellis_core::version::{CachedMavenOrder, Version, VersionOrder};
use trellis_util::errors::TrellisError;

use crate::conflict::ConflictReport;
use crate::dependency::DependencyState;
use crate::graph::{DepEdge, DependencyGraph, ResolvedNode};
use crate::module_selectors::ResolvableSelector;
use crate::reason::{SelectionCause, SelectionDescriptor, SelectionReason};
use crate::repository::{ComponentMetadataSource, RepositoryResolver};
use crate::result::ResolveFailure;
use crate::state::{ComponentId, EdgeId, ModuleId, NodeId, ResolveState, SelectionStatus, SelectorId};

/// The output of dependency resolution.
#[derive(Debug)]
pub struct ResolutionResult {
    pub root: ModuleKey,
    /// Every module reachable from the root, in discovery order.
    pub selections: Vec<ResolvedModule>,
    pub failures: Vec<UnresolvedDependency>,
    pub conflicts: ConflictReport,
    pub graph: DependencyGraph,
    pub forced_platform_in_use: bool,
}

#[derive(Debug, Clone)]
pub struct ResolvedModule {
    pub module: ModuleKey,
    pub version: Version,
    pub project: bool,
    pub reason: SelectionReason,
}

/// A dependency edge that could not be attached to any component.
#[derive(Debug, Clone)]
pub struct UnresolvedDependency {
    pub from: String,
    pub requested: String,
    pub failure: ResolveFailure,
}

impl ResolutionResult {
    pub fn selection(&self, module: &ModuleKey) -> Option<&ResolvedModule> {
        self.selections.iter().find(|s| &s.module == module)
    }

    /// Published modules only, ready for a lockfile.
    pub fn locked_packages(&self) -> Vec<LockedPackage> {
        self.selections
            .iter()
            .filter(|s| !s.project)
            .map(|s| LockedPackage {
                module: s.module.clone(),
                version: s.version.clone(),
            })
            .collect()
    }
}

/// Resolve the dependency graph of a scenario.
///
/// Unresolvable dependencies are reported in the result. Only broken
/// resolver bookkeeping, conflicting client modules and, when configured,
/// version conflicts are returned as errors.
pub fn resolve(
    scenario: &Scenario,
    lockfile: Option<&Lockfile>,
    config: &ResolutionConfig,
) -> Result<ResolutionResult, TrellisError> {
    let root = ComponentIdentifier::Project {
        module: scenario.project.key(),
        version: scenario.project.version.clone(),
    };
    let mut dependencies: Vec<DependencyState> = scenario
        .dependencies
        .iter()
        .map(DependencyState::from_decl)
        .collect();
    if let Some(lockfile) = lockfile {
        dependencies.extend(lock_constraints(lockfile));
    }
    let order = Rc::new(CachedMavenOrder::new());
    let result = GraphBuilder::new(scenario, order, config.clone()).build(root, dependencies)?;
    if config.fail_on_version_conflict && !result.conflicts.is_empty() {
        return Err(TrellisError::Resolution {
            message: format!("version conflicts are not allowed\n{}", result.conflicts),
        });
    }
    Ok(result)
}

/// Strict constraints pinning every locked module to its locked version.
pub fn lock_constraints(lockfile: &Lockfile) -> Vec<DependencyState> {
    lockfile
        .package
        .iter()
        .map(|p| {
            let mut dependency = DependencyState::new(ComponentSelector::module(
                p.module.clone(),
                RequestedVersion::strictly(p.version.as_str()),
            ))
            .from_lock()
            .constraint();
            dependency.reason = Some("dependency was locked".to_string());
            dependency
        })
        .collect()
}

struct Candidate {
    id: ComponentIdentifier,
    forced: bool,
    soft_forced: bool,
    strict: Option<VersionSelector>,
}

pub struct GraphBuilder<'a, S: ComponentMetadataSource + ?Sized> {
    source: &'a S,
    resolver: RepositoryResolver<'a, S>,
    order: Rc<dyn VersionOrder>,
    config: ResolutionConfig,
    state: ResolveState,
    queue: VecDeque<NodeId>,
    root: Option<NodeId>,
    root_dependencies: Vec<Rc<DependencyState>>,
    unstable_warned: HashSet<ModuleId>,
}

impl<'a, S: ComponentMetadataSource + ?Sized> GraphBuilder<'a, S> {
    pub fn new(source: &'a S, order: Rc<dyn VersionOrder>, config: ResolutionConfig) -> Self {
        Self {
            source,
            resolver: RepositoryResolver::new(source, Rc::clone(&order)),
            state: ResolveState::new(Rc::clone(&order)),
            order,
            config,
            queue: VecDeque::new(),
            root: None,
            root_dependencies: Vec::new(),
            unstable_warned: HashSet::new(),
        }
    }

    pub fn build(
        mut self,
        root: ComponentIdentifier,
        dependencies: Vec<DependencyState>,
    ) -> Result<ResolutionResult, TrellisError> {
        let component = self.state.graph.component_for(&root);
        let module = self.state.graph.component(component).module();
        self.state.graph.select(module, component)?;
        self.state.graph.components[component.index()]
            .reason
            .add_cause(SelectionDescriptor::new(SelectionCause::Root));
        let root_node = self.state.graph.component(component).node();
        self.root = Some(root_node);
        self.root_dependencies = dependencies.into_iter().map(Rc::new).collect();

        debug!(root = %root, "resolving dependency graph");
        self.queue.push_back(root_node);
        self.traverse()?;
        self.fail_orphan_edges();
        self.validate_platform_forces();
        Ok(self.into_result(root_node, root.module().clone()))
    }

    fn traverse(&mut self) -> Result<(), TrellisError> {
        loop {
            while let Some(node) = self.queue.pop_front() {
                self.visit(node)?;
            }
            let graph = &self.state.graph;
            let refresh: Vec<NodeId> = graph
                .nodes
                .iter()
                .filter(|n| n.visited && n.needs_virtual_platform_refresh())
                .filter(|n| graph.component(n.component()).status() == SelectionStatus::Selected)
                .map(|n| n.id)
                .collect();
            if refresh.is_empty() {
                return Ok(());
            }
            self.queue.extend(refresh);
        }
    }

    fn visit(&mut self, node: NodeId) -> Result<(), TrellisError> {
        let graph = &mut self.state.graph;
        let component = graph.node(node).component();
        if graph.component(component).status() != SelectionStatus::Selected {
            return Ok(());
        }
        let n = graph.node_mut(node);
        if n.visited && !n.virtual_platform_needs_refresh {
            return Ok(());
        }
        let refreshing = n.visited;
        n.virtual_platform_needs_refresh = false;
        if Some(node) != self.root && n.incoming.is_empty() {
            // Dropped from the graph before its turn came.
            return Ok(());
        }
        n.visited = true;
        if refreshing {
            trace!(component = %graph.component(component).identifier(), "refreshing platform node");
        }
        let n = graph.node_mut(node);
        let previous = std::mem::take(&mut n.outgoing);

        let dependencies = self.dependencies_of(node)?;
        self.process_edges(node, dependencies)?;
        self.release_edges(previous)
    }

    fn dependencies_of(&mut self, node: NodeId) -> Result<Vec<Rc<DependencyState>>, TrellisError> {
        if Some(node) == self.root {
            return Ok(self.root_dependencies.clone());
        }
        let graph = &self.state.graph;
        let component = graph.component(graph.node(node).component());
        let module = component.module();
        let id = component.identifier().clone();
        if graph.module(module).is_virtual_platform() {
            return Ok(self.platform_constraints(module, id.version()));
        }

        let source = self.source;
        let Some(metadata) = source.metadata(&id) else {
            return Ok(Vec::new());
        };
        let mut dependencies: Vec<Rc<DependencyState>> = metadata
            .dependencies
            .iter()
            .map(|d| Rc::new(DependencyState::from_decl(d)))
            .collect();
        for platform in metadata.platforms {
            let platform_module = self.state.graph.module_for(platform);
            self.register_participant(platform_module, module)?;
            let mut edge = DependencyState::new(ComponentSelector::module(
                platform.clone(),
                RequestedVersion::require(id.version().as_str()),
            ))
            .lenient_platform();
            if self.module_is_forced(module) {
                edge = edge.forced();
            }
            dependencies.push(Rc::new(edge));
        }
        Ok(dependencies)
    }

    /// Constraints from a virtual platform node onto every member that
    /// publishes the platform's version.
    fn platform_constraints(&mut self, platform: ModuleId, version: &Version) -> Vec<Rc<DependencyState>> {
        let source = self.source;
        let ResolveState {
            graph,
            platforms,
            optimizations,
            ..
        } = &mut self.state;
        let Some(state) = platforms.get_mut(&platform) else {
            return Vec::new();
        };
        let forced = state.is_forced(graph, optimizations);
        let platform_key = graph.module(platform).key().clone();
        state
            .participating_modules()
            .filter_map(|member| {
                let key = graph.module(member).key().clone();
                let id = ComponentIdentifier::Module {
                    module: key.clone(),
                    version: version.clone(),
                };
                source.metadata(&id)?;
                let mut constraint =
                    DependencyState::new(ComponentSelector::module(key, RequestedVersion::require(version.as_str())))
                        .constraint();
                constraint.reason = Some(format!("belongs to platform {platform_key}"));
                if forced {
                    constraint = constraint.forced().lenient_platform();
                }
                Some(Rc::new(constraint))
            })
            .collect()
    }

    fn register_participant(&mut self, platform: ModuleId, member: ModuleId) -> Result<(), TrellisError> {
        if !self.state.register_participant(platform, member) {
            return Ok(());
        }
        let key = self.state.graph.module(platform).key().clone();
        debug!(
            platform = %key,
            member = %self.state.graph.module(member).key(),
            "virtual platform member"
        );
        self.resolver.declare_virtual_platform(key);
        if let Some(mut state) = self.state.platforms.remove(&platform) {
            let attached = state.attach_orphan_edges(|edge| self.attach_to_selected(edge));
            self.state.platforms.insert(platform, state);
            attached?;
        }
        Ok(())
    }

    fn module_is_forced(&self, module: ModuleId) -> bool {
        let graph = &self.state.graph;
        graph.module(module).selectors().iter().any(|id| {
            let s = graph.selector(id);
            s.is_force() && !s.is_soft_force()
        })
    }

    fn process_edges(&mut self, node: NodeId, dependencies: Vec<Rc<DependencyState>>) -> Result<(), TrellisError> {
        let targets: Vec<ModuleKey> = dependencies
            .iter()
            .map(|d| d.requested.target().clone())
            .collect();
        let mut edges = Vec::with_capacity(dependencies.len());
        for (i, dependency) in dependencies.into_iter().enumerate() {
            // Later edges to the same module will trigger selection.
            let defer = targets[i + 1..].contains(&targets[i]);
            let graph = &mut self.state.graph;
            let selector = graph.selector_for(Rc::clone(&dependency), false, &mut self.state.optimizations)?;
            edges.push(graph.add_edge(node, dependency, selector));
            graph.use_selector(selector, defer);
            let module = graph.selector(selector).target_module();
            if self.needs_selection(module) {
                self.maybe_update_selection(module)?;
            }
        }
        for edge in edges {
            self.attach_to_selected(edge)?;
        }
        Ok(())
    }

    fn needs_selection(&self, module: ModuleId) -> bool {
        let graph = &self.state.graph;
        let m = graph.module(module);
        m.selected().is_none() || m.selectors().iter().any(|s| graph.selector(s).can_resolve())
    }

    /// Release edges, prune nodes left without incoming edges, then let
    /// affected modules reconsider their selection.
    fn release_edges(&mut self, edges: Vec<EdgeId>) -> Result<(), TrellisError> {
        let mut reselect = Vec::new();
        for edge in edges {
            let target = self.state.graph.edge(edge).target();
            if let Some(module) = self.state.graph.release_edge(edge)? {
                reselect.push(module);
            }
            let Some(target) = target else { continue };
            let n = self.state.graph.node(target);
            if Some(target) != self.root && n.visited && n.incoming().is_empty() {
                let n = self.state.graph.node_mut(target);
                n.visited = false;
                let outgoing = std::mem::take(&mut n.outgoing);
                self.release_edges(outgoing)?;
            }
        }
        for module in reselect {
            self.maybe_update_selection(module)?;
        }
        Ok(())
    }

    fn maybe_update_selection(&mut self, module: ModuleId) -> Result<(), TrellisError> {
        let is_root = Some(module) == self.root_module();
        let m = &mut self.state.graph.modules[module.index()];
        if !is_root && m.selectors.check_defer_selection() {
            return Ok(());
        }
        let Some((winner, reason)) = self.select_best(module) else {
            return Ok(());
        };
        let graph = &mut self.state.graph;
        let component = graph.component_for(&winner);
        match graph.module(module).selected() {
            None => graph.select(module, component)?,
            Some(current) if current == component => {}
            Some(current) => {
                if graph.module(module).selection_changes() >= self.config.max_selection_changes
                    && self.skip_selection_change(module, current, &winner)
                {
                    return Ok(());
                }
                self.change_selection(module, component)?;
            }
        }
        self.state.graph.components[component.index()].reason = reason;
        Ok(())
    }

    fn root_module(&self) -> Option<ModuleId> {
        self.root
            .map(|n| self.state.graph.component(self.state.graph.node(n).component()).module())
    }

    /// Keep the current selection of an unstable module unless the
    /// candidate is higher, or is a project under `prefer-projects`.
    fn skip_selection_change(&mut self, module: ModuleId, current: ComponentId, winner: &ComponentIdentifier) -> bool {
        let graph = &self.state.graph;
        if self.unstable_warned.insert(module) {
            warn!(
                module = %graph.module(module).key(),
                "selection is not stable after {} changes; keeping the highest version",
                self.config.max_selection_changes
            );
        }
        if winner.is_project() && self.config.conflict_resolution == ConflictResolution::PreferProjects {
            return false;
        }
        let current = graph.component(current).version();
        self.order.compare(winner.version(), current).is_le()
    }

    /// Resolve every selector of `module` and pick the winning component.
    fn select_best(&mut self, module: ModuleId) -> Option<(ComponentIdentifier, SelectionReason)> {
        let order = Rc::clone(&self.order);
        let order = order.as_ref();
        let keys: Vec<SelectorId> = self.state.graph.module(module).selectors().iter().collect();
        if keys.is_empty() {
            return None;
        }
        let mut all_rejects = VersionRejects::default();
        for key in &keys {
            if let Some(c) = self.state.graph.selector(*key).version_constraint() {
                all_rejects.extend(&c.rejects);
            }
        }
        let rejects = (!all_rejects.is_empty()).then_some(&all_rejects);

        let mut candidates = Vec::new();
        for key in &keys {
            let selector = self.state.graph.selector_mut(*key);
            let result = selector.resolve(rejects, &mut self.resolver, order);
            if result.is_failed() || result.is_rejected() {
                continue;
            }
            let preferred = selector
                .resolve_prefer(rejects, &mut self.resolver, order)
                .filter(|p| !p.is_failed() && !p.is_rejected());
            let constraint = selector.version_constraint();
            let mut id = result.id().cloned();
            if let Some(preferred) = preferred {
                let within = match (preferred.version(), constraint.and_then(|c| c.required.as_ref())) {
                    (Some(v), Some(required)) => required.accept(v, ComponentStatus::Release, order),
                    (Some(_), None) => true,
                    (None, _) => false,
                };
                if within {
                    id = preferred.id().cloned();
                }
            }
            let Some(id) = id else { continue };
            candidates.push(Candidate {
                id,
                forced: selector.is_force() && !selector.is_soft_force(),
                soft_forced: selector.is_soft_force(),
                strict: constraint
                    .filter(|c| c.is_strict())
                    .and_then(|c| c.required.clone()),
            });
        }

        if let Some(platform) = self.state.platform_of(module) {
            let graph = &self.state.graph;
            candidates.retain(|c| c.id.is_project() || !platform.is_greater_than_forced_version(c.id.version(), graph));
        }

        let key = self.state.graph.module(module).key().clone();
        let mut distinct: Vec<&Version> = Vec::new();
        for c in &candidates {
            if !distinct.contains(&c.id.version()) {
                distinct.push(c.id.version());
            }
        }
        self.state.conflicts.record(&key, distinct.iter().copied());

        let winner = self.pick_winner(module, &key, &candidates)?;
        trace!(module = %key, selected = %winner, candidates = candidates.len(), "module selection");

        let mut reason = SelectionReason::new();
        for k in &keys {
            self.state.graph.selector(*k).add_reasons_for_selector(&mut reason);
        }
        if self.state.conflicts.has_known_conflict(&key) {
            reason.add_cause(SelectionDescriptor::new(SelectionCause::ConflictResolution));
        }
        Some((winner, reason))
    }

    fn pick_winner(&self, module: ModuleId, key: &ModuleKey, candidates: &[Candidate]) -> Option<ComponentIdentifier> {
        if let Some(c) = candidates.iter().find(|c| c.forced) {
            return Some(c.id.clone());
        }
        let platform = self
            .state
            .platforms
            .get(&module)
            .filter(|p| p.has_participants());
        if let Some(version) = platform.and_then(|p| p.forced_version(&self.state.graph)) {
            return Some(ComponentIdentifier::Module {
                module: key.clone(),
                version,
            });
        }
        if let Some(c) = candidates.iter().find(|c| c.soft_forced) {
            return Some(c.id.clone());
        }
        if self.config.conflict_resolution == ConflictResolution::PreferProjects {
            if let Some(c) = candidates.iter().find(|c| c.id.is_project()) {
                return Some(c.id.clone());
            }
        }

        let order = self.order.as_ref();
        let stricts: Vec<&VersionSelector> = candidates.iter().filter_map(|c| c.strict.as_ref()).collect();
        let accepted = |id: &ComponentIdentifier| {
            stricts
                .iter()
                .all(|s| s.accept(id.version(), ComponentStatus::Release, order))
        };
        let mut pool: Vec<ComponentIdentifier> = candidates
            .iter()
            .map(|c| c.id.clone())
            .filter(|id| accepted(id))
            .collect();
        if pool.is_empty() {
            pool = candidates.iter().map(|c| c.id.clone()).collect();
        }
        if let Some(platform) = platform {
            pool.extend(
                platform
                    .candidate_versions(&self.state.graph)
                    .into_iter()
                    .map(|version| ComponentIdentifier::Module {
                        module: key.clone(),
                        version,
                    })
                    .filter(|id| accepted(id)),
            );
        }
        pool.into_iter().reduce(|best, next| {
            if order.compare(next.version(), best.version()).is_gt() {
                next
            } else {
                best
            }
        })
    }

    fn change_selection(&mut self, module: ModuleId, component: ComponentId) -> Result<(), TrellisError> {
        let graph = &mut self.state.graph;
        let previous = graph.change_selection(module, component);
        debug!(
            module = %graph.module(module).key(),
            from = ?previous.map(|p| graph.component(p).version().to_string()),
            to = %graph.component(component).version(),
            "selection changed"
        );
        let Some(previous) = previous else {
            return Ok(());
        };
        let old_node = graph.component(previous).node();
        let n = graph.node_mut(old_node);
        n.visited = false;
        n.virtual_platform_needs_refresh = false;
        let outgoing = std::mem::take(&mut n.outgoing);
        let incoming = n.incoming.clone();
        for edge in incoming {
            self.attach_to_selected(edge)?;
        }
        self.release_edges(outgoing)
    }

    /// Attach `edge` to the node selected for its target module, or record why it cannot be.
    fn attach_to_selected(&mut self, edge: EdgeId) -> Result<(), TrellisError> {
        let graph = &mut self.state.graph;
        let e = graph.edge(edge);
        if !e.is_active() {
            return Ok(());
        }
        let requested = e.dependency().requested.to_string();
        let constraint = e.dependency().constraint;
        let selector = graph.selector(e.selector());
        if let Some(failure) = selector.failure().cloned() {
            graph.detach_edge(edge);
            graph.edges[edge.index()].failure = Some(failure);
            return Ok(());
        }
        let module = selector.target_module();
        let Some(component) = graph.module(module).selected() else {
            let message = match selector.require_result().and_then(|r| r.version().filter(|_| r.is_rejected())) {
                Some(version) => format!("version {version} is rejected"),
                None => "no acceptable version".to_string(),
            };
            graph.detach_edge(edge);
            graph.edges[edge.index()].failure = Some(ResolveFailure::new(requested, message));
            return Ok(());
        };
        let id = graph.component(component).identifier().clone();
        let target = graph.component(component).node();

        if !graph.module(module).is_virtual_platform() && !id.is_project() && self.source.metadata(&id).is_none() {
            graph.detach_edge(edge);
            if self.source.versions(id.module()).is_empty() {
                trace!(%requested, "parking edge until its platform is known");
                self.state.platform_for(module).add_orphan_edge(edge);
            } else {
                graph.edges[edge.index()].failure = Some(ResolveFailure::new(requested, format!("Could not find {id}")));
            }
            return Ok(());
        }

        graph.edges[edge.index()].failure = None;
        graph.attach_edge(edge, target);
        if !constraint && !graph.node(target).visited {
            self.queue.push_back(target);
        }
        Ok(())
    }

    /// Edges parked for a platform that never gained a member.
    fn fail_orphan_edges(&mut self) {
        let ResolveState { graph, platforms, .. } = &mut self.state;
        for platform in platforms.values_mut().filter(|p| !p.has_participants()) {
            let attached = platform.attach_orphan_edges(|edge| {
                let e = &graph.edges[edge.index()];
                let target = graph.selector(e.selector()).target_module();
                let message = match graph.module(target).selected() {
                    Some(c) => format!("Could not find {}", graph.component(c).identifier()),
                    None => "no acceptable version".to_string(),
                };
                let failure = ResolveFailure::new(e.dependency().requested.to_string(), message);
                graph.edges[edge.index()].failure = Some(failure);
                Ok::<_, Infallible>(())
            });
            attached.unwrap_or_else(|never| match never {});
        }
    }

    /// Hard forces on members of one virtual platform must agree on a version.
    fn validate_platform_forces(&mut self) {
        let graph = &self.state.graph;
        let mut failures = Vec::new();
        for (&platform_id, platform) in &self.state.platforms {
            if !platform.has_participants() {
                continue;
            }
            let platform_module = graph.module(platform_id);
            let mut current = platform_module.selected().and_then(|c| {
                let component = graph.component(c);
                let forced = graph.node(component.node()).incoming().iter().any(|e| {
                    let d = graph.edge(*e).dependency();
                    d.is_platform_forced()
                });
                forced.then(|| component.version().to_string())
            });
            let mut forced_edges = Vec::new();
            let mut multiple = false;
            for member in platform.participating_modules() {
                let Some(selected) = graph.module(member).selected() else {
                    continue;
                };
                let node = graph.component(selected).node();
                for &edge in graph.node(node).incoming() {
                    let e = graph.edge(edge);
                    let selector = graph.selector(e.selector());
                    if !selector.is_force() || selector.is_soft_force() {
                        continue;
                    }
                    let ComponentSelector::Module { version, .. } = selector.requested() else {
                        continue;
                    };
                    let from_module = graph.component(graph.node(e.from()).component()).module();
                    if from_module == platform_id {
                        continue;
                    }
                    forced_edges.push(edge);
                    let version = version.to_string();
                    match &current {
                        None => current = Some(version),
                        Some(c) if *c != version => multiple = true,
                        Some(_) => {}
                    }
                }
            }
            if multiple {
                let message = format!(
                    "Multiple forces on different versions for virtual platform {}",
                    platform_module.key()
                );
                failures.extend(forced_edges.into_iter().map(|e| (e, message.clone())));
            }
        }
        for (edge, message) in failures {
            let e = &mut self.state.graph.edges[edge.index()];
            e.failure = Some(ResolveFailure::new(e.dependency.requested.to_string(), message));
        }
    }

    fn into_result(self, root_node: NodeId, root: ModuleKey) -> ResolutionResult {
        let graph = &self.state.graph;
        let node_label = |node: NodeId| {
            let component = graph.component(graph.node(node).component());
            ResolvedNode {
                module: component.identifier().module().clone(),
                version: component.version().clone(),
                project: component.identifier().is_project(),
            }
        };

        let mut dependency_graph = DependencyGraph::new();
        let root_idx = dependency_graph.add_node(node_label(root_node));
        dependency_graph.set_root(root_idx);

        let mut selections = Vec::new();
        let mut seen = HashSet::from([root_node]);
        let mut queue = VecDeque::from([(root_node, root_idx)]);
        while let Some((node, idx)) = queue.pop_front() {
            for &edge in graph.node(node).outgoing() {
                let e = graph.edge(edge);
                let Some(target) = e.target() else { continue };
                if !e.is_active() || e.dependency().constraint {
                    continue;
                }
                let component = graph.component(graph.node(target).component());
                if graph.module(component.module()).is_virtual_platform() {
                    continue;
                }
                let target_idx = dependency_graph.add_node(node_label(target));
                let requested = match &e.dependency().requested {
                    ComponentSelector::Module { version, .. } => version.to_string(),
                    ComponentSelector::Project { .. } => String::new(),
                };
                dependency_graph.add_edge(idx, target_idx, DepEdge { requested });
                if seen.insert(target) {
                    let label = node_label(target);
                    selections.push(ResolvedModule {
                        module: label.module,
                        version: label.version,
                        project: label.project,
                        reason: component.reason().clone(),
                    });
                    queue.push_back((target, target_idx));
                }
            }
        }

        let failures = graph
            .edges
            .iter()
            .filter(|e| e.is_active() && !e.dependency().constraint)
            .filter_map(|e| {
                let failure = e.failure()?.clone();
                Some(UnresolvedDependency {
                    from: graph.component(graph.node(e.from()).component()).identifier().to_string(),
                    requested: e.dependency().requested.to_string(),
                    failure,
                })
            })
            .collect();

        let conflicts = self.state.conflicts.report(|module| {
            let id = graph.find_module(module)?;
            graph.selected_version(id).cloned()
        });

        ResolutionResult {
            root,
            selections,
            failures,
            conflicts,
            graph: dependency_graph,
            forced_platform_in_use: self.state.optimizations.is_forced_platform_in_use(),
        }
    }
}
