//! Alignment state of a virtual platform.

use indexmap::IndexSet;
use tracing::debug;

use trellis_core::version::Version;

use crate::latch::Latch;
use crate::module_selectors::ResolvableSelector;
use crate::state::{EdgeId, ModuleGraph, ModuleId, ResolveOptimizations};

/// Members of one virtual platform, and the edges waiting for it to exist.
///
/// Members are only ever added. The module states themselves live in the
/// [`ModuleGraph`]; this only holds their ids.
#[derive(Debug)]
pub struct VirtualPlatformState {
    platform: ModuleId,
    participants: IndexSet<ModuleId>,
    orphan_edges: Vec<EdgeId>,
    has_forced_participant: Latch,
}

impl VirtualPlatformState {
    pub fn new(platform: ModuleId) -> Self {
        Self {
            platform,
            participants: IndexSet::new(),
            orphan_edges: Vec::new(),
            has_forced_participant: Latch::new(),
        }
    }

    pub fn platform(&self) -> ModuleId {
        self.platform
    }

    pub fn participating_modules(&self) -> impl Iterator<Item = ModuleId> + '_ {
        self.participants.iter().copied()
    }

    pub fn has_participants(&self) -> bool {
        !self.participants.is_empty()
    }

    /// Register `member`. On first registration the nodes of the platform's
    /// current selection are flagged for refresh. Returns `true` if `member`
    /// was new.
    pub fn participating_module(&mut self, member: ModuleId, graph: &mut ModuleGraph) -> bool {
        if !self.participants.insert(member) {
            return false;
        }
        if let Some(selected) = graph.module(self.platform).selected() {
            let node = graph.component(selected).node();
            graph.node_mut(node).mark_for_virtual_platform_refresh();
            debug!(
                platform = %graph.module(self.platform).key(),
                member = %graph.module(member).key(),
                "platform gained a member after selection"
            );
        }
        self.has_forced_participant.set_if(module_has_strong_opinion(graph, member));
        true
    }

    /// The lowest version requested by a forced or strict selector on the platform.
    pub fn forced_version(&self, graph: &ModuleGraph) -> Option<Version> {
        let order = graph.order();
        graph
            .module(self.platform)
            .selectors()
            .iter()
            .map(|id| graph.selector(id))
            .filter(|s| s.has_strong_opinion())
            .filter_map(|s| s.version_constraint().and_then(|c| c.required_exact()))
            .min_by(|a, b| order.compare(a, b))
            .cloned()
    }

    /// Selected versions of the platform and its members, highest first,
    /// never below the forced version.
    pub fn candidate_versions(&self, graph: &ModuleGraph) -> Vec<Version> {
        let order = graph.order();
        let mut versions: Vec<Version> = Vec::new();
        let modules = std::iter::once(self.platform).chain(self.participants.iter().copied());
        for module in modules {
            if let Some(v) = graph.selected_version(module) {
                if !versions.contains(v) {
                    versions.push(v.clone());
                }
            }
        }
        order.sort_descending(&mut versions);
        if let Some(forced) = self.forced_version(graph) {
            versions.retain(|v| order.compare(v, &forced).is_ge());
        }
        versions
    }

    /// Whether the platform or any member carries a forced or strict
    /// selector. A `true` answer is also reported to `optimizations`.
    pub fn is_forced(&mut self, graph: &ModuleGraph, optimizations: &mut ResolveOptimizations) -> bool {
        let forced = self.has_forced_participant.is_set()
            || self.has_forced_participant.set_if(
                self.participants
                    .iter()
                    .any(|m| module_has_strong_opinion(graph, *m)),
            )
            || module_has_strong_opinion(graph, self.platform);
        if forced {
            optimizations.declare_forced_platform_in_use();
        }
        forced
    }

    pub fn add_orphan_edge(&mut self, edge: EdgeId) {
        self.orphan_edges.push(edge);
    }

    pub fn orphan_edges(&self) -> &[EdgeId] {
        &self.orphan_edges
    }

    /// Hand every parked edge to `attach`, in the order they were parked.
    /// The queue is empty afterwards, even if `attach` fails.
    pub fn attach_orphan_edges<E>(&mut self, mut attach: impl FnMut(EdgeId) -> Result<(), E>) -> Result<(), E> {
        for edge in std::mem::take(&mut self.orphan_edges) {
            attach(edge)?;
        }
        Ok(())
    }

    pub fn is_greater_than_forced_version(&self, version: &Version, graph: &ModuleGraph) -> bool {
        self.forced_version(graph)
            .is_some_and(|forced| graph.order().compare(&forced, version).is_gt())
    }
}

fn module_has_strong_opinion(graph: &ModuleGraph, module: ModuleId) -> bool {
    graph
        .module(module)
        .selectors()
        .iter()
        .any(|id| graph.selector(id).has_strong_opinion())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;
    use trellis_core::module::{ComponentIdentifier, ComponentSelector, ModuleKey, RequestedVersion};
    use trellis_core::version::MavenOrder;

    use crate::dependency::DependencyState;

    fn key(name: &str) -> ModuleKey {
        ModuleKey::new("org.p", name)
    }

    fn select(graph: &mut ModuleGraph, name: &str, version: &str) -> ModuleId {
        let c = graph.component_for(&ComponentIdentifier::Module {
            module: key(name),
            version: Version::new(version),
        });
        let module = graph.component(c).module();
        graph.select(module, c).unwrap();
        module
    }

    fn use_dep(graph: &mut ModuleGraph, dependency: DependencyState) {
        let mut opts = ResolveOptimizations::default();
        let s = graph.selector_for(Rc::new(dependency), false, &mut opts).unwrap();
        graph.use_selector(s, false);
    }

    fn require(name: &str, version: &str) -> DependencyState {
        DependencyState::new(ComponentSelector::module(key(name), RequestedVersion::require(version)))
    }

    fn strictly(name: &str, version: &str) -> DependencyState {
        DependencyState::new(ComponentSelector::module(key(name), RequestedVersion::strictly(version)))
    }

    #[test]
    fn late_member_flags_platform_nodes_for_refresh() {
        let mut graph = ModuleGraph::new(Rc::new(MavenOrder));
        let platform = select(&mut graph, "platform", "2.0");
        let a = select(&mut graph, "a", "1.5");
        let mut state = VirtualPlatformState::new(platform);

        assert!(state.participating_module(a, &mut graph));
        let node = graph
            .component(graph.module(platform).selected().unwrap())
            .node();
        assert!(graph.node(node).needs_virtual_platform_refresh());
        assert_eq!(
            state.candidate_versions(&graph),
            vec![Version::new("2.0"), Version::new("1.5")]
        );

        // re-registration is a no-op
        assert!(!state.participating_module(a, &mut graph));
        assert_eq!(state.participating_modules().collect::<Vec<_>>(), vec![a]);
    }

    #[test]
    fn member_before_selection_does_not_flag() {
        let mut graph = ModuleGraph::new(Rc::new(MavenOrder));
        let platform = graph.module_for(&key("platform"));
        let a = select(&mut graph, "a", "1.0");
        let mut state = VirtualPlatformState::new(platform);
        assert!(state.participating_module(a, &mut graph));
        assert!(graph.nodes.iter().all(|n| !n.needs_virtual_platform_refresh()));
        assert_eq!(state.candidate_versions(&graph), vec![Version::new("1.0")]);
    }

    #[test]
    fn forced_version_is_the_lowest_strong_opinion() {
        let mut graph = ModuleGraph::new(Rc::new(MavenOrder));
        let platform = graph.module_for(&key("platform"));
        use_dep(&mut graph, require("platform", "1.0"));
        let state = VirtualPlatformState::new(platform);
        assert_eq!(state.forced_version(&graph), None);
        assert!(!state.is_greater_than_forced_version(&Version::new("0.1"), &graph));

        use_dep(&mut graph, require("platform", "3.0").forced());
        use_dep(&mut graph, strictly("platform", "2.0"));
        assert_eq!(state.forced_version(&graph), Some(Version::new("2.0")));
        assert!(state.is_greater_than_forced_version(&Version::new("1.9"), &graph));
        assert!(!state.is_greater_than_forced_version(&Version::new("2.0"), &graph));
        assert!(!state.is_greater_than_forced_version(&Version::new("2.1"), &graph));
    }

    #[test]
    fn candidates_never_fall_below_forced_version() {
        let mut graph = ModuleGraph::new(Rc::new(MavenOrder));
        let platform = select(&mut graph, "platform", "2.0");
        let mut state = VirtualPlatformState::new(platform);
        for (name, version) in [("a", "1.0"), ("b", "2.5"), ("c", "2.0"), ("d", "1.9")] {
            let m = select(&mut graph, name, version);
            state.participating_module(m, &mut graph);
        }
        use_dep(&mut graph, require("platform", "2.0").forced());

        let forced = state.forced_version(&graph).unwrap();
        let candidates = state.candidate_versions(&graph);
        assert_eq!(candidates, vec![Version::new("2.5"), Version::new("2.0")]);
        assert!(candidates
            .iter()
            .all(|v| graph.order().compare(v, &forced).is_ge()));
    }

    #[test]
    fn forced_member_makes_platform_forced() {
        let mut graph = ModuleGraph::new(Rc::new(MavenOrder));
        let platform = graph.module_for(&key("platform"));
        let mut state = VirtualPlatformState::new(platform);
        let mut opts = ResolveOptimizations::default();

        let a = graph.module_for(&key("a"));
        state.participating_module(a, &mut graph);
        assert!(!state.is_forced(&graph, &mut opts));
        assert!(!opts.is_forced_platform_in_use());

        use_dep(&mut graph, require("a", "1.0").forced());
        assert!(state.is_forced(&graph, &mut opts));
        assert!(opts.is_forced_platform_in_use());
    }

    #[test]
    fn orphan_edges_attach_once_in_order() {
        let mut state = VirtualPlatformState::new(ModuleId(0));
        for i in [3, 1, 2] {
            state.add_orphan_edge(EdgeId(i));
        }
        let mut seen = Vec::new();
        state
            .attach_orphan_edges(|edge| {
                seen.push(edge);
                Ok::<_, ()>(())
            })
            .unwrap();
        assert_eq!(seen, vec![EdgeId(3), EdgeId(1), EdgeId(2)]);
        assert!(state.orphan_edges().is_empty());

        state.attach_orphan_edges(|_| Err(())).unwrap();
    }
}
