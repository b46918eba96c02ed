//! Arenas for one resolution pass.
//!
//! Modules, components, nodes, edges and selectors refer to each other by id.
//! Ids are only meaningful within the [`ModuleGraph`] that issued them.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::trace;

use trellis_core::module::{ComponentIdentifier, ComponentSelector, ModuleKey};
use trellis_core::version::{Version, VersionOrder};
use trellis_util::errors::TrellisError;

use crate::conflict::ConflictTracker;
use crate::dependency::DependencyState;
use crate::latch::Latch;
use crate::module_selectors::{ModuleSelectors, SelectorLookup};
use crate::platform::VirtualPlatformState;
use crate::reason::SelectionReason;
use crate::result::ResolveFailure;
use crate::selector_state::SelectorState;

macro_rules! arena_id {
    ($($name:ident),*) => {$(
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub(crate) usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }
    )*};
}

arena_id!(ModuleId, ComponentId, NodeId, EdgeId, SelectorId);

/// Hints gathered during resolution that later phases may use to skip work.
#[derive(Debug, Default)]
pub struct ResolveOptimizations {
    forced_platform_in_use: Latch,
}

impl ResolveOptimizations {
    pub fn declare_forced_platform_in_use(&mut self) {
        self.forced_platform_in_use.set();
    }

    pub fn is_forced_platform_in_use(&self) -> bool {
        self.forced_platform_in_use.is_set()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStatus {
    Candidate,
    Selected,
    Evicted,
}

#[derive(Debug)]
pub struct ModuleResolveState {
    pub(crate) id: ModuleId,
    pub(crate) key: ModuleKey,
    pub(crate) selectors: ModuleSelectors<SelectorId>,
    pub(crate) versions: IndexMap<Version, ComponentId>,
    pub(crate) selected: Option<ComponentId>,
    pub(crate) selection_changes: u32,
    pub(crate) virtual_platform: bool,
}

impl ModuleResolveState {
    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    pub fn selectors(&self) -> &ModuleSelectors<SelectorId> {
        &self.selectors
    }

    pub fn selected(&self) -> Option<ComponentId> {
        self.selected
    }

    pub fn is_virtual_platform(&self) -> bool {
        self.virtual_platform
    }

    pub fn selection_changes(&self) -> u32 {
        self.selection_changes
    }

    pub fn versions(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.versions.values().copied()
    }
}

#[derive(Debug)]
pub struct ComponentState {
    pub(crate) id: ComponentId,
    pub(crate) module: ModuleId,
    pub(crate) identifier: ComponentIdentifier,
    pub(crate) status: SelectionStatus,
    pub(crate) reason: SelectionReason,
    pub(crate) node: NodeId,
}

impl ComponentState {
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn identifier(&self) -> &ComponentIdentifier {
        &self.identifier
    }

    pub fn version(&self) -> &Version {
        self.identifier.version()
    }

    pub fn status(&self) -> SelectionStatus {
        self.status
    }

    pub fn reason(&self) -> &SelectionReason {
        &self.reason
    }

    pub fn node(&self) -> NodeId {
        self.node
    }
}

#[derive(Debug)]
pub struct NodeState {
    pub(crate) id: NodeId,
    pub(crate) component: ComponentId,
    pub(crate) incoming: Vec<EdgeId>,
    pub(crate) outgoing: Vec<EdgeId>,
    pub(crate) visited: bool,
    pub(crate) virtual_platform_needs_refresh: bool,
}

impl NodeState {
    pub fn component(&self) -> ComponentId {
        self.component
    }

    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    /// The platform this node belongs to gained a member; its dependencies must be recomputed.
    pub fn mark_for_virtual_platform_refresh(&mut self) {
        self.virtual_platform_needs_refresh = true;
    }

    pub fn needs_virtual_platform_refresh(&self) -> bool {
        self.virtual_platform_needs_refresh
    }
}

#[derive(Debug)]
pub struct EdgeState {
    pub(crate) id: EdgeId,
    pub(crate) from: NodeId,
    pub(crate) dependency: Rc<DependencyState>,
    pub(crate) selector: SelectorId,
    pub(crate) target: Option<NodeId>,
    pub(crate) failure: Option<ResolveFailure>,
    /// Cleared once the edge has been released.
    pub(crate) active: bool,
}

impl EdgeState {
    pub fn from(&self) -> NodeId {
        self.from
    }

    pub fn dependency(&self) -> &DependencyState {
        &self.dependency
    }

    pub fn selector(&self) -> SelectorId {
        self.selector
    }

    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    pub fn failure(&self) -> Option<&ResolveFailure> {
        self.failure.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl SelectorLookup<SelectorId> for [SelectorState] {
    type Selector = SelectorState;

    fn selector(&self, key: SelectorId) -> &SelectorState {
        &self[key.0]
    }
}

/// Every module, component, node, edge and selector of one pass.
pub struct ModuleGraph {
    order: Rc<dyn VersionOrder>,
    pub(crate) modules: Vec<ModuleResolveState>,
    module_index: HashMap<ModuleKey, ModuleId>,
    pub(crate) components: Vec<ComponentState>,
    pub(crate) nodes: Vec<NodeState>,
    pub(crate) edges: Vec<EdgeState>,
    pub(crate) selectors: Vec<SelectorState>,
    selector_index: HashMap<(ComponentSelector, bool), SelectorId>,
}

impl ModuleGraph {
    pub fn new(order: Rc<dyn VersionOrder>) -> Self {
        Self {
            order,
            modules: Vec::new(),
            module_index: HashMap::new(),
            components: Vec::new(),
            nodes: Vec::new(),
            edges: Vec::new(),
            selectors: Vec::new(),
            selector_index: HashMap::new(),
        }
    }

    pub fn order(&self) -> &dyn VersionOrder {
        self.order.as_ref()
    }

    pub fn module(&self, id: ModuleId) -> &ModuleResolveState {
        &self.modules[id.0]
    }

    pub fn component(&self, id: ComponentId) -> &ComponentState {
        &self.components[id.0]
    }

    pub fn node(&self, id: NodeId) -> &NodeState {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeState {
        &mut self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &EdgeState {
        &self.edges[id.0]
    }

    pub fn selector(&self, id: SelectorId) -> &SelectorState {
        &self.selectors[id.0]
    }

    pub fn selector_mut(&mut self, id: SelectorId) -> &mut SelectorState {
        &mut self.selectors[id.0]
    }

    pub fn modules(&self) -> impl Iterator<Item = &ModuleResolveState> {
        self.modules.iter()
    }

    pub fn find_module(&self, key: &ModuleKey) -> Option<ModuleId> {
        self.module_index.get(key).copied()
    }

    /// Get or create the state for `key`.
    pub fn module_for(&mut self, key: &ModuleKey) -> ModuleId {
        if let Some(id) = self.module_index.get(key) {
            return *id;
        }
        let id = ModuleId(self.modules.len());
        self.modules.push(ModuleResolveState {
            id,
            key: key.clone(),
            selectors: ModuleSelectors::new(),
            versions: IndexMap::new(),
            selected: None,
            selection_changes: 0,
            virtual_platform: false,
        });
        self.module_index.insert(key.clone(), id);
        id
    }

    /// Get or create the component for `identifier`, together with its node.
    pub fn component_for(&mut self, identifier: &ComponentIdentifier) -> ComponentId {
        let module = self.module_for(identifier.module());
        if let Some(id) = self.modules[module.0].versions.get(identifier.version()) {
            return *id;
        }
        let id = ComponentId(self.components.len());
        let node = NodeId(self.nodes.len());
        self.components.push(ComponentState {
            id,
            module,
            identifier: identifier.clone(),
            status: SelectionStatus::Candidate,
            reason: SelectionReason::new(),
            node,
        });
        self.nodes.push(NodeState {
            id: node,
            component: id,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            visited: false,
            virtual_platform_needs_refresh: false,
        });
        self.modules[module.0]
            .versions
            .insert(identifier.version().clone(), id);
        id
    }

    pub fn selected_version(&self, module: ModuleId) -> Option<&Version> {
        self.modules[module.0]
            .selected
            .map(|c| self.components[c.0].version())
    }

    /// Get the selector shared by every edge stating `dependency`, creating it
    /// on first sight and merging the new statement otherwise.
    pub fn selector_for(
        &mut self,
        dependency: Rc<DependencyState>,
        version_by_ancestor: bool,
        optimizations: &mut ResolveOptimizations,
    ) -> Result<SelectorId, TrellisError> {
        let key = (dependency.requested.clone(), version_by_ancestor);
        if let Some(&id) = self.selector_index.get(&key) {
            self.selectors[id.0].update(dependency, optimizations)?;
            return Ok(id);
        }
        let id = SelectorId(self.selectors.len());
        let target = self.module_for(dependency.requested.target());
        let selector = SelectorState::new(id, dependency, target, version_by_ancestor, optimizations)?;
        self.selectors.push(selector);
        self.selector_index.insert(key, id);
        Ok(id)
    }

    pub fn add_edge(&mut self, from: NodeId, dependency: Rc<DependencyState>, selector: SelectorId) -> EdgeId {
        let id = EdgeId(self.edges.len());
        self.edges.push(EdgeState {
            id,
            from,
            dependency,
            selector,
            target: None,
            failure: None,
            active: true,
        });
        self.nodes[from.0].outgoing.push(id);
        id
    }

    /// Count one more edge routed through `id`. The first use inserts the
    /// selector into the ordered selectors of the module it requests.
    pub fn use_selector(&mut self, id: SelectorId, defer_selection: bool) {
        if !self.selectors[id.0].increment_use() {
            return;
        }
        let module = self.selectors[id.0].requested_module();
        self.modules[module.0]
            .selectors
            .add(id, defer_selection, self.selectors.as_slice(), self.order.as_ref());
        trace!(selector = %self.selectors[id.0], "selector in use");
    }

    /// Count one edge fewer. The last release removes the selector from its
    /// module and drops its cached results.
    ///
    /// Returns the module when it should re-run selection among the
    /// remaining selectors.
    pub fn release_selector(&mut self, id: SelectorId) -> Result<Option<ModuleId>, TrellisError> {
        if !self.selectors[id.0].decrement_use()? {
            return Ok(None);
        }
        let module = self.selectors[id.0].requested_module();
        if !self.modules[module.0].selectors.remove(id) {
            return Err(TrellisError::Invariant {
                message: format!(
                    "selector {} released but not a member of {}",
                    self.selectors[id.0], self.modules[module.0].key
                ),
            });
        }
        let already_reused = self.selectors[id.0].mark_for_reuse();
        self.selectors[id.0].mark_unresolved();
        trace!(selector = %self.selectors[id.0], "selector released");
        let m = &self.modules[module.0];
        let reselect = !already_reused && !m.selectors.is_empty() && m.selected.is_some();
        Ok(reselect.then_some(module))
    }

    /// First selection for a module.
    pub fn select(&mut self, module: ModuleId, component: ComponentId) -> Result<(), TrellisError> {
        if let Some(current) = self.modules[module.0].selected {
            return Err(TrellisError::Invariant {
                message: format!(
                    "{} already selected {}",
                    self.modules[module.0].key,
                    self.components[current.0].identifier
                ),
            });
        }
        self.modules[module.0].selected = Some(component);
        self.components[component.0].status = SelectionStatus::Selected;
        Ok(())
    }

    /// Move a module's selection to `component` and pin every selector of
    /// the module to it. Returns the previously selected component.
    pub fn change_selection(&mut self, module: ModuleId, component: ComponentId) -> Option<ComponentId> {
        let m = &mut self.modules[module.0];
        let previous = m.selected.replace(component);
        m.selection_changes += 1;
        if let Some(previous) = previous {
            self.components[previous.0].status = SelectionStatus::Evicted;
        }
        self.components[component.0].status = SelectionStatus::Selected;
        let owner = self.components[component.0].module;
        let keys: Vec<SelectorId> = self.modules[module.0].selectors.iter().collect();
        for key in keys {
            self.selectors[key.0].override_selection(owner);
        }
        previous
    }

    /// Point `edge` at `node`, detaching it from any previous target.
    pub fn attach_edge(&mut self, edge: EdgeId, node: NodeId) {
        if let Some(old) = self.edges[edge.0].target.replace(node) {
            self.nodes[old.0].incoming.retain(|e| *e != edge);
        }
        if !self.nodes[node.0].incoming.contains(&edge) {
            self.nodes[node.0].incoming.push(edge);
        }
    }

    pub fn detach_edge(&mut self, edge: EdgeId) {
        if let Some(old) = self.edges[edge.0].target.take() {
            self.nodes[old.0].incoming.retain(|e| *e != edge);
        }
    }

    /// Deactivate an edge and release its selector.
    pub fn release_edge(&mut self, edge: EdgeId) -> Result<Option<ModuleId>, TrellisError> {
        let e = &mut self.edges[edge.0];
        if !e.active {
            return Ok(None);
        }
        e.active = false;
        let selector = e.selector;
        if let Some(target) = e.target.take() {
            self.nodes[target.0].incoming.retain(|i| *i != edge);
        }
        self.release_selector(selector)
    }
}

/// Everything one resolution pass mutates.
pub struct ResolveState {
    pub graph: ModuleGraph,
    pub platforms: BTreeMap<ModuleId, VirtualPlatformState>,
    pub optimizations: ResolveOptimizations,
    pub conflicts: ConflictTracker,
}

impl ResolveState {
    pub fn new(order: Rc<dyn VersionOrder>) -> Self {
        Self {
            graph: ModuleGraph::new(order),
            platforms: BTreeMap::new(),
            optimizations: ResolveOptimizations::default(),
            conflicts: ConflictTracker::new(),
        }
    }

    /// The platform state for `module`, created on first request.
    pub fn platform_for(&mut self, module: ModuleId) -> &mut VirtualPlatformState {
        self.platforms
            .entry(module)
            .or_insert_with(|| VirtualPlatformState::new(module))
    }

    /// Record `member` as part of the virtual platform `platform`. Returns
    /// `true` on first registration.
    pub fn register_participant(&mut self, platform: ModuleId, member: ModuleId) -> bool {
        self.graph.modules[platform.0].virtual_platform = true;
        let state = self
            .platforms
            .entry(platform)
            .or_insert_with(|| VirtualPlatformState::new(platform));
        state.participating_module(member, &mut self.graph)
    }

    /// The virtual platform owning `module`, if any.
    pub fn platform_of(&self, module: ModuleId) -> Option<&VirtualPlatformState> {
        self.platforms
            .values()
            .find(|p| p.participating_modules().any(|m| m == module))
    }
}
