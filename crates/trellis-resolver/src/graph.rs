//! The resolved dependency graph and its text renderings.

use std::collections::{HashMap, HashSet};
use std::fmt;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use trellis_core::module::ModuleKey;
use trellis_core::version::Version;

/// A selected component in the resolved graph.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct ResolvedNode {
    pub module: ModuleKey,
    pub version: Version,
    pub project: bool,
}

impl fmt::Display for ResolvedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.project {
            write!(f, "project {}", self.module)
        } else {
            write!(f, "{}:{}", self.module, self.version)
        }
    }
}

/// How a dependency was requested.
#[derive(Debug, Clone)]
pub struct DepEdge {
    /// The requested version as written, empty for project dependencies.
    pub requested: String,
}

/// A resolved dependency graph backed by petgraph.
#[derive(Debug)]
pub struct DependencyGraph {
    graph: DiGraph<ResolvedNode, DepEdge>,
    index: HashMap<ModuleKey, NodeIndex>,
    pub root: Option<NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            index: HashMap::new(),
            root: None,
        }
    }

    /// Add or retrieve the node for a module.
    pub fn add_node(&mut self, node: ResolvedNode) -> NodeIndex {
        if let Some(&idx) = self.index.get(&node.module) {
            return idx;
        }
        let key = node.module.clone();
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    pub fn set_root(&mut self, idx: NodeIndex) {
        self.root = Some(idx);
    }

    /// Add a dependency edge. The same module requested twice with different
    /// versions keeps one edge per requested version.
    pub fn add_edge(&mut self, from: NodeIndex, to: NodeIndex, edge: DepEdge) {
        let duplicate = self
            .graph
            .edges(from)
            .any(|e| e.target() == to && e.weight().requested == edge.requested);
        if !duplicate {
            self.graph.add_edge(from, to, edge);
        }
    }

    pub fn find(&self, module: &ModuleKey) -> Option<NodeIndex> {
        self.index.get(module).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> &ResolvedNode {
        &self.graph[idx]
    }

    /// All resolved nodes except the root.
    pub fn all_nodes(&self) -> Vec<&ResolvedNode> {
        self.graph
            .node_indices()
            .filter(|&idx| Some(idx) != self.root)
            .map(|idx| &self.graph[idx])
            .collect()
    }

    pub fn dependencies_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| (e.target(), e.weight()))
            .collect();
        // petgraph yields edges newest first
        deps.reverse();
        deps
    }

    /// Direct dependents, one entry per dependent module.
    pub fn dependents_of(&self, idx: NodeIndex) -> Vec<(NodeIndex, &DepEdge)> {
        let mut deps: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| (e.source(), e.weight()))
            .collect();
        deps.reverse();
        let mut seen = HashSet::new();
        deps.retain(|(source, _)| seen.insert(*source));
        deps
    }

    fn label(&self, idx: NodeIndex, edge: &DepEdge) -> String {
        let node = &self.graph[idx];
        if node.project || edge.requested.is_empty() || edge.requested == node.version.as_str() {
            node.to_string()
        } else {
            format!("{}:{} -> {}", node.module, edge.requested, node.version)
        }
    }

    /// Render the tree below the root, `requested -> selected` where they differ.
    /// Subtrees already printed are marked `(*)`.
    pub fn print_tree(&self, max_depth: Option<usize>) -> String {
        let mut output = String::new();
        let Some(root) = self.root else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[root]));

        let mut visited = HashSet::new();
        visited.insert(root);
        let deps = self.dependencies_of(root);
        let count = deps.len();
        for (i, (idx, edge)) in deps.iter().enumerate() {
            self.print_subtree(&mut output, *idx, edge, "", i == count - 1, 1, max_depth, &mut visited);
        }
        output
    }

    #[allow(clippy::too_many_arguments)]
    fn print_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        edge: &DepEdge,
        prefix: &str,
        is_last: bool,
        depth: usize,
        max_depth: Option<usize>,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}", self.label(idx, edge)));

        if !visited.insert(idx) {
            output.push_str(" (*)\n");
            return;
        }
        output.push('\n');
        if max_depth.is_some_and(|max| depth >= max) {
            return;
        }

        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let deps = self.dependencies_of(idx);
        let count = deps.len();
        for (i, (child, child_edge)) in deps.iter().enumerate() {
            self.print_subtree(
                output,
                *child,
                child_edge,
                &child_prefix,
                i == count - 1,
                depth + 1,
                max_depth,
                visited,
            );
        }
    }

    /// Path from the root to a module.
    ///
    /// Accepts `group:name` or just `name`.
    pub fn find_path(&self, target: &str) -> Option<Vec<&ResolvedNode>> {
        let root = self.root?;
        let target = self.resolve_key(target)?;
        let mut path = Vec::new();
        let mut visited = HashSet::new();
        if self.dfs_path(root, target, &mut path, &mut visited) {
            Some(path.iter().map(|&idx| &self.graph[idx]).collect())
        } else {
            None
        }
    }

    fn resolve_key(&self, key: &str) -> Option<NodeIndex> {
        if let Some(idx) = ModuleKey::parse(key).and_then(|k| self.find(&k)) {
            return Some(idx);
        }
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].module.name == key)
    }

    fn dfs_path(
        &self,
        current: NodeIndex,
        target: NodeIndex,
        path: &mut Vec<NodeIndex>,
        visited: &mut HashSet<NodeIndex>,
    ) -> bool {
        path.push(current);
        if current == target {
            return true;
        }
        if !visited.insert(current) {
            path.pop();
            return false;
        }
        for (child, _) in self.dependencies_of(current) {
            if self.dfs_path(child, target, path, visited) {
                return true;
            }
        }
        path.pop();
        false
    }

    /// Everything that depends on a module, as an upside-down tree.
    pub fn print_inverted_tree(&self, target: &str) -> String {
        let mut output = String::new();
        let Some(idx) = self.resolve_key(target) else {
            return output;
        };
        output.push_str(&format!("{}\n", self.graph[idx]));

        let mut visited = HashSet::new();
        visited.insert(idx);
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            self.print_inverted_subtree(&mut output, *dep_idx, "", i == count - 1, &mut visited);
        }
        output
    }

    fn print_inverted_subtree(
        &self,
        output: &mut String,
        idx: NodeIndex,
        prefix: &str,
        is_last: bool,
        visited: &mut HashSet<NodeIndex>,
    ) {
        let connector = if is_last { "└── " } else { "├── " };
        output.push_str(&format!("{prefix}{connector}{}\n", self.graph[idx]));
        if !visited.insert(idx) {
            return;
        }
        let child_prefix = format!("{prefix}{}", if is_last { "    " } else { "│   " });
        let dependents = self.dependents_of(idx);
        let count = dependents.len();
        for (i, (dep_idx, _)) in dependents.iter().enumerate() {
            self.print_inverted_subtree(output, *dep_idx, &child_prefix, i == count - 1, visited);
        }
        visited.remove(&idx);
    }

    /// Number of nodes, not counting the root.
    pub fn len(&self) -> usize {
        let total = self.graph.node_count();
        if self.root.is_some() {
            total.saturating_sub(1)
        } else {
            total
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, version: &str) -> ResolvedNode {
        ResolvedNode {
            module: ModuleKey::new("org.a", name),
            version: Version::new(version),
            project: false,
        }
    }

    fn edge(requested: &str) -> DepEdge {
        DepEdge {
            requested: requested.to_string(),
        }
    }

    fn sample() -> DependencyGraph {
        let mut g = DependencyGraph::new();
        let root = g.add_node(ResolvedNode {
            module: ModuleKey::new("com.example", "app"),
            version: Version::new("1.0"),
            project: true,
        });
        g.set_root(root);
        let web = g.add_node(node("web", "2.0"));
        let core = g.add_node(node("core", "1.2"));
        let json = g.add_node(node("json", "3.1"));
        g.add_edge(root, web, edge("2.0"));
        g.add_edge(root, core, edge("1.+"));
        g.add_edge(web, core, edge("1.1"));
        g.add_edge(core, json, edge("3.1"));
        g
    }

    #[test]
    fn add_node_is_idempotent_per_module() {
        let mut g = DependencyGraph::new();
        let a = g.add_node(node("core", "1.0"));
        let b = g.add_node(node("core", "2.0"));
        assert_eq!(a, b);
        assert_eq!(g.len(), 1);
    }

    #[test]
    fn tree_shows_requested_to_selected() {
        let tree = sample().print_tree(None);
        let expected = "\
project com.example:app
├── org.a:web:2.0
│   └── org.a:core:1.1 -> 1.2
│       └── org.a:json:3.1
└── org.a:core:1.+ -> 1.2 (*)
";
        assert_eq!(tree, expected);
    }

    #[test]
    fn each_requested_version_keeps_its_edge() {
        let mut g = sample();
        let root = g.root.unwrap();
        let core = g.find(&ModuleKey::new("org.a", "core")).unwrap();
        g.add_edge(root, core, edge("1.0"));
        g.add_edge(root, core, edge("1.0"));
        assert_eq!(g.dependencies_of(root).len(), 3);

        let tree = g.print_tree(None);
        assert!(tree.contains("└── org.a:core:1.0 -> 1.2 (*)\n"), "{tree}");
        assert!(tree.contains("├── org.a:core:1.+ -> 1.2 (*)\n"), "{tree}");

        // a dependent shows up once however many edges it has
        let inverted = g.print_inverted_tree("org.a:core");
        assert_eq!(inverted.matches("project com.example:app").count(), 2, "{inverted}");
    }

    #[test]
    fn depth_limit() {
        let tree = sample().print_tree(Some(1));
        assert_eq!(tree.lines().count(), 3);
    }

    #[test]
    fn path_to_transitive_module() {
        let g = sample();
        let path: Vec<String> = g
            .find_path("json")
            .unwrap()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(
            path,
            vec!["project com.example:app", "org.a:web:2.0", "org.a:core:1.2", "org.a:json:3.1"]
        );
        assert!(g.find_path("org.b:missing").is_none());
    }

    #[test]
    fn inverted_tree() {
        let inverted = sample().print_inverted_tree("org.a:core");
        let expected = "\
org.a:core:1.2
├── project com.example:app
└── org.a:web:2.0
    └── project com.example:app
";
        assert_eq!(inverted, expected);
    }
}
