//! Dependency graph storage.
//!
//! Nodes are keyed by canonical name and each node owns an ordered list of
//! [`RequirementEdge`]s. Edges refer to their target by name, never by
//! pointer, so cycles need no special ownership handling and a graph can be
//! compared or serialized directly. Graphs are immutable once built; the
//! reverse and filter operations return new graphs.

use petgraph::algo::{is_cyclic_directed, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::resolver::resolve;
use crate::registry::{canonicalize, Package, Registry, Version, VersionConstraint};

/// Whether a requirement matched an installed package.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Resolution {
    /// The target is installed at `version`
    Resolved {
        /// Installed version of the target
        version: Version,
    },
    /// Nothing with the required name is installed
    Unresolved,
}

/// A directed edge from an owning package to another package.
///
/// In a forward graph the edge points at a requirement; in a reversed graph
/// it points at a dependant, and `constraint` is what that dependant
/// declared.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequirementEdge {
    /// Canonical name of the package this edge points to
    pub key: String,
    /// Display name of the package this edge points to
    pub name: String,
    /// Declared constraint on the required package
    pub constraint: VersionConstraint,
    /// Resolution state, fixed at construction
    pub resolution: Resolution,
}

impl RequirementEdge {
    /// Creates an edge resolved to an installed package.
    pub fn resolved(target: &Package, constraint: VersionConstraint) -> Self {
        Self {
            key: target.key.clone(),
            name: target.name.clone(),
            constraint,
            resolution: Resolution::Resolved {
                version: target.version.clone(),
            },
        }
    }

    /// Creates an edge whose target is not installed.
    pub fn unresolved(name: &str, constraint: VersionConstraint) -> Self {
        Self {
            key: canonicalize(name),
            name: name.to_string(),
            constraint,
            resolution: Resolution::Unresolved,
        }
    }

    /// Returns true if the target is installed.
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolution, Resolution::Resolved { .. })
    }

    /// Installed version of the target, if resolved.
    pub fn installed_version(&self) -> Option<&Version> {
        match &self.resolution {
            Resolution::Resolved { version } => Some(version),
            Resolution::Unresolved => None,
        }
    }

    /// Whether the installed target satisfies the constraint.
    ///
    /// `None` for unresolved edges and undecidable comparisons.
    pub fn is_satisfied(&self) -> Option<bool> {
        self.installed_version()
            .and_then(|v| self.constraint.satisfied_by(v))
    }
}

/// Package-to-edges mapping built from a [`Registry`].
///
/// # Example
///
/// ```rust
/// use deptree::graph::DependencyGraph;
/// use deptree::registry::{PackageEntry, Registry};
///
/// let registry = Registry::build(vec![
///     PackageEntry::new("a", "1.0").requires("b", ">=1.0"),
///     PackageEntry::new("b", "1.0"),
/// ])
/// .unwrap();
///
/// let graph = DependencyGraph::from_registry(&registry);
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 1);
/// assert_eq!(graph.edges("a").unwrap()[0].key, "b");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyGraph {
    /// `Outgoing` for requirements, `Incoming` for dependants
    direction: Direction,
    packages: Vec<Package>,
    edges: Vec<Vec<RequirementEdge>>,
    /// Maps canonical names to positions for O(1) lookup
    index: HashMap<String, usize>,
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::from_parts(Direction::Outgoing, Vec::new())
    }
}

impl DependencyGraph {
    /// Builds the forward graph: one resolver pass per registry package.
    pub fn from_registry(registry: &Registry) -> Self {
        let nodes = registry
            .iter()
            .map(|(package, declared)| (package.clone(), resolve(package, declared, registry)))
            .collect();
        Self::from_parts(Direction::Outgoing, nodes)
    }

    /// Assembles a graph from nodes in key order. Later duplicates of a key
    /// are ignored.
    pub(crate) fn from_parts(
        direction: Direction,
        nodes: Vec<(Package, Vec<RequirementEdge>)>,
    ) -> Self {
        let mut graph = Self {
            direction,
            packages: Vec::with_capacity(nodes.len()),
            edges: Vec::with_capacity(nodes.len()),
            index: HashMap::with_capacity(nodes.len()),
        };
        for (package, edges) in nodes {
            if graph.index.contains_key(&package.key) {
                continue;
            }
            graph.index.insert(package.key.clone(), graph.packages.len());
            graph.packages.push(package);
            graph.edges.push(edges);
        }
        graph
    }

    /// Edge direction relative to the requirement relation.
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Returns true if edges point from a package to its dependants.
    pub fn is_reversed(&self) -> bool {
        self.direction == Direction::Incoming
    }

    /// Looks up a package by any spelling of its name.
    pub fn get(&self, name: &str) -> Option<&Package> {
        self.position(name).map(|idx| &self.packages[idx])
    }

    /// Ordered edges of the package with the given name.
    pub fn edges(&self, name: &str) -> Option<&[RequirementEdge]> {
        self.position(name).map(|idx| self.edges[idx].as_slice())
    }

    /// Returns true if the package is a key of this graph.
    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Iterates keys with their edges, in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&Package, &[RequirementEdge])> {
        self.packages
            .iter()
            .zip(self.edges.iter().map(Vec::as_slice))
    }

    /// Canonical names of all keys, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|p| p.key.as_str())
    }

    /// All key packages, in key order.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Number of keys.
    pub fn node_count(&self) -> usize {
        self.packages.len()
    }

    /// Number of edges, resolved or not.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().map(Vec::len).sum()
    }

    /// Returns true if the graph has no keys.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    /// Checks whether any cycle runs through resolved edges.
    ///
    /// # Example
    ///
    /// ```rust
    /// use deptree::graph::DependencyGraph;
    /// use deptree::registry::{PackageEntry, Registry};
    ///
    /// let registry = Registry::build(vec![
    ///     PackageEntry::new("a", "1.0").requires("b", ""),
    ///     PackageEntry::new("b", "1.0").requires("a", ""),
    /// ])
    /// .unwrap();
    ///
    /// assert!(DependencyGraph::from_registry(&registry).has_cycles());
    /// ```
    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.to_petgraph())
    }

    /// Canonical names of every key that lies on some cycle.
    ///
    /// Useful for marking nodes when rendering; use
    /// [`crate::validate::find_cycles`] for the cycle paths themselves.
    pub fn nodes_in_cycles(&self) -> HashSet<String> {
        let graph = self.to_petgraph();
        let mut members = HashSet::new();

        for scc in tarjan_scc(&graph) {
            // A single node only counts if it requires itself
            let cyclic = scc.len() > 1 || scc.first().is_some_and(|&n| graph.contains_edge(n, n));
            if cyclic {
                members.extend(scc.iter().map(|n| self.packages[n.index()].key.clone()));
            }
        }

        members
    }

    pub(crate) fn position(&self, name: &str) -> Option<usize> {
        self.index
            .get(name)
            .or_else(|| self.index.get(&canonicalize(name)))
            .copied()
    }

    /// Edges of the key at position `idx`.
    pub(crate) fn edges_at(&self, idx: usize) -> &[RequirementEdge] {
        &self.edges[idx]
    }

    /// Positions of the resolved targets of the node at `idx` that are keys
    /// of this graph, in edge order.
    pub(crate) fn resolved_successors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges[idx]
            .iter()
            .filter(|e| e.is_resolved())
            .filter_map(|e| self.index.get(&e.key).copied())
    }

    /// Projects the resolved-edge subgraph onto petgraph. Node `i` of the
    /// result is key `i` of this graph.
    pub(crate) fn to_petgraph(&self) -> DiGraph<(), ()> {
        let mut graph = DiGraph::with_capacity(self.packages.len(), self.edge_count());
        for _ in &self.packages {
            graph.add_node(());
        }
        for idx in 0..self.packages.len() {
            for target in self.resolved_successors(idx) {
                graph.add_edge(NodeIndex::new(idx), NodeIndex::new(target), ());
            }
        }
        graph
    }
}
