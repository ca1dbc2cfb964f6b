//! Graph reversal: "what requires X" instead of "what does X require".

use super::dependency_graph::{DependencyGraph, RequirementEdge};

impl DependencyGraph {
    /// Returns a new graph with every resolved edge inverted.
    ///
    /// Every key of `self` stays a key, with an empty list when nothing
    /// points at it. Each reversed edge keeps the constraint the dependant
    /// declared. Unresolved edges have no node to attach to and are dropped.
    /// Within each entry, dependants appear in the key order of `self`.
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
    /// let reversed = DependencyGraph::from_registry(&registry).reverse();
    /// assert!(reversed.is_reversed());
    /// let dependants = reversed.edges("b").unwrap();
    /// assert_eq!(dependants[0].key, "a");
    /// assert_eq!(dependants[0].constraint.as_str(), ">=1.0");
    /// assert!(reversed.edges("a").unwrap().is_empty());
    /// ```
    pub fn reverse(&self) -> DependencyGraph {
        let mut inverted: Vec<Vec<RequirementEdge>> = vec![Vec::new(); self.node_count()];

        for (owner, edges) in self.iter() {
            for edge in edges.iter().filter(|e| e.is_resolved()) {
                if let Some(target) = self.position(&edge.key) {
                    inverted[target].push(RequirementEdge::resolved(owner, edge.constraint.clone()));
                }
            }
        }

        let nodes = self.packages().iter().cloned().zip(inverted).collect();
        DependencyGraph::from_parts(self.direction().opposite(), nodes)
    }
}

/// Free-function form of [`DependencyGraph::reverse`].
pub fn reverse(graph: &DependencyGraph) -> DependencyGraph {
    graph.reverse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PackageEntry, Registry};
    use std::collections::BTreeSet;

    fn graph(entries: Vec<PackageEntry>) -> DependencyGraph {
        DependencyGraph::from_registry(&Registry::build(entries).unwrap())
    }

    fn resolved_edges(graph: &DependencyGraph) -> BTreeSet<(String, String, String)> {
        graph
            .iter()
            .flat_map(|(pkg, edges)| {
                edges
                    .iter()
                    .filter(|e| e.is_resolved())
                    .map(|e| (pkg.key.clone(), e.key.clone(), e.constraint.as_str().to_string()))
            })
            .collect()
    }

    #[test]
    fn test_leaves_keep_empty_entries() {
        let reversed = graph(vec![
            PackageEntry::new("a", "1.0").requires("b", ""),
            PackageEntry::new("b", "1.0"),
            PackageEntry::new("lonely", "1.0"),
        ])
        .reverse();

        assert_eq!(reversed.node_count(), 3);
        assert!(reversed.edges("lonely").unwrap().is_empty());
        assert!(reversed.edges("a").unwrap().is_empty());
        assert_eq!(reversed.edges("b").unwrap().len(), 1);
    }

    #[test]
    fn test_unresolved_edges_dropped() {
        let reversed = graph(vec![PackageEntry::new("a", "1.0").requires("ghost", ">=1")]).reverse();

        assert_eq!(reversed.node_count(), 1);
        assert_eq!(reversed.edge_count(), 0);
        assert!(!reversed.contains("ghost"));
    }

    #[test]
    fn test_dependants_in_key_order() {
        let reversed = graph(vec![
            PackageEntry::new("zeta", "1.0").requires("core", ">=1"),
            PackageEntry::new("core", "1.5"),
            PackageEntry::new("alpha", "1.0").requires("core", "<2"),
        ])
        .reverse();

        let dependants: Vec<(&str, &str)> = reversed
            .edges("core")
            .unwrap()
            .iter()
            .map(|e| (e.key.as_str(), e.constraint.as_str()))
            .collect();
        assert_eq!(dependants, vec![("zeta", ">=1"), ("alpha", "<2")]);
        assert_eq!(
            reversed.edges("core").unwrap()[0].installed_version().unwrap().as_str(),
            "1.0"
        );
    }

    #[test]
    fn test_double_reverse_restores_resolved_edges() {
        let original = graph(vec![
            PackageEntry::new("a", "1.0").requires("b", ">=1.0").requires("c", ""),
            PackageEntry::new("b", "1.0").requires("c", "~=2.0").requires("ghost", ""),
            PackageEntry::new("c", "2.1").requires("a", "!=0.9"),
        ]);

        let twice = original.reverse().reverse();

        assert!(!twice.is_reversed());
        assert_eq!(resolved_edges(&twice), resolved_edges(&original));
        assert!(twice
            .iter()
            .all(|(_, edges)| edges.iter().all(|e| e.is_resolved())));
    }

    #[test]
    fn test_self_edge_survives_reversal() {
        let reversed = reverse(&graph(vec![PackageEntry::new("me", "1.0").requires("me", "")]));
        assert_eq!(reversed.edges("me").unwrap()[0].key, "me");
    }
}
