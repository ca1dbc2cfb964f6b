//! Include/exclude filtering with closure semantics.
//!
//! Selection entries are package names or shell-style wildcards
//! (`*`, `?`, `[...]`), both compared against canonical names.

use glob::Pattern;
use petgraph::visit::Dfs;
use petgraph::graph::NodeIndex;
use std::collections::BTreeSet;
use tracing::debug;

use super::dependency_graph::DependencyGraph;
use crate::error::{GraphError, GraphResult};
use crate::registry::canonicalize;

/// A single include or exclude entry.
#[derive(Debug, Clone)]
struct NamePattern {
    raw: String,
    key: String,
    glob: Option<Pattern>,
}

impl NamePattern {
    fn new(raw: &str) -> Self {
        let key = canonicalize(raw);
        let glob = key
            .contains(['*', '?', '['])
            .then(|| Pattern::new(&key).ok())
            .flatten();
        Self {
            raw: raw.trim().to_string(),
            key,
            glob,
        }
    }

    fn matches(&self, key: &str) -> bool {
        match &self.glob {
            Some(glob) => glob.matches(key),
            None => self.key == key,
        }
    }
}

fn compile(names: &[&str]) -> Vec<NamePattern> {
    names
        .iter()
        .filter(|n| !n.trim().is_empty())
        .map(|n| NamePattern::new(n))
        .collect()
}

impl DependencyGraph {
    /// Returns a new graph restricted to an include/exclude selection.
    ///
    /// With `include`, the result starts from the matching keys and takes
    /// their closure over resolved edges. Keys matching `exclude` are then
    /// removed, together with every edge that points at an excluded name.
    /// Other edges are kept as they are, including unresolved ones and
    /// edges to packages outside the result. `None` on either axis leaves
    /// that axis untouched.
    ///
    /// # Errors
    ///
    /// [`GraphError::UnknownPackage`] listing every `include` entry that
    /// matched no key.
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
    ///     PackageEntry::new("c", "1.0").requires("a", ">=1.0"),
    /// ])
    /// .unwrap();
    /// let graph = DependencyGraph::from_registry(&registry);
    ///
    /// let only_c = graph.filter(Some(&["c"]), None).unwrap();
    /// assert_eq!(only_c.node_count(), 3);
    ///
    /// let only_b = graph.filter(Some(&["b"]), None).unwrap();
    /// assert_eq!(only_b.keys().collect::<Vec<_>>(), vec!["b"]);
    ///
    /// assert!(graph.filter(Some(&["nope"]), None).is_err());
    /// ```
    pub fn filter(&self, include: Option<&[&str]>, exclude: Option<&[&str]>) -> GraphResult<Self> {
        // Blank include entries leave the include axis untouched
        let include = include.map(compile).filter(|patterns| !patterns.is_empty());
        let mut keep = match include {
            Some(include) => self.closure(&self.select_roots(&include)?),
            None => vec![true; self.node_count()],
        };

        let exclude = exclude.map(compile).unwrap_or_default();
        let is_excluded = |key: &str| exclude.iter().any(|p| p.matches(key));

        for (slot, key) in keep.iter_mut().zip(self.keys()) {
            if *slot && is_excluded(key) {
                *slot = false;
            }
        }

        let nodes: Vec<_> = self
            .iter()
            .zip(&keep)
            .filter(|(_, &kept)| kept)
            .map(|((package, edges), _)| {
                let edges = edges
                    .iter()
                    .filter(|e| !is_excluded(e.key.as_str()))
                    .cloned()
                    .collect();
                (package.clone(), edges)
            })
            .collect();

        debug!(
            before = self.node_count(),
            after = nodes.len(),
            "filtered dependency graph"
        );
        Ok(Self::from_parts(self.direction(), nodes))
    }

    /// Positions of keys matched by the include patterns, in key order.
    fn select_roots(&self, include: &[NamePattern]) -> GraphResult<Vec<usize>> {
        let mut matched = vec![false; include.len()];
        let mut roots = Vec::new();

        for (idx, key) in self.keys().enumerate() {
            let mut hit = false;
            for (i, pattern) in include.iter().enumerate() {
                if pattern.matches(key) {
                    matched[i] = true;
                    hit = true;
                }
            }
            if hit {
                roots.push(idx);
            }
        }

        let unknown: BTreeSet<String> = include
            .iter()
            .zip(&matched)
            .filter(|(_, &m)| !m)
            .map(|(p, _)| p.raw.clone())
            .collect();
        if !unknown.is_empty() {
            return Err(GraphError::UnknownPackage {
                names: unknown.into_iter().collect(),
            });
        }
        Ok(roots)
    }

    /// Marks every key reachable from `roots` over resolved edges.
    fn closure(&self, roots: &[usize]) -> Vec<bool> {
        let mut reached = vec![false; self.node_count()];
        let Some(&first) = roots.first() else {
            return reached;
        };

        let graph = self.to_petgraph();
        let mut dfs = Dfs::new(&graph, NodeIndex::new(first));
        for &root in roots {
            dfs.move_to(NodeIndex::new(root));
            while let Some(node) = dfs.next(&graph) {
                reached[node.index()] = true;
            }
        }
        reached
    }
}

/// Free-function form of [`DependencyGraph::filter`].
pub fn filter(
    graph: &DependencyGraph,
    include: Option<&[&str]>,
    exclude: Option<&[&str]>,
) -> GraphResult<DependencyGraph> {
    graph.filter(include, exclude)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{PackageEntry, Registry};

    fn sample() -> DependencyGraph {
        DependencyGraph::from_registry(
            &Registry::build(vec![
                PackageEntry::new("a", "1.0").requires("b", ">=1.0"),
                PackageEntry::new("b", "1.0"),
                PackageEntry::new("c", "1.0").requires("a", ">=1.0"),
            ])
            .unwrap(),
        )
    }

    fn wide() -> DependencyGraph {
        DependencyGraph::from_registry(
            &Registry::build(vec![
                PackageEntry::new("app", "1.0")
                    .requires("web", "")
                    .requires("db", "")
                    .requires("ghost", ">=1"),
                PackageEntry::new("web", "2.0").requires("util", ""),
                PackageEntry::new("db", "3.0").requires("util", ""),
                PackageEntry::new("util", "1.1"),
                PackageEntry::new("tool-one", "0.1"),
                PackageEntry::new("tool-two", "0.2").requires("util", ""),
            ])
            .unwrap(),
        )
    }

    fn keys(graph: &DependencyGraph) -> Vec<&str> {
        graph.keys().collect()
    }

    #[test]
    fn test_identity_without_selection() {
        let graph = wide();
        assert_eq!(graph.filter(None, None).unwrap(), graph);
    }

    #[test]
    fn test_include_takes_closure() {
        let graph = sample();
        let filtered = graph.filter(Some(&["c"]), None).unwrap();
        assert_eq!(keys(&filtered), vec!["a", "b", "c"]);

        let filtered = graph.filter(Some(&["b"]), None).unwrap();
        assert_eq!(keys(&filtered), vec!["b"]);
    }

    #[test]
    fn test_include_multiple_roots() {
        let filtered = wide().filter(Some(&["web", "tool-one"]), None).unwrap();
        assert_eq!(keys(&filtered), vec!["web", "util", "tool-one"]);
    }

    #[test]
    fn test_include_survives_cycles() {
        let graph = DependencyGraph::from_registry(
            &Registry::build(vec![
                PackageEntry::new("a", "1.0").requires("b", ""),
                PackageEntry::new("b", "1.0").requires("c", ""),
                PackageEntry::new("c", "1.0").requires("a", ""),
                PackageEntry::new("d", "1.0"),
            ])
            .unwrap(),
        );
        let filtered = graph.filter(Some(&["b"]), None).unwrap();
        assert_eq!(keys(&filtered), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_unknown_include_reports_all_names() {
        let err = sample()
            .filter(Some(&["zzz", "a", "Missing_One"]), None)
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownPackage {
                names: vec!["Missing_One".to_string(), "zzz".to_string()]
            }
        );
    }

    #[test]
    fn test_exclude_removes_keys_and_edges_to_them() {
        let graph = wide();
        let filtered = graph.filter(None, Some(&["util"])).unwrap();

        assert_eq!(filtered.node_count(), graph.node_count() - 1);
        assert!(!filtered.contains("util"));
        assert!(filtered.edges("web").unwrap().is_empty());
        assert!(filtered.edges("db").unwrap().is_empty());
        assert!(filtered.edges("tool-two").unwrap().is_empty());
        // untouched edges stay as they were, unresolved included
        assert_eq!(filtered.edges("app").unwrap(), graph.edges("app").unwrap());
    }

    #[test]
    fn test_exclude_drops_unresolved_edges_by_name() {
        let graph = wide();
        let filtered = graph.filter(None, Some(&["ghost"])).unwrap();
        assert_eq!(keys(&filtered), keys(&graph));
        let app_edges = filtered.edges("app").unwrap();
        assert_eq!(app_edges.len(), 2);
        assert!(app_edges.iter().all(|e| e.key != "ghost"));
    }

    #[test]
    fn test_include_and_exclude() {
        let filtered = wide().filter(Some(&["app"]), Some(&["db"])).unwrap();

        assert_eq!(keys(&filtered), vec!["app", "web", "util"]);
        let app: Vec<&str> = filtered
            .edges("app")
            .unwrap()
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(app, vec!["web", "ghost"]);
    }

    #[test]
    fn test_edges_outside_result_are_kept() {
        use crate::graph::RequirementEdge;
        use crate::registry::{Package, VersionConstraint};
        use petgraph::Direction;

        let gone = Package::new("gone", "1.0");
        let graph = DependencyGraph::from_parts(
            Direction::Outgoing,
            vec![(
                Package::new("a", "1.0"),
                vec![RequirementEdge::resolved(&gone, VersionConstraint::parse(">=1"))],
            )],
        );

        let filtered = graph.filter(Some(&["a"]), None).unwrap();
        assert_eq!(keys(&filtered), vec!["a"]);
        assert_eq!(filtered.edges("a").unwrap()[0].key, "gone");
    }

    #[test]
    fn test_wildcard_patterns() {
        let graph = wide();
        let filtered = graph.filter(Some(&["tool-*"]), None).unwrap();
        assert_eq!(keys(&filtered), vec!["util", "tool-one", "tool-two"]);

        let filtered = graph.filter(None, Some(&["tool_*"])).unwrap();
        assert!(!filtered.contains("tool-one"));
        assert!(!filtered.contains("tool-two"));

        let err = graph.filter(Some(&["nothing*"]), None).unwrap_err();
        assert_eq!(
            err,
            GraphError::UnknownPackage {
                names: vec!["nothing*".to_string()]
            }
        );
    }

    #[test]
    fn test_filter_reversed_graph() {
        let reversed = sample().reverse();
        let filtered = filter(&reversed, Some(&["b"]), None).unwrap();

        assert!(filtered.is_reversed());
        assert_eq!(keys(&filtered), vec!["a", "b", "c"]);
        let filtered = filter(&reversed, Some(&["c"]), None).unwrap();
        assert_eq!(keys(&filtered), vec!["c"]);
    }

    #[test]
    fn test_blank_entries_ignored() {
        let graph = sample();
        assert_eq!(graph.filter(None, Some(&[""])).unwrap(), graph);
        assert_eq!(graph.filter(Some(&["", "  "]), None).unwrap(), graph);
    }
}
