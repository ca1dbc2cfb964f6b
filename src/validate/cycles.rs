//! Cycle detection over resolved edges.

use serde::Serialize;

use crate::graph::DependencyGraph;

/// A dependency cycle as an ordered path that returns to its start.
///
/// `a -> b -> a` is stored as `["a", "b", "a"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    /// Canonical names along the cycle, first name repeated at the end
    pub nodes: Vec<String>,
}

impl Cycle {
    /// Returns a formatted string representation of the cycle path.
    ///
    /// For example: "a => b => c => a"
    pub fn cycle_path(&self) -> String {
        self.nodes.join(" => ")
    }

    /// The distinct packages on the cycle, in path order.
    pub fn members(&self) -> &[String] {
        match self.nodes.split_last() {
            Some((_, members)) => members,
            None => &[],
        }
    }

    /// Returns the number of packages in the cycle.
    pub fn len(&self) -> usize {
        self.members().len()
    }

    /// Returns true if the cycle is empty (should not happen in practice).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

/// Finds cycles with an iterative depth-first search from every key.
///
/// Each back-edge to a node on the current path yields one cycle. Fully
/// explored nodes are never entered again, so the walk is linear in the
/// number of edges and a node may still show up in several cycles.
///
/// # Example
///
/// ```rust
/// use deptree::graph::build_graph;
/// use deptree::registry::{PackageEntry, Registry};
/// use deptree::validate::find_cycles;
///
/// let registry = Registry::build(vec![
///     PackageEntry::new("a", "1.0").requires("b", ""),
///     PackageEntry::new("b", "1.0").requires("c", ""),
///     PackageEntry::new("c", "1.0").requires("a", ""),
/// ])
/// .unwrap();
///
/// let cycles = find_cycles(&build_graph(&registry));
/// assert_eq!(cycles.len(), 1);
/// assert_eq!(cycles[0].cycle_path(), "a => b => c => a");
/// ```
pub fn find_cycles(graph: &DependencyGraph) -> Vec<Cycle> {
    let keys: Vec<&str> = graph.keys().collect();
    let successors: Vec<Vec<usize>> = (0..keys.len())
        .map(|idx| graph.resolved_successors(idx).collect())
        .collect();

    let mut marks = vec![Mark::Unvisited; keys.len()];
    let mut cycles = Vec::new();
    // (node, index of the next successor to visit)
    let mut stack: Vec<(usize, usize)> = Vec::new();

    for start in 0..keys.len() {
        if marks[start] != Mark::Unvisited {
            continue;
        }
        marks[start] = Mark::OnPath;
        stack.push((start, 0));

        while let Some(top) = stack.last_mut() {
            let node = top.0;
            let Some(&next) = successors[node].get(top.1) else {
                marks[node] = Mark::Done;
                stack.pop();
                continue;
            };
            top.1 += 1;

            match marks[next] {
                Mark::Unvisited => {
                    marks[next] = Mark::OnPath;
                    stack.push((next, 0));
                }
                Mark::OnPath => {
                    if let Some(pos) = stack.iter().rposition(|&(n, _)| n == next) {
                        let mut nodes: Vec<String> =
                            stack[pos..].iter().map(|&(n, _)| keys[n].to_string()).collect();
                        nodes.push(keys[next].to_string());
                        cycles.push(Cycle { nodes });
                    }
                }
                Mark::Done => {}
            }
        }
    }

    cycles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::registry::{PackageEntry, Registry};
    use std::collections::HashSet;

    fn graph(entries: Vec<PackageEntry>) -> DependencyGraph {
        build_graph(&Registry::build(entries).unwrap())
    }

    #[test]
    fn test_three_node_cycle() {
        let cycles = find_cycles(&graph(vec![
            PackageEntry::new("A", "1.0").requires("B", ""),
            PackageEntry::new("B", "1.0").requires("C", ""),
            PackageEntry::new("C", "1.0").requires("A", ""),
        ]));

        assert_eq!(cycles.len(), 1);
        let members: HashSet<&str> = cycles[0].members().iter().map(String::as_str).collect();
        assert_eq!(members, HashSet::from(["a", "b", "c"]));
        assert_eq!(cycles[0].nodes.first(), cycles[0].nodes.last());
        assert_eq!(cycles[0].len(), 3);
    }

    #[test]
    fn test_acyclic_graph() {
        let cycles = find_cycles(&graph(vec![
            PackageEntry::new("a", "1.0").requires("b", "").requires("c", ""),
            PackageEntry::new("b", "1.0").requires("c", ""),
            PackageEntry::new("c", "1.0"),
        ]));
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_self_loop() {
        let cycles = find_cycles(&graph(vec![PackageEntry::new("me", "1.0").requires("me", "")]));
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["me", "me"]);
        assert_eq!(cycles[0].cycle_path(), "me => me");
    }

    #[test]
    fn test_unresolved_edges_ignored() {
        let cycles = find_cycles(&graph(vec![
            PackageEntry::new("a", "1.0").requires("ghost", ""),
        ]));
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_two_cycles_sharing_a_node() {
        let cycles = find_cycles(&graph(vec![
            PackageEntry::new("hub", "1.0").requires("x", "").requires("y", ""),
            PackageEntry::new("x", "1.0").requires("hub", ""),
            PackageEntry::new("y", "1.0").requires("hub", ""),
        ]));

        let paths: Vec<String> = cycles.iter().map(Cycle::cycle_path).collect();
        assert_eq!(paths, vec!["hub => x => hub", "hub => y => hub"]);
    }

    #[test]
    fn test_cycle_found_from_later_start() {
        let cycles = find_cycles(&graph(vec![
            PackageEntry::new("entry", "1.0").requires("p", ""),
            PackageEntry::new("p", "1.0").requires("q", ""),
            PackageEntry::new("q", "1.0").requires("p", ""),
        ]));
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].nodes, vec!["p", "q", "p"]);
    }

    #[test]
    fn test_deep_chain_does_not_overflow() {
        let depth = 50_000;
        let entries: Vec<PackageEntry> = (0..depth)
            .map(|i| {
                let entry = PackageEntry::new(format!("pkg{i}"), "1.0");
                if i + 1 < depth {
                    entry.requires(format!("pkg{}", i + 1), "")
                } else {
                    entry.requires("pkg0", "")
                }
            })
            .collect();

        let cycles = find_cycles(&graph(entries));
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), depth);
    }

    #[test]
    fn test_reversed_cycle() {
        let forward = graph(vec![
            PackageEntry::new("a", "1.0").requires("b", ""),
            PackageEntry::new("b", "1.0").requires("a", ""),
        ]);
        let cycles = find_cycles(&forward.reverse());
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), 2);
    }

    #[test]
    fn test_cycle_accessors_on_empty() {
        let cycle = Cycle { nodes: Vec::new() };
        assert!(cycle.is_empty());
        assert_eq!(cycle.len(), 0);
        assert_eq!(cycle.cycle_path(), "");
    }
}
