//! Graph module for dependency relationship modeling.
//!
//! This module provides the [`DependencyGraph`] built from a
//! [`Registry`](crate::registry::Registry), and the transformations over it:
//! [`reverse`] and [`filter`]. Each transformation returns a new graph, so
//! they compose in whatever order the caller picks.
//!
//! # Example
//!
//! ```rust
//! use deptree::graph::build_graph;
//! use deptree::registry::{PackageEntry, Registry};
//!
//! let registry = Registry::build(vec![
//!     PackageEntry::new("a", "1.0").requires("b", ">=1.0"),
//!     PackageEntry::new("b", "1.0"),
//!     PackageEntry::new("c", "1.0").requires("a", ">=1.0"),
//! ])
//! .unwrap();
//!
//! let graph = build_graph(&registry);
//! let who_needs_b = graph.reverse().filter(Some(&["b"]), None).unwrap();
//! assert_eq!(who_needs_b.node_count(), 3);
//! ```

mod dependency_graph;
mod filter;
mod resolver;
mod reverse;

pub use dependency_graph::{DependencyGraph, RequirementEdge, Resolution};
pub use filter::filter;
pub use resolver::resolve;
pub use reverse::reverse;

use crate::registry::Registry;

/// Builds the forward dependency graph for every package in `registry`.
pub fn build_graph(registry: &Registry) -> DependencyGraph {
    DependencyGraph::from_registry(registry)
}
