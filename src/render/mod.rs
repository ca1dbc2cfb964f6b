//! Output formats for a dependency graph.
//!
//! Renderers only consume the public graph interface plus a shared tree
//! walk. The walk is iterative and stops at any package already on the
//! current path, so cyclic graphs render completely without recursing
//! forever.

pub mod json;
pub mod text;

use std::io::{self, Write};

use crate::graph::{DependencyGraph, RequirementEdge};
use crate::registry::Package;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Indented tree for terminals
    #[default]
    Text,
    /// Flat JSON list of packages and their edges
    Json,
    /// Nested JSON tree
    JsonTree,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "tree" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "json-tree" | "jsontree" => Ok(OutputFormat::JsonTree),
            _ => Err(format!(
                "Unknown output format: '{}'. Valid formats: text, json, json-tree",
                s
            )),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::JsonTree => write!(f, "json-tree"),
        }
    }
}

/// Options shared by the tree renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderOptions {
    /// Render every key as a root instead of only top-level packages
    pub all: bool,
    /// Deepest level to render below the roots (`Some(0)` shows roots only)
    pub max_depth: Option<usize>,
}

/// Trait for renderers.
pub trait Renderer {
    /// Render the graph to the given writer.
    fn render<W: Write>(
        &self,
        graph: &DependencyGraph,
        options: &RenderOptions,
        writer: &mut W,
    ) -> io::Result<()>;
}

/// Render the graph in the specified format.
pub fn render<W: Write>(
    format: OutputFormat,
    graph: &DependencyGraph,
    options: &RenderOptions,
    writer: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => text::TextRenderer.render(graph, options, writer),
        OutputFormat::Json => json::JsonRenderer.render(graph, options, writer),
        OutputFormat::JsonTree => json::JsonTreeRenderer.render(graph, options, writer),
    }
}

/// Render the graph to a string.
pub fn render_to_string(
    format: OutputFormat,
    graph: &DependencyGraph,
    options: &RenderOptions,
) -> io::Result<String> {
    let mut buffer = Vec::new();
    render(format, graph, options, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// What a row of the walked tree shows.
#[derive(Debug, Clone, Copy)]
pub(crate) enum RowKind<'a> {
    /// A root package
    Root(&'a Package),
    /// An edge of `owner`
    Edge {
        owner: &'a Package,
        edge: &'a RequirementEdge,
    },
}

/// One row of a depth-first walk, in pre-order.
#[derive(Debug, Clone)]
pub(crate) struct TreeRow<'a> {
    pub depth: usize,
    pub kind: RowKind<'a>,
    /// For each level from 1 to `depth`: whether that ancestor (or this row)
    /// is the last child of its parent
    pub lasts: Vec<bool>,
    /// Points back at a package already on the current path
    pub cycle: bool,
}

/// Top-level packages: keys no other key points at through a resolved
/// edge. Keys only reachable through cycles are appended so every key is
/// shown at least once.
pub(crate) fn select_roots(graph: &DependencyGraph, all: bool) -> Vec<usize> {
    let n = graph.node_count();
    if all {
        return (0..n).collect();
    }

    let mut targeted = vec![false; n];
    for idx in 0..n {
        for target in graph.resolved_successors(idx) {
            if target != idx {
                targeted[target] = true;
            }
        }
    }

    let mut roots: Vec<usize> = (0..n).filter(|&idx| !targeted[idx]).collect();
    let mut reached = vec![false; n];
    for &root in &roots {
        mark_reachable(graph, root, &mut reached);
    }
    for idx in 0..n {
        if !reached[idx] {
            roots.push(idx);
            mark_reachable(graph, idx, &mut reached);
        }
    }
    roots
}

fn mark_reachable(graph: &DependencyGraph, start: usize, reached: &mut [bool]) {
    let mut stack = vec![start];
    while let Some(node) = stack.pop() {
        if reached[node] {
            continue;
        }
        reached[node] = true;
        stack.extend(graph.resolved_successors(node).filter(|&t| !reached[t]));
    }
}

/// Walks the graph from its roots, returning rows in render order.
pub(crate) fn walk<'a>(graph: &'a DependencyGraph, options: &RenderOptions) -> Vec<TreeRow<'a>> {
    let packages = graph.packages();
    let mut rows = Vec::new();

    for root in select_roots(graph, options.all) {
        rows.push(TreeRow {
            depth: 0,
            kind: RowKind::Root(&packages[root]),
            lasts: Vec::new(),
            cycle: false,
        });

        // (node, index of the next edge to show)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        let mut lasts: Vec<bool> = Vec::new();

        loop {
            let child_depth = stack.len();
            let Some(top) = stack.last_mut() else {
                break;
            };
            let node = top.0;
            let edges = graph.edges_at(node);
            let too_deep = options.max_depth.is_some_and(|max| child_depth > max);
            if too_deep || top.1 >= edges.len() {
                stack.pop();
                lasts.pop();
                continue;
            }
            let i = top.1;
            top.1 += 1;

            let edge = &edges[i];
            let target = if edge.is_resolved() {
                graph.position(&edge.key)
            } else {
                None
            };
            let cycle = target.is_some_and(|t| stack.iter().any(|&(n, _)| n == t));

            let mut row_lasts = lasts.clone();
            row_lasts.push(i + 1 == edges.len());
            rows.push(TreeRow {
                depth: child_depth,
                kind: RowKind::Edge {
                    owner: &packages[node],
                    edge,
                },
                lasts: row_lasts.clone(),
                cycle,
            });

            if let Some(target) = target.filter(|_| !cycle) {
                stack.push((target, 0));
                lasts = row_lasts;
            }
        }
    }

    rows
}
