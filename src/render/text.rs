//! Text tree renderer.
//!
//! Forward graphs show what each package requires:
//!
//! ```text
//! flask==3.0.0
//! ├── click [required: >=8.1.3, installed: 8.1.7]
//! └── werkzeug [required: >=3.0.0, installed: 3.0.1]
//! ```
//!
//! Reversed graphs show who requires each package:
//!
//! ```text
//! click==8.1.7
//! └── flask==3.0.0 [requires: click>=8.1.3]
//! ```

use std::io::{self, Write};

use super::{walk, RenderOptions, Renderer, RowKind, TreeRow};
use crate::graph::DependencyGraph;

/// Marker appended to an edge that points back into the current path.
pub const CYCLE_MARKER: &str = "(cycle, already shown)";

/// Text renderer implementation.
pub struct TextRenderer;

/// Build the tree prefix (indentation and branch lines) for a row.
fn tree_prefix(row: &TreeRow<'_>) -> String {
    let mut prefix = String::new();
    let Some((&is_last, ancestors)) = row.lasts.split_last() else {
        return prefix;
    };

    for &ancestor_last in ancestors {
        if ancestor_last {
            prefix.push_str("    ");
        } else {
            prefix.push_str("│   ");
        }
    }
    if is_last {
        prefix.push_str("└── ");
    } else {
        prefix.push_str("├── ");
    }
    prefix
}

fn row_label(row: &TreeRow<'_>, reversed: bool) -> String {
    match row.kind {
        RowKind::Root(package) => format!("{}=={}", package.name, package.version),
        RowKind::Edge { owner, edge } if reversed => {
            let version = edge
                .installed_version()
                .map_or_else(|| "?".to_string(), ToString::to_string);
            let constraint = if edge.constraint.is_any() {
                String::new()
            } else {
                edge.constraint.to_string()
            };
            format!("{}=={} [requires: {}{}]", edge.name, version, owner.name, constraint)
        }
        RowKind::Edge { edge, .. } => {
            let installed = edge
                .installed_version()
                .map_or_else(|| "?".to_string(), ToString::to_string);
            format!(
                "{} [required: {}, installed: {}]",
                edge.name, edge.constraint, installed
            )
        }
    }
}

impl Renderer for TextRenderer {
    fn render<W: Write>(
        &self,
        graph: &DependencyGraph,
        options: &RenderOptions,
        writer: &mut W,
    ) -> io::Result<()> {
        for row in walk(graph, options) {
            let label = row_label(&row, graph.is_reversed());
            if row.cycle {
                writeln!(writer, "{}{} {}", tree_prefix(&row), label, CYCLE_MARKER)?;
            } else {
                writeln!(writer, "{}{}", tree_prefix(&row), label)?;
            }
        }
        Ok(())
    }
}
