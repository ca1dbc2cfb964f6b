//! JSON renderers: a flat package list and a nested tree.

use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Write};

use super::{walk, RenderOptions, Renderer, RowKind};
use crate::graph::{DependencyGraph, RequirementEdge};
use crate::registry::Package;

/// Flat JSON renderer: every key with its direct edges.
pub struct JsonRenderer;

/// Nested JSON renderer following the same walk as the text tree.
pub struct JsonTreeRenderer;

/// Serializable package for JSON output.
#[derive(Serialize)]
struct JsonPackage {
    key: String,
    package_name: String,
    installed_version: String,
}

impl From<&Package> for JsonPackage {
    fn from(package: &Package) -> Self {
        Self {
            key: package.key.clone(),
            package_name: package.name.clone(),
            installed_version: package.version.to_string(),
        }
    }
}

/// Serializable edge for JSON output.
#[derive(Serialize)]
struct JsonEdge {
    key: String,
    package_name: String,
    installed_version: String,
    required_version: String,
}

impl From<&RequirementEdge> for JsonEdge {
    fn from(edge: &RequirementEdge) -> Self {
        Self {
            key: edge.key.clone(),
            package_name: edge.name.clone(),
            installed_version: edge
                .installed_version()
                .map_or_else(|| "?".to_string(), ToString::to_string),
            required_version: edge.constraint.to_string(),
        }
    }
}

/// One entry of the flat output.
#[derive(Serialize)]
struct JsonNode {
    package: JsonPackage,
    dependencies: Vec<JsonEdge>,
}

fn write_json<W: Write, T: Serialize>(value: &T, writer: &mut W) -> io::Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    writeln!(writer, "{}", json)
}

impl Renderer for JsonRenderer {
    fn render<W: Write>(
        &self,
        graph: &DependencyGraph,
        _options: &RenderOptions,
        writer: &mut W,
    ) -> io::Result<()> {
        let nodes: Vec<JsonNode> = graph
            .iter()
            .map(|(package, edges)| JsonNode {
                package: package.into(),
                dependencies: edges.iter().map(JsonEdge::from).collect(),
            })
            .collect();
        write_json(&nodes, writer)
    }
}

fn to_object<T: Serialize>(value: T) -> io::Result<Map<String, Value>> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "expected a JSON object",
        )),
        Err(e) => Err(io::Error::new(io::ErrorKind::InvalidData, e)),
    }
}

/// Attaches a finished node to its parent, or to the roots if it has none.
fn attach(stack: &mut Vec<Map<String, Value>>, roots: &mut Vec<Value>, node: Map<String, Value>) {
    let node = Value::Object(node);
    match stack.last_mut() {
        Some(parent) => {
            if let Some(Value::Array(children)) = parent.get_mut("dependencies") {
                children.push(node);
            }
        }
        None => roots.push(node),
    }
}

impl Renderer for JsonTreeRenderer {
    fn render<W: Write>(
        &self,
        graph: &DependencyGraph,
        options: &RenderOptions,
        writer: &mut W,
    ) -> io::Result<()> {
        let mut roots = Vec::new();
        // Open nodes along the current path; index = depth
        let mut stack: Vec<Map<String, Value>> = Vec::new();

        for row in walk(graph, options) {
            while stack.len() > row.depth {
                if let Some(done) = stack.pop() {
                    attach(&mut stack, &mut roots, done);
                }
            }

            let mut node = match row.kind {
                RowKind::Root(package) => to_object(JsonPackage::from(package))?,
                RowKind::Edge { edge, .. } => to_object(JsonEdge::from(edge))?,
            };
            if row.cycle {
                node.insert("cycle".to_string(), Value::Bool(true));
            }
            node.insert("dependencies".to_string(), Value::Array(Vec::new()));
            stack.push(node);
        }
        while let Some(done) = stack.pop() {
            attach(&mut stack, &mut roots, done);
        }

        write_json(&roots, writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::registry::{PackageEntry, Registry};
    use crate::render::{render_to_string, OutputFormat};

    fn sample() -> DependencyGraph {
        build_graph(
            &Registry::build(vec![
                PackageEntry::new("app", "1.0")
                    .requires("Lib", ">=1.0")
                    .requires("ghost", ""),
                PackageEntry::new("lib", "1.2").requires("app", ""),
            ])
            .unwrap(),
        )
    }

    fn parse(format: OutputFormat, graph: &DependencyGraph) -> Value {
        let out = render_to_string(format, graph, &RenderOptions::default()).unwrap();
        serde_json::from_str(&out).unwrap()
    }

    #[test]
    fn test_flat_json() {
        let parsed = parse(OutputFormat::Json, &sample());
        let nodes = parsed.as_array().unwrap();
        assert_eq!(nodes.len(), 2);

        assert_eq!(nodes[0]["package"]["key"], "app");
        assert_eq!(nodes[0]["package"]["installed_version"], "1.0");
        let deps = nodes[0]["dependencies"].as_array().unwrap();
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0]["key"], "lib");
        assert_eq!(deps[0]["installed_version"], "1.2");
        assert_eq!(deps[0]["required_version"], ">=1.0");
        assert_eq!(deps[1]["installed_version"], "?");
        assert_eq!(deps[1]["required_version"], "Any");
    }

    #[test]
    fn test_flat_json_reversed() {
        let parsed = parse(OutputFormat::Json, &sample().reverse());
        let nodes = parsed.as_array().unwrap();
        assert_eq!(nodes[1]["package"]["key"], "lib");
        assert_eq!(nodes[1]["dependencies"][0]["key"], "app");
        assert_eq!(nodes[1]["dependencies"][0]["required_version"], ">=1.0");
    }

    #[test]
    fn test_json_tree_nesting_and_cycles() {
        let parsed = parse(OutputFormat::JsonTree, &sample());
        let roots = parsed.as_array().unwrap();
        assert_eq!(roots.len(), 1);

        let app = &roots[0];
        assert_eq!(app["key"], "app");
        let lib = &app["dependencies"][0];
        assert_eq!(lib["key"], "lib");
        assert_eq!(lib["required_version"], ">=1.0");

        let back = &lib["dependencies"][0];
        assert_eq!(back["key"], "app");
        assert_eq!(back["cycle"], true);
        assert!(back["dependencies"].as_array().unwrap().is_empty());

        assert_eq!(app["dependencies"][1]["key"], "ghost");
        assert!(app.get("cycle").is_none());
    }

    #[test]
    fn test_json_tree_multiple_roots() {
        let graph = build_graph(
            &Registry::build(vec![
                PackageEntry::new("a", "1.0"),
                PackageEntry::new("b", "2.0"),
            ])
            .unwrap(),
        );
        let parsed = parse(OutputFormat::JsonTree, &graph);
        let keys: Vec<&str> = parsed
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }
}
