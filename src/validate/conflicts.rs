//! Version conflict and missing requirement detection.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::graph::DependencyGraph;
use crate::registry::{constraints_compatible, Version, VersionConstraint};

/// Why a group of requirements on one package is in conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    /// The installed version fails at least one declared constraint
    Unsatisfied,
    /// No version could satisfy every dependant at once
    Incompatible,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsatisfied => write!(f, "unsatisfied"),
            Self::Incompatible => write!(f, "incompatible"),
        }
    }
}

/// A constraint declared by one dependant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionRequirement {
    /// Display name of the dependant that declared the constraint
    pub required_by: String,
    /// The declared constraint
    pub constraint: VersionConstraint,
}

impl VersionRequirement {
    /// Creates a new version requirement.
    pub fn new(required_by: impl Into<String>, constraint: VersionConstraint) -> Self {
        Self {
            required_by: required_by.into(),
            constraint,
        }
    }
}

/// Information about a version conflict for a package.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VersionConflict {
    /// Canonical name of the required package
    pub package: String,
    /// Display name of the required package
    pub name: String,
    /// The version that is installed
    pub installed_version: Version,
    /// Kind of conflict
    pub kind: ConflictKind,
    /// The offending requirements, in discovery order
    pub requirements: Vec<VersionRequirement>,
}

impl VersionConflict {
    /// Returns a formatted string describing the conflict.
    ///
    /// For example: "urllib3==2.0.7 (unsatisfied): <2 (by botocore)"
    pub fn description(&self) -> String {
        let reqs: Vec<String> = self
            .requirements
            .iter()
            .map(|r| format!("{} (by {})", r.constraint, r.required_by))
            .collect();
        format!(
            "{}=={} ({}): {}",
            self.name,
            self.installed_version,
            self.kind,
            reqs.join(", ")
        )
    }

    /// Names of the dependants involved.
    pub fn dependants(&self) -> Vec<&str> {
        self.requirements
            .iter()
            .map(|r| r.required_by.as_str())
            .collect()
    }
}

/// A declared requirement with no installed match.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingRequirement {
    /// Display name of the package declaring the requirement
    pub required_by: String,
    /// Installed version of the declaring package
    pub required_by_version: Version,
    /// Required name as declared
    pub name: String,
    /// Declared constraint
    pub constraint: VersionConstraint,
}

struct Group<'a> {
    name: &'a str,
    installed: &'a Version,
    requirements: Vec<VersionRequirement>,
}

/// Finds version conflicts among resolved edges.
///
/// Requirements are grouped by required package. A group conflicts when the
/// installed version fails any constraint (only the failing requirements are
/// reported), or otherwise when the constraints cannot all hold at once
/// (every constrained requirement is reported). Unconstrained requirements
/// never conflict. Works on forward and reversed graphs alike.
///
/// # Example
///
/// ```rust
/// use deptree::graph::build_graph;
/// use deptree::registry::{PackageEntry, Registry};
/// use deptree::validate::find_conflicts;
///
/// let registry = Registry::build(vec![
///     PackageEntry::new("t", "2.0.0"),
///     PackageEntry::new("old", "1.0").requires("t", "<2.0.0"),
///     PackageEntry::new("new", "1.0").requires("t", ">=1.0.0"),
/// ])
/// .unwrap();
///
/// let conflicts = find_conflicts(&build_graph(&registry));
/// assert_eq!(conflicts.len(), 1);
/// assert_eq!(conflicts[0].package, "t");
/// assert_eq!(conflicts[0].dependants(), vec!["old"]);
/// ```
pub fn find_conflicts(graph: &DependencyGraph) -> Vec<VersionConflict> {
    let mut groups: BTreeMap<&str, Group<'_>> = BTreeMap::new();

    for (owner, edges) in graph.iter() {
        for edge in edges {
            let Some(edge_version) = edge.installed_version() else {
                continue;
            };
            if edge.constraint.is_any() {
                continue;
            }
            // In a reversed graph the owner is the required package.
            let (key, name, installed, dependant) = if graph.is_reversed() {
                (owner.key.as_str(), owner.name.as_str(), &owner.version, edge.name.as_str())
            } else {
                (edge.key.as_str(), edge.name.as_str(), edge_version, owner.name.as_str())
            };
            groups
                .entry(key)
                .or_insert_with(|| Group {
                    name,
                    installed,
                    requirements: Vec::new(),
                })
                .requirements
                .push(VersionRequirement::new(dependant, edge.constraint.clone()));
        }
    }

    let mut conflicts = Vec::new();
    for (key, group) in groups {
        let unsatisfied: Vec<VersionRequirement> = group
            .requirements
            .iter()
            .filter(|r| r.constraint.satisfied_by(group.installed) == Some(false))
            .cloned()
            .collect();

        let (kind, requirements) = if !unsatisfied.is_empty() {
            (ConflictKind::Unsatisfied, unsatisfied)
        } else if !constraints_compatible(group.requirements.iter().map(|r| &r.constraint)) {
            (ConflictKind::Incompatible, group.requirements)
        } else {
            continue;
        };

        conflicts.push(VersionConflict {
            package: key.to_string(),
            name: group.name.to_string(),
            installed_version: group.installed.clone(),
            kind,
            requirements,
        });
    }

    conflicts
}

/// Lists every unresolved edge, in key then declaration order.
///
/// Reversed graphs carry no unresolved edges, so this is empty for them.
pub fn find_missing(graph: &DependencyGraph) -> Vec<MissingRequirement> {
    graph
        .iter()
        .flat_map(|(owner, edges)| {
            edges
                .iter()
                .filter(|e| !e.is_resolved())
                .map(move |e| MissingRequirement {
                    required_by: owner.name.clone(),
                    required_by_version: owner.version.clone(),
                    name: e.name.clone(),
                    constraint: e.constraint.clone(),
                })
        })
        .collect()
}
