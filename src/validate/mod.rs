//! Anomaly detection over a dependency graph.
//!
//! Findings are plain data: nothing here aborts, and a graph with conflicts
//! or cycles can still be transformed and rendered. Deciding whether a
//! finding is fatal is up to the caller.

mod conflicts;
mod cycles;

use serde::Serialize;
use std::fmt;

use crate::graph::DependencyGraph;

pub use conflicts::{
    find_conflicts, find_missing, ConflictKind, MissingRequirement, VersionConflict,
    VersionRequirement,
};
pub use cycles::{find_cycles, Cycle};

/// Every finding of a validation pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Version conflicts, ordered by required package
    pub conflicts: Vec<VersionConflict>,
    /// Requirements with no installed match
    pub missing: Vec<MissingRequirement>,
    /// Dependency cycles, in discovery order
    pub cycles: Vec<Cycle>,
}

impl ValidationReport {
    /// Returns true if nothing was found.
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.missing.is_empty() && self.cycles.is_empty()
    }

    /// Total number of findings.
    pub fn len(&self) -> usize {
        self.conflicts.len() + self.missing.len() + self.cycles.len()
    }

    /// Returns true if there are no findings.
    pub fn is_empty(&self) -> bool {
        self.is_clean()
    }
}

/// Runs every check over `graph`.
///
/// # Example
///
/// ```rust
/// use deptree::graph::build_graph;
/// use deptree::registry::{PackageEntry, Registry};
/// use deptree::validate::validate;
///
/// let registry = Registry::build(vec![
///     PackageEntry::new("a", "1.0").requires("b", ">=1.0"),
///     PackageEntry::new("b", "1.0"),
/// ])
/// .unwrap();
///
/// assert!(validate(&build_graph(&registry)).is_clean());
/// ```
pub fn validate(graph: &DependencyGraph) -> ValidationReport {
    ValidationReport {
        conflicts: find_conflicts(graph),
        missing: find_missing(graph),
        cycles: find_cycles(graph),
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.conflicts.is_empty() {
            writeln!(f, "Possibly conflicting dependencies found:")?;
            for conflict in &self.conflicts {
                writeln!(
                    f,
                    "* {}=={} [{}]",
                    conflict.name, conflict.installed_version, conflict.kind
                )?;
                for req in &conflict.requirements {
                    writeln!(f, " - {} [requires: {}]", req.required_by, req.constraint)?;
                }
            }
        }

        if !self.missing.is_empty() {
            writeln!(f, "Missing dependencies found:")?;
            let mut current: Option<&str> = None;
            for missing in &self.missing {
                if current != Some(missing.required_by.as_str()) {
                    writeln!(f, "* {}=={}", missing.required_by, missing.required_by_version)?;
                    current = Some(missing.required_by.as_str());
                }
                writeln!(f, " - {} [required: {}, installed: ?]", missing.name, missing.constraint)?;
            }
        }

        if !self.cycles.is_empty() {
            writeln!(f, "Cyclic dependencies found:")?;
            for cycle in &self.cycles {
                writeln!(f, "* {}", cycle.cycle_path())?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::registry::{PackageEntry, Registry};

    #[test]
    fn test_clean_report_renders_nothing() {
        let report = ValidationReport::default();
        assert!(report.is_clean());
        assert_eq!(report.len(), 0);
        assert_eq!(report.to_string(), "");
    }

    #[test]
    fn test_report_text() {
        let graph = build_graph(
            &Registry::build(vec![
                PackageEntry::new("a", "1.0")
                    .requires("b", "<2.0.0")
                    .requires("ghost", ">=1")
                    .requires("spook", ""),
                PackageEntry::new("b", "2.0.0").requires("a", ""),
            ])
            .unwrap(),
        );

        let report = validate(&graph);
        assert_eq!(report.len(), 4);
        assert_eq!(
            report.to_string(),
            "Possibly conflicting dependencies found:\n\
             * b==2.0.0 [unsatisfied]\n \
             - a [requires: <2.0.0]\n\
             Missing dependencies found:\n\
             * a==1.0\n \
             - ghost [required: >=1, installed: ?]\n \
             - spook [required: Any, installed: ?]\n\
             Cyclic dependencies found:\n\
             * a => b => a\n"
        );
    }

    #[test]
    fn test_validation_is_independent_of_filtering() {
        let graph = build_graph(
            &Registry::build(vec![
                PackageEntry::new("a", "1.0").requires("b", ""),
                PackageEntry::new("b", "1.0").requires("a", ""),
                PackageEntry::new("c", "1.0"),
            ])
            .unwrap(),
        );

        let filtered = graph.filter(Some(&["c"]), None).unwrap();
        assert!(validate(&filtered).is_clean());
        assert_eq!(validate(&graph).cycles.len(), 1);
    }
}
