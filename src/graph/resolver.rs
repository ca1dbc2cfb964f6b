//! Resolves declared requirements against the registry.

use tracing::debug;

use super::dependency_graph::RequirementEdge;
use crate::registry::{Package, Registry, RequirementSpec};

/// Turns `owner`'s declared requirements into edges, in declaration order.
///
/// Requirements that do not apply in the current environment are dropped.
/// The rest become resolved edges when the registry has a package of that
/// name and unresolved edges otherwise.
///
/// # Example
///
/// ```rust
/// use deptree::graph::resolve;
/// use deptree::registry::{PackageEntry, Registry};
///
/// let registry = Registry::build(vec![
///     PackageEntry::new("a", "1.0")
///         .requires("B", ">=1.0")
///         .requires("ghost", "")
///         .requires_inapplicable("winonly", ""),
///     PackageEntry::new("b", "1.0"),
/// ])
/// .unwrap();
///
/// let owner = registry.lookup("a").unwrap();
/// let edges = resolve(owner, registry.requirements_of("a").unwrap(), &registry);
/// assert_eq!(edges.len(), 2);
/// assert!(edges[0].is_resolved());
/// assert!(!edges[1].is_resolved());
/// ```
pub fn resolve(
    owner: &Package,
    declared: &[RequirementSpec],
    registry: &Registry,
) -> Vec<RequirementEdge> {
    declared
        .iter()
        .filter(|spec| {
            if !spec.applies {
                debug!(owner = %owner.key, requirement = %spec.name, "requirement does not apply, skipping");
            }
            spec.applies
        })
        .map(|spec| {
            let constraint = spec.version_constraint();
            match registry.lookup(&spec.name) {
                Some(target) => RequirementEdge::resolved(target, constraint),
                None => {
                    debug!(owner = %owner.key, requirement = %spec.name, "requirement is not installed");
                    RequirementEdge::unresolved(&spec.name, constraint)
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Resolution;
    use crate::registry::PackageEntry;

    #[test]
    fn test_resolved_edge_carries_target() {
        let registry = Registry::build(vec![
            PackageEntry::new("app", "1.0").requires("Zope.Interface", ">=5"),
            PackageEntry::new("zope-interface", "6.1"),
        ])
        .unwrap();

        let owner = registry.lookup("app").unwrap();
        let edges = resolve(owner, registry.requirements_of("app").unwrap(), &registry);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].key, "zope-interface");
        assert_eq!(edges[0].name, "zope-interface");
        assert_eq!(edges[0].constraint.as_str(), ">=5");
        match &edges[0].resolution {
            Resolution::Resolved { version } => assert_eq!(version.as_str(), "6.1"),
            Resolution::Unresolved => panic!("expected a resolved edge"),
        }
    }

    #[test]
    fn test_unresolved_keeps_declared_name() {
        let registry = Registry::build(vec![PackageEntry::new("app", "1.0")]).unwrap();
        let owner = registry.lookup("app").unwrap();
        let declared = vec![RequirementSpec::new("Not_Installed", "<3")];

        let edges = resolve(owner, &declared, &registry);
        assert_eq!(edges[0].key, "not-installed");
        assert_eq!(edges[0].name, "Not_Installed");
        assert_eq!(edges[0].resolution, Resolution::Unresolved);
    }

    #[test]
    fn test_inapplicable_requirements_dropped() {
        let registry = Registry::build(vec![
            PackageEntry::new("app", "1.0"),
            PackageEntry::new("colorama", "0.4.6"),
        ])
        .unwrap();
        let owner = registry.lookup("app").unwrap();
        let declared = vec![
            RequirementSpec::inapplicable("colorama", ""),
            RequirementSpec::new("colorama", ">=0.4"),
        ];

        let edges = resolve(owner, &declared, &registry);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].constraint.as_str(), ">=0.4");
    }

    #[test]
    fn test_empty_declarations() {
        let registry = Registry::build(vec![PackageEntry::new("app", "1.0")]).unwrap();
        let owner = registry.lookup("app").unwrap();
        assert!(resolve(owner, &[], &registry).is_empty());
    }
}
