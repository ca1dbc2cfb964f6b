//! Package registry: the flat list of installed packages, indexed by
//! canonical name.
//!
//! # Example
//!
//! ```rust
//! use deptree::registry::{PackageEntry, Registry};
//!
//! let registry = Registry::build(vec![
//!     PackageEntry::new("Requests", "2.31.0").requires("urllib3", ">=1.21.1,<3"),
//!     PackageEntry::new("urllib3", "2.0.7"),
//! ])
//! .unwrap();
//!
//! assert_eq!(registry.len(), 2);
//! assert!(registry.lookup("REQUESTS").is_some());
//! ```

mod types;
mod version;

use std::collections::{BTreeSet, HashMap};

use tracing::warn;

use crate::error::{GraphError, GraphResult};

pub use types::{canonicalize, Package, PackageEntry, RequirementSpec};
pub use version::{constraints_compatible, Version, VersionConstraint};

/// Installed packages indexed by canonical name, in input order.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    packages: Vec<Package>,
    requirements: Vec<Vec<RequirementSpec>>,
    index: HashMap<String, usize>,
}

impl Registry {
    /// Builds a registry, failing if two entries share a canonical name.
    ///
    /// The error lists every colliding name, not just the first.
    pub fn build(entries: impl IntoIterator<Item = PackageEntry>) -> GraphResult<Self> {
        let (registry, duplicates) = Self::collect(entries);
        if duplicates.is_empty() {
            Ok(registry)
        } else {
            Err(GraphError::DuplicateInstall { names: duplicates })
        }
    }

    /// Builds a registry keeping the first entry for each canonical name.
    ///
    /// Returns the registry together with the sorted names that had
    /// duplicates, so the caller can still report them.
    pub fn build_first_wins(entries: impl IntoIterator<Item = PackageEntry>) -> (Self, Vec<String>) {
        let (registry, duplicates) = Self::collect(entries);
        for name in &duplicates {
            warn!(package = %name, "duplicate install ignored, keeping first");
        }
        (registry, duplicates)
    }

    fn collect(entries: impl IntoIterator<Item = PackageEntry>) -> (Self, Vec<String>) {
        let mut registry = Self::default();
        let mut duplicates = BTreeSet::new();

        for entry in entries {
            let package = entry.to_package();
            if registry.index.contains_key(&package.key) {
                duplicates.insert(package.key);
                continue;
            }
            registry
                .index
                .insert(package.key.clone(), registry.packages.len());
            registry.packages.push(package);
            registry.requirements.push(entry.requires);
        }

        (registry, duplicates.into_iter().collect())
    }

    /// Looks up a package by any spelling of its name.
    pub fn lookup(&self, name: &str) -> Option<&Package> {
        self.index
            .get(&canonicalize(name))
            .map(|&idx| &self.packages[idx])
    }

    /// Declared requirements of the package with the given name.
    pub fn requirements_of(&self, name: &str) -> Option<&[RequirementSpec]> {
        self.index
            .get(&canonicalize(name))
            .map(|&idx| self.requirements[idx].as_slice())
    }

    /// Iterates packages with their declared requirements, in input order.
    pub fn iter(&self) -> impl Iterator<Item = (&Package, &[RequirementSpec])> {
        self.packages
            .iter()
            .zip(self.requirements.iter().map(Vec::as_slice))
    }

    /// All packages in input order.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Number of packages.
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    /// Returns true if the registry holds no packages.
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}
