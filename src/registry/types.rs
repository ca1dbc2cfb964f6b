//! Package and requirement types shared by the registry and the graph.

use serde::{Deserialize, Serialize};

use super::version::{Version, VersionConstraint};

/// Normalizes a package name for equality comparisons.
///
/// Letters are lowercased and every run of `-`, `_` or `.` collapses to a
/// single `-`.
///
/// # Example
///
/// ```rust
/// use deptree::registry::canonicalize;
///
/// assert_eq!(canonicalize("Foo__Bar.baz"), "foo-bar-baz");
/// assert_eq!(canonicalize("zope.interface"), canonicalize("Zope-Interface"));
/// ```
pub fn canonicalize(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_separator = false;
    for c in name.trim().chars() {
        if matches!(c, '-' | '_' | '.') {
            if !in_separator {
                out.push('-');
                in_separator = true;
            }
        } else {
            out.extend(c.to_lowercase());
            in_separator = false;
        }
    }
    out
}

/// A single installed package.
///
/// `metadata` is an opaque handle carried for renderers; nothing in the
/// graph core reads it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Package {
    /// Canonical name, unique within a registry
    pub key: String,
    /// Name as the package spells it
    pub name: String,
    /// Installed version
    pub version: Version,
    /// Ecosystem-specific data the core never inspects
    #[serde(skip)]
    pub metadata: Option<serde_json::Value>,
}

impl Package {
    /// Creates a package, deriving its canonical key from `name`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use deptree::registry::Package;
    ///
    /// let pkg = Package::new("Django_Extensions", "3.2");
    /// assert_eq!(pkg.key, "django-extensions");
    /// assert_eq!(pkg.name, "Django_Extensions");
    /// ```
    pub fn new(name: impl Into<String>, version: &str) -> Self {
        let name = name.into();
        Self {
            key: canonicalize(&name),
            name,
            version: Version::parse(version),
            metadata: None,
        }
    }
}

/// One declared requirement of a package, as supplied by discovery.
///
/// `applies` is the caller's evaluation of any environment marker; specs
/// that do not apply never become edges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementSpec {
    /// Required package name as written
    pub name: String,
    /// Constraint expression, empty for "any"
    #[serde(default)]
    pub constraint: String,
    /// Whether the requirement applies in the current environment
    #[serde(default = "default_applies")]
    pub applies: bool,
}

fn default_applies() -> bool {
    true
}

impl RequirementSpec {
    /// Creates an applicable requirement.
    pub fn new(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: constraint.into(),
            applies: true,
        }
    }

    /// Creates a requirement whose environment marker evaluated to false.
    pub fn inapplicable(name: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            applies: false,
            ..Self::new(name, constraint)
        }
    }

    /// Parses the constraint expression.
    pub fn version_constraint(&self) -> VersionConstraint {
        VersionConstraint::parse(&self.constraint)
    }
}

/// One installed package with its declared requirements: the registry's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageEntry {
    /// Package name as the package spells it
    pub name: String,
    /// Installed version string
    pub version: String,
    /// Declared requirements in declaration order
    #[serde(default)]
    pub requires: Vec<RequirementSpec>,
    /// Opaque ecosystem metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl PackageEntry {
    /// Creates an entry with no requirements.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            requires: Vec::new(),
            metadata: None,
        }
    }

    /// Appends an applicable requirement.
    ///
    /// # Example
    ///
    /// ```rust
    /// use deptree::registry::PackageEntry;
    ///
    /// let entry = PackageEntry::new("a", "1.0").requires("b", ">=1.0");
    /// assert_eq!(entry.requires.len(), 1);
    /// ```
    pub fn requires(mut self, name: impl Into<String>, constraint: impl Into<String>) -> Self {
        self.requires.push(RequirementSpec::new(name, constraint));
        self
    }

    /// Appends a requirement whose environment marker does not apply.
    pub fn requires_inapplicable(
        mut self,
        name: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        self.requires
            .push(RequirementSpec::inapplicable(name, constraint));
        self
    }

    /// Builds the [`Package`] this entry describes.
    pub fn to_package(&self) -> Package {
        Package {
            metadata: self.metadata.clone(),
            ..Package::new(self.name.clone(), &self.version)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonicalize_separators() {
        assert_eq!(canonicalize("foo-bar"), "foo-bar");
        assert_eq!(canonicalize("foo_bar"), "foo-bar");
        assert_eq!(canonicalize("foo.bar"), "foo-bar");
        assert_eq!(canonicalize("foo-_.bar"), "foo-bar");
        assert_eq!(canonicalize("FOO"), "foo");
        assert_eq!(canonicalize("  spaced  "), "spaced");
    }

    #[test]
    fn test_package_new() {
        let pkg = Package::new("Flask-SQLAlchemy", "3.0.5");
        assert_eq!(pkg.key, "flask-sqlalchemy");
        assert_eq!(pkg.version.as_str(), "3.0.5");
        assert!(pkg.metadata.is_none());
    }

    #[test]
    fn test_entry_to_package_keeps_metadata() {
        let mut entry = PackageEntry::new("Foo", "1.0");
        entry.metadata = Some(serde_json::json!({"location": "/site-packages"}));

        let pkg = entry.to_package();
        assert_eq!(pkg.key, "foo");
        assert_eq!(pkg.metadata, entry.metadata);
    }

    #[test]
    fn test_requirement_spec_defaults() {
        let spec: RequirementSpec = serde_json::from_str(r#"{"name": "six"}"#).unwrap();
        assert_eq!(spec.name, "six");
        assert!(spec.constraint.is_empty());
        assert!(spec.applies);
        assert!(spec.version_constraint().is_any());
    }

    #[test]
    fn test_entry_builder() {
        let entry = PackageEntry::new("a", "1.0")
            .requires("b", ">=1.0")
            .requires_inapplicable("pywin32", "");
        assert_eq!(entry.requires.len(), 2);
        assert!(entry.requires[0].applies);
        assert!(!entry.requires[1].applies);
    }
}
