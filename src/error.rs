//! Structural errors raised while building or transforming a graph.
//!
//! Validation findings (conflicts, cycles, missing requirements) are not
//! errors; see [`crate::validate`].

/// Errors surfaced by registry construction and graph filtering.
///
/// Both variants carry every offending name at once so callers can report
/// them together.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// Two or more input entries share a canonical name.
    #[error("Duplicate installs found for: {}", .names.join(", "))]
    DuplicateInstall {
        /// Colliding canonical names, sorted.
        names: Vec<String>,
    },

    /// One or more `include` entries matched no package in the graph.
    #[error("No packages matched using the following patterns: {}", .names.join(", "))]
    UnknownPackage {
        /// The include entries that matched nothing, sorted.
        names: Vec<String>,
    },
}

/// Result type alias for graph operations.
pub type GraphResult<T> = Result<T, GraphError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_install_message() {
        let err = GraphError::DuplicateInstall {
            names: vec!["foo".to_string(), "foo-bar".to_string()],
        };
        assert_eq!(err.to_string(), "Duplicate installs found for: foo, foo-bar");
    }

    #[test]
    fn test_unknown_package_message() {
        let err = GraphError::UnknownPackage {
            names: vec!["nope".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "No packages matched using the following patterns: nope"
        );
    }
}
