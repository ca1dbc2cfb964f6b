//! Parser for package inventory files.
//!
//! An inventory is a JSON array with one object per installed package:
//!
//! ```json
//! [
//!   {"name": "requests", "version": "2.31.0",
//!    "requires": [{"name": "urllib3", "constraint": ">=1.21.1,<3"},
//!                 {"name": "pywin32", "applies": false}]},
//!   {"name": "urllib3", "version": "2.0.7"}
//! ]
//! ```

use std::fs;
use std::io::Read;
use std::path::Path;

use crate::registry::PackageEntry;

/// Errors that can occur during inventory parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to read the inventory.
    #[error("Failed to read inventory: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse JSON content.
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// An entry is structurally valid JSON but unusable.
    #[error("Invalid inventory entry #{index}: {reason}")]
    InvalidEntry {
        /// Zero-based position of the entry
        index: usize,
        /// What is wrong with it
        reason: String,
    },
}

/// Result type alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Parses an inventory file from a path.
pub fn parse_file(path: &Path) -> ParseResult<Vec<PackageEntry>> {
    let content = fs::read_to_string(path)?;
    parse_str(&content)
}

/// Parses an inventory from any reader, such as stdin.
pub fn parse_reader(mut reader: impl Read) -> ParseResult<Vec<PackageEntry>> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;
    parse_str(&content)
}

/// Parses an inventory from a string.
///
/// # Example
///
/// ```
/// use deptree::parser::parse_str;
///
/// let json = r#"[{"name": "a", "version": "1.0", "requires": [{"name": "b"}]}]"#;
/// let entries = parse_str(json).unwrap();
/// assert_eq!(entries.len(), 1);
/// assert_eq!(entries[0].requires[0].name, "b");
/// ```
pub fn parse_str(content: &str) -> ParseResult<Vec<PackageEntry>> {
    let entries: Vec<PackageEntry> = serde_json::from_str(content)?;
    validate(&entries)?;
    Ok(entries)
}

/// Checks that every entry has a usable name and version.
pub fn validate(entries: &[PackageEntry]) -> ParseResult<()> {
    for (index, entry) in entries.iter().enumerate() {
        if entry.name.trim().is_empty() {
            return Err(ParseError::InvalidEntry {
                index,
                reason: "package name is empty".to_string(),
            });
        }
        if entry.version.trim().is_empty() {
            return Err(ParseError::InvalidEntry {
                index,
                reason: format!("package '{}' has no version", entry.name),
            });
        }
        if let Some(pos) = entry.requires.iter().position(|r| r.name.trim().is_empty()) {
            return Err(ParseError::InvalidEntry {
                index,
                reason: format!("requirement #{pos} of '{}' has an empty name", entry.name),
            });
        }
    }
    Ok(())
}
