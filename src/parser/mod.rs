//! Parser module for deptree.
//!
//! Discovering installed packages is left to external tooling; this module
//! reads the inventory such tooling produces.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use deptree::parser::parse_file;
//! use deptree::registry::Registry;
//!
//! let entries = parse_file(Path::new("inventory.json")).unwrap();
//! let registry = Registry::build(entries).unwrap();
//! println!("Found {} installed packages", registry.len());
//! ```

pub mod inventory;

pub use inventory::{parse_file, parse_reader, parse_str, validate, ParseError, ParseResult};
