//! deptree - dependency tree reporter for installed packages
//!
//! This crate turns a flat inventory of installed packages into a dependency
//! graph, and provides reversal, subgraph filtering, conflict and cycle
//! detection, and tree rendering on top of it.

pub mod error;
pub mod graph;
pub mod parser;
pub mod registry;
pub mod render;
pub mod validate;
