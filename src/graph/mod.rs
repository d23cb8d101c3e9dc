// src/graph/mod.rs

//! The dependency graph: module records, the graph container and the builder
//! that grows a graph from entry files by scanning and resolving imports.

use std::path::Path;

use crate::errors::Result;

pub mod builder;
pub mod module;

pub use builder::{BuildReport, BuildStats, GraphBuilder};
pub use module::{Module, ModuleGraph};

/// Hook applied to each module's source while the graph is built, before
/// import scanning. Transforms run in the order they were configured.
///
/// The default configuration carries none; this seam exists so callers can
/// plug in browserify-style source rewrites without the builder knowing
/// about them.
pub trait SourceTransform: Send + Sync {
    fn name(&self) -> &str;
    fn apply(&self, path: &Path, source: &str) -> Result<String>;
}
