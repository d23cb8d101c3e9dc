// src/graph/builder.rs

//! Builds a [`ModuleGraph`] from entry files.
//!
//! Work-queue traversal: read + transform + scan each undiscovered file,
//! resolve its imports, enqueue anything new. Identity (the canonical path)
//! is the dedup key, so diamond dependencies are processed once; a path is
//! marked discovered *before* its imports are walked, so cycles terminate.
//!
//! Any parse error or unresolved import aborts the build; the partial graph
//! never escapes this module.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use crate::cache::{FileEntry, Fingerprint, SharedCaches};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::graph::{Module, ModuleGraph, SourceTransform};
use crate::resolve::Resolver;
use crate::scan::ImportScanner;
use crate::types::FingerprintMode;

/// Per-build counters, reported alongside the graph.
#[derive(Debug, Clone, Default)]
pub struct BuildStats {
    /// Modules in the graph.
    pub modules: usize,
    /// Modules that had to be read and scanned this build.
    pub reparsed: usize,
    /// Modules served from the file cache.
    pub from_cache: usize,
}

/// A completed build: the graph plus what changed to produce it.
#[derive(Debug)]
pub struct BuildReport {
    pub graph: ModuleGraph,
    pub stats: BuildStats,
    /// Paths that were re-parsed this build (the "changed since last build"
    /// set surfaced on bundle-ready events).
    pub changed: Vec<PathBuf>,
}

pub struct GraphBuilder {
    fs: Arc<dyn FileSystem>,
    caches: Arc<SharedCaches>,
    resolver: Resolver,
    scanner: ImportScanner,
    transforms: Vec<Arc<dyn SourceTransform>>,
    fingerprint_mode: FingerprintMode,
}

impl std::fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphBuilder")
            .field("resolver", &self.resolver)
            .finish_non_exhaustive()
    }
}

impl GraphBuilder {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        caches: Arc<SharedCaches>,
        resolver: Resolver,
        transforms: Vec<Arc<dyn SourceTransform>>,
        fingerprint_mode: FingerprintMode,
    ) -> Result<Self> {
        Ok(Self {
            fs,
            caches,
            resolver,
            scanner: ImportScanner::new()?,
            transforms,
            fingerprint_mode,
        })
    }

    /// Build the full graph reachable from `entries`.
    pub fn build(&self, entries: &[PathBuf]) -> Result<BuildReport> {
        let mut canonical_entries = Vec::new();
        for entry in entries {
            let path = self
                .fs
                .canonicalize(entry)
                .with_context(|| format!("entry file {:?}", entry))?;
            if !canonical_entries.contains(&path) {
                canonical_entries.push(path);
            }
        }

        let mut graph = ModuleGraph::new(canonical_entries.clone());
        let mut stats = BuildStats::default();
        let mut changed = Vec::new();

        let mut queue: VecDeque<PathBuf> = VecDeque::new();
        let mut discovered: HashSet<PathBuf> = HashSet::new();
        for entry in canonical_entries {
            if discovered.insert(entry.clone()) {
                queue.push_back(entry);
            }
        }

        while let Some(path) = queue.pop_front() {
            let (source, text, imports, fingerprint, reparsed) = self.load_module(&path)?;
            if reparsed {
                stats.reparsed += 1;
                changed.push(path.clone());
            } else {
                stats.from_cache += 1;
            }

            let from_dir = path
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| anyhow!("module path {:?} has no parent directory", path))?;

            let mut deps = BTreeMap::new();
            for specifier in &imports {
                let target = self.resolver.resolve(specifier, &from_dir)?;
                if discovered.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
                deps.insert(specifier.clone(), target);
            }

            graph.insert(Module {
                path,
                source,
                text,
                imports,
                deps,
                fingerprint,
            });
        }

        stats.modules = graph.len();
        info!(
            modules = stats.modules,
            reparsed = stats.reparsed,
            from_cache = stats.from_cache,
            "graph build complete"
        );

        Ok(BuildReport {
            graph,
            stats,
            changed,
        })
    }

    /// Fetch one module's (source, text, imports, fingerprint), from the file
    /// cache when the fingerprint still matches, otherwise by reading,
    /// transforming and scanning. The bool is true when a real parse happened.
    fn load_module(&self, path: &Path) -> Result<(String, String, Vec<String>, Fingerprint, bool)> {
        let current = Fingerprint::of(&*self.fs, path, self.fingerprint_mode)?;

        if let Some(entry) = self.caches.file_entry(path, &current) {
            return Ok((entry.source, entry.text, entry.imports, entry.fingerprint, false));
        }

        debug!(?path, "cache miss: reading and scanning module");
        let source = self.fs.read_to_string(path)?;

        let mut text = source.clone();
        for transform in &self.transforms {
            text = transform
                .apply(path, &text)
                .with_context(|| format!("transform '{}' on {:?}", transform.name(), path))?;
        }

        let imports = self.scanner.scan(path, &text)?;

        self.caches.store_file(
            path,
            FileEntry {
                fingerprint: current.clone(),
                source: source.clone(),
                text: text.clone(),
                imports: imports.clone(),
            },
        );

        Ok((source, text, imports, current, true))
    }
}
