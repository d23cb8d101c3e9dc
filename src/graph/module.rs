// src/graph/module.rs

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::cache::Fingerprint;

/// A single module: identity is the resolved absolute path.
///
/// A module is only inserted into a graph once its dependency map is
/// complete; the builder keeps half-processed modules to itself, so every
/// module reachable from [`ModuleGraph`] is eligible for emission.
#[derive(Debug, Clone)]
pub struct Module {
    /// Canonical absolute path; the module's identity.
    pub path: PathBuf,
    /// Raw source text as read from disk.
    pub source: String,
    /// Source text after configured transforms; what gets emitted.
    pub text: String,
    /// Import specifiers in order of first occurrence.
    pub imports: Vec<String>,
    /// specifier -> resolved module identity.
    pub deps: BTreeMap<String, PathBuf>,
    /// Freshness token the cache entry was stored under.
    pub fingerprint: Fingerprint,
}

/// A set of modules plus the entry points they were discovered from.
///
/// Cycles are permitted; the emitter and the registry link check are the
/// places that care, and both handle them.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    entries: Vec<PathBuf>,
    modules: HashMap<PathBuf, Module>,
    discovery: Vec<PathBuf>,
}

impl ModuleGraph {
    pub fn new(entries: Vec<PathBuf>) -> Self {
        Self {
            entries,
            modules: HashMap::new(),
            discovery: Vec::new(),
        }
    }

    /// Entry points, in the order the caller supplied them.
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.modules.contains_key(path)
    }

    pub fn module(&self, path: &Path) -> Option<&Module> {
        self.modules.get(path)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module paths in the order they were first discovered. This order is
    /// deterministic for a fixed graph and is what identifier assignment and
    /// topological tie-breaking key off.
    pub fn discovery_order(&self) -> &[PathBuf] {
        &self.discovery
    }

    /// Direct dependencies of a module, if it exists.
    pub fn dependencies_of(&self, path: &Path) -> impl Iterator<Item = &PathBuf> {
        self.modules
            .get(path)
            .into_iter()
            .flat_map(|m| m.deps.values())
    }

    /// The set of files this graph is built from, for watch targeting.
    pub fn file_set(&self) -> HashSet<PathBuf> {
        self.modules.keys().cloned().collect()
    }

    /// Insert a completed module. First insertion wins; the builder's dedup
    /// guarantees a path is only processed once per build.
    pub fn insert(&mut self, module: Module) {
        if !self.modules.contains_key(&module.path) {
            self.discovery.push(module.path.clone());
            self.modules.insert(module.path.clone(), module);
        }
    }
}
