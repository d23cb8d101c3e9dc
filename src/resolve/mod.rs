// src/resolve/mod.rs

//! The module resolver: maps an import specifier plus a base directory to an
//! absolute file path.
//!
//! Resolution order follows what the node-style loaders the original bundler
//! wraps actually do:
//!
//! - Relative / absolute specifiers resolve against the importing directory:
//!   exact path, then `path + extension`, then the directory's manifest
//!   `main`, then `path/index + extension`.
//! - Bare specifiers walk up from the importing directory looking for a
//!   modules root (default `node_modules`) containing the package, then fall
//!   back to the configured extra search-path roots.
//!
//! Every query goes through the shared cache layer keyed by the exact
//! (from_dir, specifier) pair; package manifests are cached by manifest path.
//! A failed resolution reports every candidate that was probed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::cache::{Fingerprint, PackageEntry, ResolutionEntry, SharedCaches};
use crate::errors::{RepackError, Result};
use crate::fs::{FileSystem, normalize};
use crate::types::FingerprintMode;

/// The slice of `package.json` resolution cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageManifest {
    /// Entry-point file, relative to the package directory.
    #[serde(default)]
    pub main: Option<String>,
}

/// Resolver configuration, extracted from the bundler options.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Extension candidates, each including the leading dot.
    pub extensions: Vec<String>,
    /// Name of the per-directory modules root (`node_modules` style).
    pub modules_dirname: String,
    /// Extra roots consulted when the modules-root walk fails, in order.
    pub search_paths: Vec<PathBuf>,
    pub fingerprint_mode: FingerprintMode,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string()],
            modules_dirname: "node_modules".to_string(),
            search_paths: Vec::new(),
            fingerprint_mode: FingerprintMode::default(),
        }
    }
}

pub struct Resolver {
    fs: Arc<dyn FileSystem>,
    caches: Arc<SharedCaches>,
    config: ResolverConfig,
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Resolver {
    pub fn new(fs: Arc<dyn FileSystem>, caches: Arc<SharedCaches>, config: ResolverConfig) -> Self {
        Self { fs, caches, config }
    }

    /// Resolve `specifier` as imported from a module living in `from_dir`.
    pub fn resolve(&self, specifier: &str, from_dir: &Path) -> Result<PathBuf> {
        if let Some(entry) = self.caches.resolution(from_dir, specifier) {
            if self.entry_still_valid(&entry) {
                trace!(specifier, ?from_dir, "resolution served from cache");
                return Ok(entry.target);
            }
            self.caches.drop_resolution(from_dir, specifier);
        }

        let mut probe = Probe::default();
        let found = if is_path_specifier(specifier) {
            let base = normalize(&from_dir.join(specifier));
            self.resolve_path(&base, &mut probe)?
        } else {
            self.resolve_bare(specifier, from_dir, &mut probe)?
        };

        match found {
            Some(path) => {
                let target = self
                    .fs
                    .canonicalize(&path)
                    .with_context(|| format!("canonicalizing resolved path {:?}", path))?;
                debug!(specifier, ?from_dir, ?target, "resolved");
                self.caches.store_resolution(
                    from_dir,
                    specifier,
                    ResolutionEntry {
                        target: target.clone(),
                        consulted: probe.consulted,
                        tried: probe.tried,
                    },
                );
                Ok(target)
            }
            None => Err(RepackError::Resolution {
                specifier: specifier.to_string(),
                from_dir: from_dir.to_path_buf(),
                candidates: probe.tried,
            }),
        }
    }

    /// Resolve `base` as a file, then as a directory (manifest `main`, then
    /// `index` candidates).
    fn resolve_path(&self, base: &Path, probe: &mut Probe) -> Result<Option<PathBuf>> {
        if let Some(hit) = self.try_file(base, probe) {
            return Ok(Some(hit));
        }

        for ext in &self.config.extensions {
            let candidate = with_extension(base, ext);
            if let Some(hit) = self.try_file(&candidate, probe) {
                return Ok(Some(hit));
            }
        }

        if self.fs.is_dir(base) {
            let manifest_path = base.join("package.json");
            if self.fs.is_file(&manifest_path) {
                probe.consulted.push(manifest_path.clone());
                let manifest = self.load_manifest(&manifest_path)?;
                if let Some(main) = manifest.main {
                    let main_base = normalize(&base.join(main));
                    if let Some(hit) = self.resolve_path(&main_base, probe)? {
                        return Ok(Some(hit));
                    }
                }
            }

            for ext in &self.config.extensions {
                let candidate = base.join(format!("index{ext}"));
                if let Some(hit) = self.try_file(&candidate, probe) {
                    return Ok(Some(hit));
                }
            }
        }

        Ok(None)
    }

    /// Walk ancestors of `from_dir` for a modules root holding the package,
    /// then try the extra search-path roots.
    fn resolve_bare(
        &self,
        specifier: &str,
        from_dir: &Path,
        probe: &mut Probe,
    ) -> Result<Option<PathBuf>> {
        for dir in from_dir.ancestors() {
            let root = dir.join(&self.config.modules_dirname);
            if !self.fs.is_dir(&root) {
                continue;
            }
            let base = normalize(&root.join(specifier));
            if let Some(hit) = self.resolve_path(&base, probe)? {
                return Ok(Some(hit));
            }
        }

        for root in &self.config.search_paths {
            let base = normalize(&root.join(specifier));
            if let Some(hit) = self.resolve_path(&base, probe)? {
                return Ok(Some(hit));
            }
        }

        Ok(None)
    }

    fn try_file(&self, candidate: &Path, probe: &mut Probe) -> Option<PathBuf> {
        probe.tried.push(candidate.to_path_buf());
        if self.fs.is_file(candidate) {
            Some(candidate.to_path_buf())
        } else {
            None
        }
    }

    /// Parse (or fetch the cached) package manifest.
    fn load_manifest(&self, manifest_path: &Path) -> Result<PackageManifest> {
        let current = Fingerprint::of(&*self.fs, manifest_path, self.config.fingerprint_mode)?;
        if let Some(manifest) = self.caches.package(manifest_path, &current) {
            return Ok(manifest);
        }

        let raw = self.fs.read_to_string(manifest_path)?;
        let manifest: PackageManifest = serde_json::from_str(&raw)
            .with_context(|| format!("parsing package manifest {:?}", manifest_path))?;
        self.caches.store_package(
            manifest_path,
            PackageEntry {
                fingerprint: current,
                manifest: manifest.clone(),
            },
        );
        Ok(manifest)
    }

    /// Whether a cached resolution answer is still trustworthy: the target
    /// must still exist and every consulted manifest must be unchanged.
    /// Creation of a file at an earlier candidate position is handled by the
    /// invalidation cascade, not here.
    fn entry_still_valid(&self, entry: &ResolutionEntry) -> bool {
        if !self.fs.is_file(&entry.target) {
            return false;
        }
        entry.consulted.iter().all(|manifest| {
            Fingerprint::of(&*self.fs, manifest, self.config.fingerprint_mode)
                .map(|fp| self.caches.package_fingerprint(manifest) == Some(fp))
                .unwrap_or(false)
        })
    }
}

/// Accumulates the paths a single resolution touched.
#[derive(Debug, Default)]
struct Probe {
    tried: Vec<PathBuf>,
    consulted: Vec<PathBuf>,
}

/// `./x`, `../x` and absolute specifiers resolve as paths; everything else is
/// a bare package specifier.
fn is_path_specifier(specifier: &str) -> bool {
    specifier.starts_with("./")
        || specifier.starts_with("../")
        || specifier == "."
        || specifier == ".."
        || Path::new(specifier).is_absolute()
}

/// Append an extension candidate to a path without replacing an existing one
/// (`./util.spec` + `.js` must yield `util.spec.js`).
fn with_extension(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(ext);
    PathBuf::from(s)
}
