// src/cache/mod.rs

//! The shared cache layer: three independent stores memoizing parsed files,
//! resolved imports and package manifests across builds.
//!
//! The stores are owned by the caller and passed into the bundler at
//! construction (`Arc<SharedCaches>`), never held as global state. One
//! `SharedCaches` may back several bundler instances, or be isolated per
//! instance; either way, lifetime is the caller's business.
//!
//! A cached value is only served when its stored [`Fingerprint`] matches the
//! current on-disk state; a stale entry is recomputed, never silently reused.
//! There is no eviction policy beyond explicit invalidation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::UNIX_EPOCH;

use anyhow::Context;
use blake3::Hasher;
use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::resolve::PackageManifest;
use crate::types::FingerprintMode;

/// Opaque freshness token for a file.
///
/// `modified` mode encodes mtime + size; `content` mode a blake3 hash. The
/// two never compare equal, so switching modes degrades to a cold cache
/// rather than to wrong answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the current on-disk state of `path`.
    pub fn of(fs: &dyn FileSystem, path: &Path, mode: FingerprintMode) -> Result<Fingerprint> {
        match mode {
            FingerprintMode::Modified => {
                let (mtime, size) = fs.metadata(path)?;
                let nanos = mtime
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_nanos())
                    .unwrap_or(0);
                Ok(Fingerprint(format!("m:{nanos}:{size}")))
            }
            FingerprintMode::Content => {
                let contents = fs
                    .read_to_string(path)
                    .with_context(|| format!("hashing {:?}", path))?;
                let mut hasher = Hasher::new();
                hasher.update(contents.as_bytes());
                Ok(Fingerprint(format!("c:{}", hasher.finalize().to_hex())))
            }
        }
    }
}

/// Cached per-file result: raw source, transformed text and the scanned
/// import list.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub fingerprint: Fingerprint,
    pub source: String,
    pub text: String,
    pub imports: Vec<String>,
}

/// Cached resolution result for one (from_dir, specifier) query.
///
/// `consulted` lists the package manifests whose contents the answer depends
/// on; `tried` lists every candidate path probed on the way. Both feed the
/// invalidation cascade: creating or removing any of those paths may change
/// the answer.
#[derive(Debug, Clone)]
pub struct ResolutionEntry {
    pub target: PathBuf,
    pub consulted: Vec<PathBuf>,
    pub tried: Vec<PathBuf>,
}

/// Cached parsed package manifest.
#[derive(Debug, Clone)]
pub struct PackageEntry {
    pub fingerprint: Fingerprint,
    pub manifest: PackageManifest,
}

/// Hit/miss counters, one pair per store.
///
/// These exist so incremental behaviour is observable: a rebuild after a
/// single-file change should show exactly one file-cache miss.
#[derive(Debug, Default)]
pub struct CacheStats {
    file_hits: AtomicU64,
    file_misses: AtomicU64,
    resolution_hits: AtomicU64,
    resolution_misses: AtomicU64,
    package_hits: AtomicU64,
    package_misses: AtomicU64,
}

/// Plain-number snapshot of [`CacheStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub file_hits: u64,
    pub file_misses: u64,
    pub resolution_hits: u64,
    pub resolution_misses: u64,
    pub package_hits: u64,
    pub package_misses: u64,
}

/// The three stores plus counters, behind one shareable handle.
#[derive(Debug, Default)]
pub struct SharedCaches {
    files: Mutex<HashMap<PathBuf, FileEntry>>,
    resolutions: Mutex<HashMap<(PathBuf, String), ResolutionEntry>>,
    packages: Mutex<HashMap<PathBuf, PackageEntry>>,
    stats: CacheStats,
}

impl SharedCaches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validated file lookup: returns the entry only if its fingerprint
    /// matches `current`. A present-but-stale entry counts as a miss and is
    /// dropped.
    pub fn file_entry(&self, path: &Path, current: &Fingerprint) -> Option<FileEntry> {
        let mut files = self.files.lock().unwrap();
        match files.get(path) {
            Some(entry) if entry.fingerprint == *current => {
                self.stats.file_hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            Some(_) => {
                debug!("stale file cache entry for {:?}", path);
                files.remove(path);
                self.stats.file_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.file_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn store_file(&self, path: &Path, entry: FileEntry) {
        self.files.lock().unwrap().insert(path.to_path_buf(), entry);
    }

    /// Raw resolution lookup. The caller still has to validate the entry
    /// against the filesystem (target exists, consulted manifests fresh) and
    /// call [`drop_resolution`](Self::drop_resolution) if it turns out stale.
    pub fn resolution(&self, from_dir: &Path, specifier: &str) -> Option<ResolutionEntry> {
        let key = (from_dir.to_path_buf(), specifier.to_string());
        let resolutions = self.resolutions.lock().unwrap();
        match resolutions.get(&key) {
            Some(entry) => {
                self.stats.resolution_hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.clone())
            }
            None => {
                self.stats.resolution_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn store_resolution(&self, from_dir: &Path, specifier: &str, entry: ResolutionEntry) {
        self.resolutions
            .lock()
            .unwrap()
            .insert((from_dir.to_path_buf(), specifier.to_string()), entry);
    }

    /// Remove one resolution entry that validation found stale. Also undoes
    /// the hit that the preceding lookup counted.
    pub fn drop_resolution(&self, from_dir: &Path, specifier: &str) {
        let key = (from_dir.to_path_buf(), specifier.to_string());
        self.resolutions.lock().unwrap().remove(&key);
        self.stats.resolution_hits.fetch_sub(1, Ordering::Relaxed);
        self.stats.resolution_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Validated package manifest lookup.
    pub fn package(&self, manifest_path: &Path, current: &Fingerprint) -> Option<PackageManifest> {
        let mut packages = self.packages.lock().unwrap();
        match packages.get(manifest_path) {
            Some(entry) if entry.fingerprint == *current => {
                self.stats.package_hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.manifest.clone())
            }
            Some(_) => {
                packages.remove(manifest_path);
                self.stats.package_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.stats.package_misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Stored fingerprint for a manifest, without touching the counters.
    /// Used when validating resolution entries against the filesystem.
    pub fn package_fingerprint(&self, manifest_path: &Path) -> Option<Fingerprint> {
        self.packages
            .lock()
            .unwrap()
            .get(manifest_path)
            .map(|entry| entry.fingerprint.clone())
    }

    pub fn store_package(&self, manifest_path: &Path, entry: PackageEntry) {
        self.packages
            .lock()
            .unwrap()
            .insert(manifest_path.to_path_buf(), entry);
    }

    /// Invalidate everything that depends on `path`:
    /// - the file entry for `path`
    /// - the package entry for `path`
    /// - every resolution whose target, consulted manifests or probed
    ///   candidates reference `path` (creating a file can change an earlier
    ///   candidate's outcome, so `tried` participates too)
    pub fn invalidate(&self, path: &Path) {
        self.files.lock().unwrap().remove(path);
        self.packages.lock().unwrap().remove(path);

        let mut resolutions = self.resolutions.lock().unwrap();
        let before = resolutions.len();
        resolutions.retain(|_, entry| {
            entry.target != path
                && !entry.consulted.iter().any(|p| p == path)
                && !entry.tried.iter().any(|p| p == path)
        });
        let dropped = before - resolutions.len();
        if dropped > 0 {
            debug!(?path, dropped, "invalidation cascaded into resolution cache");
        }
    }

    /// Drop every entry in every store.
    pub fn clear(&self) {
        self.files.lock().unwrap().clear();
        self.resolutions.lock().unwrap().clear();
        self.packages.lock().unwrap().clear();
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            file_hits: self.stats.file_hits.load(Ordering::Relaxed),
            file_misses: self.stats.file_misses.load(Ordering::Relaxed),
            resolution_hits: self.stats.resolution_hits.load(Ordering::Relaxed),
            resolution_misses: self.stats.resolution_misses.load(Ordering::Relaxed),
            package_hits: self.stats.package_hits.load(Ordering::Relaxed),
            package_misses: self.stats.package_misses.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.stats.file_hits.store(0, Ordering::Relaxed);
        self.stats.file_misses.store(0, Ordering::Relaxed);
        self.stats.resolution_hits.store(0, Ordering::Relaxed);
        self.stats.resolution_misses.store(0, Ordering::Relaxed);
        self.stats.package_hits.store(0, Ordering::Relaxed);
        self.stats.package_misses.store(0, Ordering::Relaxed);
    }
}
