// src/fs/memory.rs

//! In-memory [`FileSystem`] used by tests and by anything that wants to build
//! a graph without touching disk.
//!
//! Paths are stored normalized (lexically, `.` and `..` folded), so
//! `canonicalize` never fails for paths that exist in the map. "Modification
//! times" are a monotonic counter mapped onto `SystemTime`, which is enough
//! for fingerprinting.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime};

use anyhow::{Result, anyhow};

use super::FileSystem;

#[derive(Debug)]
struct FileEntry {
    contents: String,
    version: u64,
}

/// Thread-safe in-memory filesystem.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, FileEntry>>,
    clock: Mutex<u64>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a file. Bumps the file's version, so fingerprints
    /// of both modes observe the change.
    pub fn write(&self, path: impl AsRef<Path>, contents: impl Into<String>) {
        let path = normalize(path.as_ref());
        let mut clock = self.clock.lock().unwrap();
        *clock += 1;
        let version = *clock;
        self.files.lock().unwrap().insert(
            path,
            FileEntry {
                contents: contents.into(),
                version,
            },
        );
    }

    /// Remove a file, if present.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = normalize(path.as_ref());
        self.files.lock().unwrap().remove(&path);
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let path = normalize(path);
        self.files
            .lock()
            .unwrap()
            .get(&path)
            .map(|e| e.contents.clone())
            .ok_or_else(|| anyhow!("no such file: {:?}", path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        let path = normalize(path);
        self.files.lock().unwrap().contains_key(&path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let path = normalize(path);
        let files = self.files.lock().unwrap();
        files.keys().any(|p| p.starts_with(&path) && *p != path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        let path = normalize(path);
        if self.exists(&path) {
            Ok(path)
        } else {
            Err(anyhow!("no such file or directory: {:?}", path))
        }
    }

    fn metadata(&self, path: &Path) -> Result<(SystemTime, u64)> {
        let path = normalize(path);
        let files = self.files.lock().unwrap();
        let entry = files
            .get(&path)
            .ok_or_else(|| anyhow!("no such file: {:?}", path))?;
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_nanos(entry.version);
        Ok((mtime, entry.contents.len() as u64))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let path = normalize(path);
        let files = self.files.lock().unwrap();
        let mut entries: Vec<PathBuf> = Vec::new();
        for candidate in files.keys() {
            if let Ok(rest) = candidate.strip_prefix(&path) {
                if let Some(first) = rest.components().next() {
                    let child = path.join(first.as_os_str());
                    if !entries.contains(&child) {
                        entries.push(child);
                    }
                }
            }
        }
        if entries.is_empty() && !files.keys().any(|p| p.starts_with(&path)) {
            return Err(anyhow!("no such directory: {:?}", path));
        }
        Ok(entries)
    }
}

/// Fold `.` and `..` components lexically.
///
/// Unlike `fs::canonicalize` this never touches the filesystem and never
/// fails, which is what candidate probing needs: most candidates do not
/// exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(Component::ParentDir.as_os_str());
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
