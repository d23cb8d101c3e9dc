// src/config/entries.rs

//! Entry-glob expansion: turn the `[bundle].entries` patterns into the
//! concrete list of entry files under `base_dir`.
//!
//! Glob *semantics* are `globset`'s business; this module only walks the
//! tree through the filesystem abstraction and matches relative paths. The
//! result is sorted so the entry order (and with it module numbering) is
//! deterministic regardless of directory iteration order.

use std::path::{Path, PathBuf};

use anyhow::Context;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::debug;

use crate::errors::{RepackError, Result};
use crate::fs::FileSystem;

/// Collect all files under `base_dir` matching any of `patterns`.
pub fn collect_entry_files(
    fs: &dyn FileSystem,
    base_dir: &Path,
    patterns: &[String],
) -> Result<Vec<PathBuf>> {
    let set = build_globset(patterns)?;

    let mut files = Vec::new();
    let mut stack = vec![base_dir.to_path_buf()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                if let Ok(rel) = path.strip_prefix(base_dir) {
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if set.is_match(&rel_str) {
                        files.push(path);
                    }
                }
            }
        }
    }

    files.sort();
    debug!(count = files.len(), ?base_dir, "entry globs expanded");

    if files.is_empty() {
        return Err(RepackError::ConfigError(format!(
            "no entry files matched {:?} under {:?}",
            patterns, base_dir
        )));
    }

    Ok(files)
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build().map_err(anyhow::Error::from)?)
}
