#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;

use repack::bundler::BundlerOptions;
use repack::types::FingerprintMode;

/// Builder for on-disk module fixture trees.
///
/// ```no_run
/// use repack_test_utils::builders::ProjectBuilder;
///
/// let project = ProjectBuilder::new()
///     .file("src/index.js", "require('./util.js');")
///     .file("src/util.js", "module.exports = 1;")
///     .build();
/// ```
pub struct ProjectBuilder {
    files: Vec<(String, String)>,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    pub fn file(mut self, rel_path: &str, contents: &str) -> Self {
        self.files.push((rel_path.to_string(), contents.to_string()));
        self
    }

    pub fn build(self) -> Project {
        let dir = TempDir::new().expect("creating fixture tempdir");
        let project = Project { dir };
        for (rel_path, contents) in &self.files {
            project.write(rel_path, contents);
        }
        project
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixture tree on disk. Removed when dropped.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, rel_path: &str) -> PathBuf {
        self.dir.path().join(rel_path)
    }

    /// Create or overwrite a file, creating parent directories as needed.
    pub fn write(&self, rel_path: &str, contents: &str) {
        let path = self.path(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("creating fixture directory");
        }
        std::fs::write(&path, contents).expect("writing fixture file");
    }

    pub fn remove(&self, rel_path: &str) {
        std::fs::remove_file(self.path(rel_path)).expect("removing fixture file");
    }
}

/// Builder for `BundlerOptions` with test-friendly defaults (content
/// fingerprints, short debounce).
pub struct OptionsBuilder {
    options: BundlerOptions,
}

impl OptionsBuilder {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            options: BundlerOptions {
                base_dir: base_dir.into(),
                fingerprint_mode: FingerprintMode::Content,
                debounce: Duration::from_millis(20),
                ..BundlerOptions::default()
            },
        }
    }

    pub fn extension(mut self, ext: &str) -> Self {
        if !self.options.extensions.iter().any(|e| e == ext) {
            self.options.extensions.push(ext.to_string());
        }
        self
    }

    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.options.search_paths.push(path.into());
        self
    }

    pub fn modules_dirname(mut self, name: &str) -> Self {
        self.options.modules_dirname = name.to_string();
        self
    }

    pub fn fingerprint_mode(mut self, mode: FingerprintMode) -> Self {
        self.options.fingerprint_mode = mode;
        self
    }

    pub fn build(self) -> BundlerOptions {
        self.options
    }
}
