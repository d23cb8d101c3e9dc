// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::bundler::BundlerOptions;
use crate::types::FingerprintMode;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [bundle]
/// base_dir = "src"
/// entries = ["page/**/index.js"]
/// out_file = "build/bundle.js"
/// search_paths = ["web_modules"]
///
/// [watch]
/// debounce_ms = 50
/// fingerprint = "content"
/// ```
///
/// All sections are optional and have reasonable defaults, but a config
/// without `entries` fails validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub bundle: BundleSection,

    #[serde(default)]
    pub watch: WatchSection,
}

/// `[bundle]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BundleSection {
    /// Root directory for entries and relative resolution, relative to the
    /// config file's directory.
    #[serde(default = "default_base_dir")]
    pub base_dir: String,

    /// Glob patterns selecting the entry files, relative to `base_dir`.
    /// Validation rejects an empty list.
    #[serde(default)]
    pub entries: Vec<String>,

    /// Bundle output path, relative to the config file's directory.
    #[serde(default = "default_out_file")]
    pub out_file: String,

    /// Extension candidates for import resolution, leading dot included.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Name of the per-directory modules root.
    #[serde(default = "default_modules_dir")]
    pub modules_dir: String,

    /// Extra search-path roots, relative to `base_dir`, consulted when
    /// package resolution fails.
    #[serde(default)]
    pub search_paths: Vec<String>,
}

fn default_base_dir() -> String {
    ".".to_string()
}

fn default_out_file() -> String {
    "build/bundle.js".to_string()
}

fn default_extensions() -> Vec<String> {
    vec![".js".to_string()]
}

fn default_modules_dir() -> String {
    "node_modules".to_string()
}

impl Default for BundleSection {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            entries: Vec::new(),
            out_file: default_out_file(),
            extensions: default_extensions(),
            modules_dir: default_modules_dir(),
            search_paths: Vec::new(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchSection {
    /// Quiet period before a change batch is emitted, in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// `"modified"` (mtime + size) or `"content"` (blake3).
    #[serde(default)]
    pub fingerprint: FingerprintMode,
}

fn default_debounce_ms() -> u64 {
    50
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            fingerprint: FingerprintMode::default(),
        }
    }
}

/// Validated configuration. Constructed via `TryFrom<RawConfigFile>` in
/// [`validate`](crate::config::validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub bundle: BundleSection,
    pub watch: WatchSection,
}

impl ConfigFile {
    /// Internal constructor used after validation has passed.
    pub(crate) fn new_unchecked(bundle: BundleSection, watch: WatchSection) -> Self {
        Self { bundle, watch }
    }

    /// Effective base directory given the config file's own directory.
    pub fn base_dir(&self, config_root: &Path) -> PathBuf {
        config_root.join(&self.bundle.base_dir)
    }

    /// Effective output path given the config file's own directory.
    pub fn out_path(&self, config_root: &Path) -> PathBuf {
        config_root.join(&self.bundle.out_file)
    }

    /// Map the config onto [`BundlerOptions`].
    pub fn bundler_options(&self, config_root: &Path) -> BundlerOptions {
        let base_dir = self.base_dir(config_root);
        let search_paths = self
            .bundle
            .search_paths
            .iter()
            .map(|p| base_dir.join(p))
            .collect();
        BundlerOptions {
            base_dir,
            extensions: self.bundle.extensions.clone(),
            modules_dirname: self.bundle.modules_dir.clone(),
            search_paths,
            fingerprint_mode: self.watch.fingerprint,
            transforms: Vec::new(),
            debounce: Duration::from_millis(self.watch.debounce_ms),
        }
    }
}
