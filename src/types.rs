use std::str::FromStr;

use serde::Deserialize;

/// How cache freshness is established for a file.
///
/// - `Modified`: fingerprint is mtime + size. Validating a cache hit costs a
///   stat, not a read (default behaviour).
/// - `Content`: fingerprint is a blake3 hash of the file contents. Slower but
///   immune to coarse mtime granularity and to tools that rewrite files
///   without changing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FingerprintMode {
    Modified,
    Content,
}

impl Default for FingerprintMode {
    fn default() -> Self {
        FingerprintMode::Modified
    }
}

impl FromStr for FingerprintMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "modified" | "mtime" => Ok(FingerprintMode::Modified),
            "content" | "hash" => Ok(FingerprintMode::Content),
            other => Err(format!(
                "invalid fingerprint mode: {other} (expected \"modified\" or \"content\")"
            )),
        }
    }
}

/// Why a rebuild was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildCause {
    /// The initial build when the pipeline starts.
    Initial,
    /// One or more watched files changed.
    FileChange,
}
