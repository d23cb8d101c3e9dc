// src/errors.rs

//! Crate-wide error taxonomy and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepackError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// An import specifier could not be mapped to a file. Carries every
    /// candidate path that was tried, for diagnostics.
    #[error("cannot resolve '{specifier}' from {from_dir:?} (tried {candidates:?})")]
    Resolution {
        specifier: String,
        from_dir: PathBuf,
        candidates: Vec<PathBuf>,
    },

    /// Source could not be scanned for imports.
    #[error("parse error in {path:?} at {line}:{column}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    /// The registry link check found a module reference that cannot be
    /// satisfied even with lazy binding.
    #[error("module registry cannot link: {0}")]
    CycleRuntime(String),

    /// A filesystem watch could not be established on a path. Non-fatal;
    /// the watcher logs it and keeps going with the remaining paths.
    #[error("failed to watch {path:?}: {source}")]
    WatchSubscription {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, RepackError>;
