// src/engine/mod.rs

//! The incremental watch controller.
//!
//! This module ties together:
//! - the pure core state machine ([`core`]): Idle -> Building -> Watching,
//!   single-flight builds, coalescing of changes that arrive mid-build
//! - the async IO shell ([`runtime`]): reading events from channels, running
//!   builds on blocking tasks, publishing bundle events, retargeting the
//!   filesystem watcher
//!
//! The split mirrors the rest of the crate's philosophy: semantics live in
//! synchronous, channel-free code; Tokio stays at the edges.

use std::collections::HashSet;
use std::path::PathBuf;

use crate::emit::{BundleStream, EmitSummary};
use crate::errors::RepackError;
use crate::graph::BuildStats;
use crate::types::RebuildCause;

pub mod core;
pub mod runtime;

pub use self::core::{CoreEngine, CoreStep};
pub use self::runtime::WatchRuntime;

/// Lifecycle state of the watch pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Constructed, initial build not yet started.
    Idle,
    /// A build is in flight. Never more than one.
    Building,
    /// Waiting for filesystem changes.
    Watching,
    /// Torn down; no further events will be processed or published.
    Stopped,
}

/// Everything a successful build hands back to the controller.
#[derive(Debug)]
pub struct BuiltBundle {
    /// Read-once chunk stream of the rendered bundle.
    pub stream: BundleStream,
    pub summary: EmitSummary,
    pub stats: BuildStats,
    /// Modules re-parsed by this build.
    pub changed: Vec<PathBuf>,
    /// Entry points included in this build.
    pub entries: Vec<PathBuf>,
    /// Every file in the graph; the watcher is retargeted to exactly this set.
    pub file_set: HashSet<PathBuf>,
}

/// Events flowing into the controller from the watcher and build tasks.
#[derive(Debug)]
pub enum EngineEvent {
    /// A debounced batch of changed paths.
    ChangesDetected(Vec<PathBuf>),
    /// The in-flight build finished.
    BuildFinished(Result<BuiltBundle, RepackError>),
    /// Graceful teardown requested.
    ShutdownRequested,
}

/// Commands the core returns for the IO shell to execute.
#[derive(Debug)]
pub enum EngineCommand {
    /// Invalidate the given paths in the cache layer, then start a build.
    StartBuild {
        invalidate: Vec<PathBuf>,
        cause: RebuildCause,
    },
    /// Publish an event on the outward channel.
    Publish(BundleEvent),
    /// Re-subscribe the watcher to exactly this file set.
    Retarget(HashSet<PathBuf>),
}

/// Events published outward to the consumer of a watch session.
#[derive(Debug)]
pub enum BundleEvent {
    /// Entry points included in the build that is about to be published.
    BuildSummary { entries: Vec<PathBuf> },
    /// A completed bundle. `stream` is read-once; drain it or lose it.
    BundleReady {
        stream: BundleStream,
        summary: EmitSummary,
        changed: Vec<PathBuf>,
    },
    /// A build failed. The controller stays in Watching; subsequent changes
    /// still trigger rebuilds.
    Error(RepackError),
}
