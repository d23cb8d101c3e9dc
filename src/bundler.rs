// src/bundler.rs

//! The public bundling surface: configure once, then `build` (one-shot) or
//! `watch` (incremental pipeline).
//!
//! Caches are injected at construction and owned by the caller; handing the
//! same `Arc<SharedCaches>` to several bundlers shares their memoized work,
//! handing each its own isolates them.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::SharedCaches;
use crate::emit;
use crate::engine::{BuiltBundle, BundleEvent, CoreEngine, EngineEvent, WatchRuntime};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};
use crate::graph::{GraphBuilder, SourceTransform};
use crate::resolve::{Resolver, ResolverConfig};
use crate::types::FingerprintMode;
use crate::watch::FileWatcher;

/// Construction-time configuration.
pub struct BundlerOptions {
    /// Root for relative entry paths and diagnostics.
    pub base_dir: PathBuf,
    /// Extension candidates for resolution, leading dot included.
    pub extensions: Vec<String>,
    /// Name of the per-directory modules root.
    pub modules_dirname: String,
    /// Extra search-path roots consulted when package resolution fails.
    pub search_paths: Vec<PathBuf>,
    pub fingerprint_mode: FingerprintMode,
    /// Source transforms applied while building the graph, in order.
    pub transforms: Vec<Arc<dyn SourceTransform>>,
    /// Quiet period the watcher waits for before emitting a change batch.
    pub debounce: Duration,
}

impl Default for BundlerOptions {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            extensions: vec![".js".to_string()],
            modules_dirname: "node_modules".to_string(),
            search_paths: Vec::new(),
            fingerprint_mode: FingerprintMode::default(),
            transforms: Vec::new(),
            debounce: Duration::from_millis(50),
        }
    }
}

impl std::fmt::Debug for BundlerOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundlerOptions")
            .field("base_dir", &self.base_dir)
            .field("extensions", &self.extensions)
            .field("modules_dirname", &self.modules_dirname)
            .field("search_paths", &self.search_paths)
            .field("fingerprint_mode", &self.fingerprint_mode)
            .field("transforms", &self.transforms.len())
            .field("debounce", &self.debounce)
            .finish()
    }
}

/// A configured bundler. Cheap to clone; clones share options, filesystem
/// and caches.
#[derive(Clone)]
pub struct Bundler {
    options: Arc<BundlerOptions>,
    fs: Arc<dyn FileSystem>,
    caches: Arc<SharedCaches>,
}

impl std::fmt::Debug for Bundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bundler")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Bundler {
    /// Bundler over the real filesystem.
    pub fn new(options: BundlerOptions, caches: Arc<SharedCaches>) -> Self {
        Self::with_fs(options, caches, Arc::new(RealFileSystem))
    }

    /// Bundler over an arbitrary filesystem (tests use the in-memory one).
    pub fn with_fs(
        options: BundlerOptions,
        caches: Arc<SharedCaches>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            options: Arc::new(options),
            fs,
            caches,
        }
    }

    pub fn options(&self) -> &BundlerOptions {
        &self.options
    }

    pub fn caches(&self) -> &Arc<SharedCaches> {
        &self.caches
    }

    /// One-shot build: graph, link check, emit.
    ///
    /// Resolution and parse failures abort the whole build; no partial
    /// bundle is ever produced.
    pub fn build(&self, entries: &[PathBuf]) -> Result<BuiltBundle> {
        let report = self.graph_builder()?.build(entries)?;
        emit::link_check(&report.graph)?;
        let (summary, stream) = emit::emit(&report.graph)?;

        debug!(
            modules = summary.modules,
            reparsed = report.stats.reparsed,
            "build finished"
        );

        Ok(BuiltBundle {
            stream,
            summary,
            stats: report.stats,
            changed: report.changed,
            entries: report.graph.entries().to_vec(),
            file_set: report.graph.file_set(),
        })
    }

    /// Start the incremental watch pipeline.
    ///
    /// Runs an initial build, then rebuilds on every debounced change batch,
    /// publishing [`BundleEvent`]s on the session channel. At most one build
    /// is in flight at a time; changes arriving mid-build are coalesced into
    /// one follow-up build.
    pub fn watch(&self, entries: Vec<PathBuf>) -> Result<WatchSession> {
        let (engine_tx, engine_rx) = mpsc::channel::<EngineEvent>(64);
        let (events_tx, events_rx) = mpsc::channel::<BundleEvent>(16);

        let watcher = FileWatcher::spawn(engine_tx.clone(), self.options.debounce)?;
        let runtime = WatchRuntime::new(
            CoreEngine::new(),
            engine_rx,
            engine_tx.clone(),
            events_tx,
            self.clone(),
            entries,
            watcher,
        );
        let handle = tokio::spawn(runtime.run());

        Ok(WatchSession {
            events: events_rx,
            engine_tx,
            handle,
        })
    }

    fn graph_builder(&self) -> Result<GraphBuilder> {
        let resolver = Resolver::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.caches),
            ResolverConfig {
                extensions: self.options.extensions.clone(),
                modules_dirname: self.options.modules_dirname.clone(),
                search_paths: self.options.search_paths.clone(),
                fingerprint_mode: self.options.fingerprint_mode,
            },
        );
        GraphBuilder::new(
            Arc::clone(&self.fs),
            Arc::clone(&self.caches),
            resolver,
            self.options.transforms.clone(),
            self.options.fingerprint_mode,
        )
    }
}

/// Handle on a running watch pipeline.
///
/// `events` yields [`BundleEvent`]s until the session is shut down. Dropping
/// the session tears the pipeline down as well, just less gracefully than
/// [`shutdown`](Self::shutdown).
#[derive(Debug)]
pub struct WatchSession {
    pub events: mpsc::Receiver<BundleEvent>,
    engine_tx: mpsc::Sender<EngineEvent>,
    handle: JoinHandle<Result<()>>,
}

impl WatchSession {
    pub async fn next_event(&mut self) -> Option<BundleEvent> {
        self.events.recv().await
    }

    /// Graceful teardown: unsubscribes all watches and waits for the
    /// runtime to exit. An in-flight build is allowed to finish, but nothing
    /// further is published.
    pub async fn shutdown(self) -> Result<()> {
        let _ = self.engine_tx.send(EngineEvent::ShutdownRequested).await;
        self.handle
            .await
            .context("joining watch runtime task")??;
        Ok(())
    }
}
