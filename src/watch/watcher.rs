// src/watch/watcher.rs

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::engine::EngineEvent;
use crate::errors::RepackError;

/// Watches the files of the current module graph and forwards debounced
/// change batches into the engine.
///
/// Subscriptions are per parent directory (non-recursive) rather than per
/// file: editors that replace files on save would otherwise silently detach
/// the watch. Events are filtered against the tracked file set, so churn in
/// a watched directory that doesn't touch graph files never reaches the
/// engine.
///
/// Dropping the watcher tears down every subscription.
pub struct FileWatcher {
    inner: RecommendedWatcher,
    watched_dirs: HashSet<PathBuf>,
    tracked: Arc<Mutex<HashSet<PathBuf>>>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("watched_dirs", &self.watched_dirs)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Create the watcher and the debounce task feeding `engine_tx`.
    ///
    /// The watcher starts with an empty target set; the runtime retargets it
    /// after the initial build.
    pub fn spawn(engine_tx: mpsc::Sender<EngineEvent>, debounce: Duration) -> Result<Self> {
        let tracked: Arc<Mutex<HashSet<PathBuf>>> = Arc::new(Mutex::new(HashSet::new()));

        // Channel from the synchronous notify callback into the async world.
        let (raw_tx, mut raw_rx) = mpsc::unbounded_channel::<Event>();

        let inner = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if raw_tx.send(event).is_err() {
                        // Debounce task is gone; nothing left to notify.
                    }
                }
                Err(err) => {
                    eprintln!("repack: file watch error: {err}");
                }
            },
            Config::default(),
        )?;

        // Debounce task: accumulate tracked paths until the event stream
        // goes quiet for one debounce interval, then emit a single batch.
        let task_tracked = Arc::clone(&tracked);
        tokio::spawn(async move {
            let mut pending: BTreeSet<PathBuf> = BTreeSet::new();
            loop {
                tokio::select! {
                    maybe_event = raw_rx.recv() => {
                        match maybe_event {
                            Some(event) => {
                                let tracked = task_tracked.lock().unwrap();
                                for path in event.paths {
                                    if let Some(hit) = tracked_path(&tracked, &path) {
                                        pending.insert(hit);
                                    }
                                }
                            }
                            None => break,
                        }
                    }
                    _ = tokio::time::sleep(debounce), if !pending.is_empty() => {
                        let batch: Vec<PathBuf> = std::mem::take(&mut pending).into_iter().collect();
                        debug!(changed = batch.len(), "debounced change batch");
                        if engine_tx.send(EngineEvent::ChangesDetected(batch)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!("watcher debounce task finished");
        });

        Ok(Self {
            inner,
            watched_dirs: HashSet::new(),
            tracked,
        })
    }

    /// Re-subscribe to exactly the given file set: directories of new files
    /// are watched, directories no longer holding any tracked file are
    /// unwatched. A path that cannot be watched is logged and skipped; the
    /// watcher keeps going with the rest.
    pub fn retarget(&mut self, files: &HashSet<PathBuf>) {
        *self.tracked.lock().unwrap() = files.clone();

        let wanted: HashSet<PathBuf> = files
            .iter()
            .filter_map(|f| f.parent().map(Path::to_path_buf))
            .collect();

        for dir in self.watched_dirs.difference(&wanted) {
            if let Err(err) = self.inner.unwatch(dir) {
                debug!(?dir, %err, "unwatch failed (already gone?)");
            }
        }

        let mut active = HashSet::new();
        for dir in &wanted {
            if self.watched_dirs.contains(dir) {
                active.insert(dir.clone());
                continue;
            }
            match self.inner.watch(dir, RecursiveMode::NonRecursive) {
                Ok(()) => {
                    active.insert(dir.clone());
                }
                Err(source) => {
                    let err = RepackError::WatchSubscription {
                        path: dir.clone(),
                        source,
                    };
                    warn!(%err, "skipping unwatchable directory");
                }
            }
        }

        info!(
            files = files.len(),
            dirs = active.len(),
            "watcher retargeted"
        );
        self.watched_dirs = active;
    }
}

/// Match an event path against the tracked set, tolerating the
/// non-canonical forms some platforms report.
fn tracked_path(tracked: &HashSet<PathBuf>, path: &Path) -> Option<PathBuf> {
    if tracked.contains(path) {
        return Some(path.to_path_buf());
    }
    if let Ok(canonical) = path.canonicalize() {
        if tracked.contains(&canonical) {
            return Some(canonical);
        }
    }
    None
}
