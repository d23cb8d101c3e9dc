// src/engine/runtime.rs

use std::fmt;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::bundler::Bundler;
use crate::errors::Result;
use crate::watch::FileWatcher;

use super::core::CoreEngine;
use super::{BundleEvent, EngineCommand, EngineEvent};

/// Async IO shell around [`CoreEngine`].
///
/// Reads events from the engine channel, feeds them into the pure core, and
/// executes the commands it gets back: builds run on blocking tasks (so the
/// event loop keeps receiving — and coalescing — changes mid-build), bundle
/// events go out on the session channel, and the watcher is retargeted after
/// every successful build.
pub struct WatchRuntime {
    core: CoreEngine,
    event_rx: mpsc::Receiver<EngineEvent>,
    event_tx: mpsc::Sender<EngineEvent>,
    events_out: mpsc::Sender<BundleEvent>,
    bundler: Bundler,
    entries: Vec<PathBuf>,
    watcher: FileWatcher,
}

impl fmt::Debug for WatchRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRuntime")
            .field("core", &self.core)
            .field("entries", &self.entries)
            .finish_non_exhaustive()
    }
}

impl WatchRuntime {
    pub fn new(
        core: CoreEngine,
        event_rx: mpsc::Receiver<EngineEvent>,
        event_tx: mpsc::Sender<EngineEvent>,
        events_out: mpsc::Sender<BundleEvent>,
        bundler: Bundler,
        entries: Vec<PathBuf>,
        watcher: FileWatcher,
    ) -> Self {
        Self {
            core,
            event_rx,
            event_tx,
            events_out,
            bundler,
            entries,
            watcher,
        }
    }

    /// Main event loop. Starts the initial build, then processes events
    /// until shutdown or until the session consumer goes away.
    pub async fn run(mut self) -> Result<()> {
        info!("repack watch runtime started");

        let step = self.core.initial_build();
        if !self.execute(step.commands).await? {
            return Ok(());
        }

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("engine event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);
            let consumer_alive = self.execute(step.commands).await?;

            if !step.keep_running {
                info!("core requested exit; stopping watch runtime");
                break;
            }
            if !consumer_alive {
                info!("session consumer dropped; stopping watch runtime");
                break;
            }
        }

        // Dropping the watcher here tears down every filesystem
        // subscription. An in-flight build may still complete on its
        // blocking thread; its completion event lands in a closed channel
        // and is never published.
        info!("watch runtime exiting");
        Ok(())
    }

    /// Execute the commands from one core step. Returns false once the
    /// outward event channel is closed.
    async fn execute(&mut self, commands: Vec<EngineCommand>) -> Result<bool> {
        for command in commands {
            match command {
                EngineCommand::StartBuild { invalidate, cause } => {
                    debug!(?cause, changed = invalidate.len(), "starting build");
                    for path in &invalidate {
                        self.bundler.caches().invalidate(path);
                    }
                    let bundler = self.bundler.clone();
                    let entries = self.entries.clone();
                    let tx = self.event_tx.clone();
                    tokio::task::spawn_blocking(move || {
                        let result = bundler.build(&entries);
                        if tx.blocking_send(EngineEvent::BuildFinished(result)).is_err() {
                            debug!("runtime gone before build completion could be delivered");
                        }
                    });
                }
                EngineCommand::Publish(event) => {
                    if self.events_out.send(event).await.is_err() {
                        warn!("bundle event receiver dropped");
                        return Ok(false);
                    }
                }
                EngineCommand::Retarget(files) => {
                    self.watcher.retarget(&files);
                }
            }
        }
        Ok(true)
    }
}
