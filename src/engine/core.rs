// src/engine/core.rs

//! Pure core of the watch controller.
//!
//! A synchronous, deterministic state machine that consumes [`EngineEvent`]s
//! and produces [`EngineCommand`]s. It owns no channels, no Tokio types, and
//! performs no IO, so every coalescing and single-flight rule can be unit
//! tested without a runtime.
//!
//! Guarantees encoded here:
//! - at most one build in flight at any time
//! - changes observed while Building are coalesced and trigger exactly one
//!   follow-up build covering all of them
//! - a failed build publishes an error and returns to Watching; it never
//!   stops the controller

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::{BuiltBundle, BundleEvent, EngineCommand, EngineEvent, WatchState};
use crate::errors::RepackError;
use crate::types::RebuildCause;

/// Result of feeding one event into the core.
#[derive(Debug)]
pub struct CoreStep {
    pub commands: Vec<EngineCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn running(commands: Vec<EngineCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

#[derive(Debug)]
pub struct CoreEngine {
    state: WatchState,
    /// Paths that changed while a build was in flight, awaiting the
    /// follow-up build.
    pending: BTreeSet<PathBuf>,
}

impl CoreEngine {
    pub fn new() -> Self {
        Self {
            state: WatchState::Idle,
            pending: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Whether changes are currently queued behind an in-flight build.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Kick off the initial build. Only meaningful from Idle.
    pub fn initial_build(&mut self) -> CoreStep {
        if self.state != WatchState::Idle {
            return CoreStep::running(Vec::new());
        }
        self.state = WatchState::Building;
        CoreStep::running(vec![EngineCommand::StartBuild {
            invalidate: Vec::new(),
            cause: RebuildCause::Initial,
        }])
    }

    /// Handle a single event, updating state and returning the commands the
    /// IO shell should execute.
    pub fn step(&mut self, event: EngineEvent) -> CoreStep {
        match event {
            EngineEvent::ChangesDetected(paths) => self.on_changes(paths),
            EngineEvent::BuildFinished(result) => self.on_build_finished(result),
            EngineEvent::ShutdownRequested => {
                self.state = WatchState::Stopped;
                CoreStep {
                    commands: Vec::new(),
                    keep_running: false,
                }
            }
        }
    }

    fn on_changes(&mut self, paths: Vec<PathBuf>) -> CoreStep {
        match self.state {
            WatchState::Watching | WatchState::Idle => {
                self.state = WatchState::Building;
                CoreStep::running(vec![EngineCommand::StartBuild {
                    invalidate: paths,
                    cause: RebuildCause::FileChange,
                }])
            }
            WatchState::Building => {
                // Single-flight: remember the paths, build once afterwards.
                self.pending.extend(paths);
                CoreStep::running(Vec::new())
            }
            WatchState::Stopped => CoreStep {
                commands: Vec::new(),
                keep_running: false,
            },
        }
    }

    fn on_build_finished(&mut self, result: Result<BuiltBundle, RepackError>) -> CoreStep {
        if self.state != WatchState::Building {
            // Stale completion (e.g. arriving after Stopped); nothing to do.
            return CoreStep {
                commands: Vec::new(),
                keep_running: self.state != WatchState::Stopped,
            };
        }

        let mut commands = Vec::new();
        match result {
            Ok(bundle) => {
                commands.push(EngineCommand::Publish(BundleEvent::BuildSummary {
                    entries: bundle.entries.clone(),
                }));
                commands.push(EngineCommand::Retarget(bundle.file_set.clone()));
                commands.push(EngineCommand::Publish(BundleEvent::BundleReady {
                    stream: bundle.stream,
                    summary: bundle.summary,
                    changed: bundle.changed,
                }));
            }
            Err(error) => {
                commands.push(EngineCommand::Publish(BundleEvent::Error(error)));
            }
        }

        if self.pending.is_empty() {
            self.state = WatchState::Watching;
        } else {
            // Exactly one follow-up build covering all coalesced changes.
            let coalesced: Vec<PathBuf> = std::mem::take(&mut self.pending).into_iter().collect();
            commands.push(EngineCommand::StartBuild {
                invalidate: coalesced,
                cause: RebuildCause::FileChange,
            });
        }

        CoreStep::running(commands)
    }
}

impl Default for CoreEngine {
    fn default() -> Self {
        Self::new()
    }
}
