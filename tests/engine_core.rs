//! The pure watch-controller core: single-flight builds, mid-build
//! coalescing, error handling and shutdown, all without a runtime.

use std::collections::HashSet;
use std::path::PathBuf;

use repack::emit;
use repack::engine::{
    BuiltBundle, BundleEvent, CoreEngine, EngineCommand, EngineEvent, WatchState,
};
use repack::errors::RepackError;
use repack::graph::{BuildStats, ModuleGraph};
use repack_test_utils::init_tracing;

/// A successful build result with nothing in it; the core only routes it.
fn empty_bundle() -> BuiltBundle {
    let graph = ModuleGraph::default();
    let (summary, stream) = emit::emit(&graph).expect("emitting empty graph");
    BuiltBundle {
        stream,
        summary,
        stats: BuildStats::default(),
        changed: Vec::new(),
        entries: Vec::new(),
        file_set: HashSet::new(),
    }
}

fn paths(names: &[&str]) -> Vec<PathBuf> {
    names.iter().map(PathBuf::from).collect()
}

fn start_builds(commands: &[EngineCommand]) -> Vec<&Vec<PathBuf>> {
    commands
        .iter()
        .filter_map(|c| match c {
            EngineCommand::StartBuild { invalidate, .. } => Some(invalidate),
            _ => None,
        })
        .collect()
}

#[test]
fn initial_build_transitions_idle_to_building() {
    init_tracing();

    let mut core = CoreEngine::new();
    assert_eq!(core.state(), WatchState::Idle);

    let step = core.initial_build();
    assert!(step.keep_running);
    assert_eq!(start_builds(&step.commands).len(), 1);
    assert_eq!(core.state(), WatchState::Building);

    // Calling it again is a no-op; there is never a second in-flight build.
    let again = core.initial_build();
    assert!(start_builds(&again.commands).is_empty());
}

#[test]
fn successful_build_publishes_summary_retarget_and_ready() {
    init_tracing();

    let mut core = CoreEngine::new();
    core.initial_build();

    let step = core.step(EngineEvent::BuildFinished(Ok(empty_bundle())));
    assert_eq!(core.state(), WatchState::Watching);

    let kinds: Vec<&str> = step
        .commands
        .iter()
        .map(|c| match c {
            EngineCommand::Publish(BundleEvent::BuildSummary { .. }) => "summary",
            EngineCommand::Retarget(_) => "retarget",
            EngineCommand::Publish(BundleEvent::BundleReady { .. }) => "ready",
            EngineCommand::Publish(BundleEvent::Error(_)) => "error",
            EngineCommand::StartBuild { .. } => "start",
        })
        .collect();
    // The watcher is retargeted before the bundle is announced, so a
    // consumer reacting to `ready` already has the new file set watched.
    assert_eq!(kinds, vec!["summary", "retarget", "ready"]);
}

#[test]
fn changes_while_building_coalesce_into_one_followup() {
    init_tracing();

    let mut core = CoreEngine::new();
    core.initial_build();

    let step = core.step(EngineEvent::ChangesDetected(paths(&["/a.js"])));
    assert!(start_builds(&step.commands).is_empty(), "single-flight");
    assert!(core.has_pending());

    let step = core.step(EngineEvent::ChangesDetected(paths(&["/b.js", "/a.js"])));
    assert!(start_builds(&step.commands).is_empty());

    // Build completes: exactly one follow-up covering the union.
    let step = core.step(EngineEvent::BuildFinished(Ok(empty_bundle())));
    let builds = start_builds(&step.commands);
    assert_eq!(builds.len(), 1);
    assert_eq!(*builds[0], paths(&["/a.js", "/b.js"]));
    assert_eq!(core.state(), WatchState::Building);
    assert!(!core.has_pending());

    // The follow-up finishes with nothing else queued: back to Watching.
    let step = core.step(EngineEvent::BuildFinished(Ok(empty_bundle())));
    assert!(start_builds(&step.commands).is_empty());
    assert_eq!(core.state(), WatchState::Watching);
}

#[test]
fn changes_while_watching_start_a_build_immediately() {
    init_tracing();

    let mut core = CoreEngine::new();
    core.initial_build();
    core.step(EngineEvent::BuildFinished(Ok(empty_bundle())));
    assert_eq!(core.state(), WatchState::Watching);

    let step = core.step(EngineEvent::ChangesDetected(paths(&["/x.js"])));
    let builds = start_builds(&step.commands);
    assert_eq!(builds.len(), 1);
    assert_eq!(*builds[0], paths(&["/x.js"]));
    assert_eq!(core.state(), WatchState::Building);
}

#[test]
fn failed_build_publishes_error_and_keeps_watching() {
    init_tracing();

    let mut core = CoreEngine::new();
    core.initial_build();

    let step = core.step(EngineEvent::BuildFinished(Err(RepackError::CycleRuntime(
        "boom".to_string(),
    ))));
    assert!(step.keep_running, "a build failure never stops the controller");
    assert_eq!(core.state(), WatchState::Watching);
    assert!(matches!(
        step.commands.as_slice(),
        [EngineCommand::Publish(BundleEvent::Error(_))]
    ));

    // And the next change still triggers a build.
    let step = core.step(EngineEvent::ChangesDetected(paths(&["/x.js"])));
    assert_eq!(start_builds(&step.commands).len(), 1);
}

#[test]
fn failure_with_pending_changes_still_rebuilds() {
    init_tracing();

    let mut core = CoreEngine::new();
    core.initial_build();
    core.step(EngineEvent::ChangesDetected(paths(&["/a.js"])));

    let step = core.step(EngineEvent::BuildFinished(Err(RepackError::CycleRuntime(
        "boom".to_string(),
    ))));
    // Error published, then the coalesced follow-up starts.
    assert_eq!(start_builds(&step.commands).len(), 1);
    assert_eq!(core.state(), WatchState::Building);
}

#[test]
fn shutdown_is_terminal() {
    init_tracing();

    let mut core = CoreEngine::new();
    core.initial_build();

    let step = core.step(EngineEvent::ShutdownRequested);
    assert!(!step.keep_running);
    assert_eq!(core.state(), WatchState::Stopped);

    // Stale events after shutdown produce no commands.
    let step = core.step(EngineEvent::ChangesDetected(paths(&["/x.js"])));
    assert!(step.commands.is_empty());
    assert!(!step.keep_running);

    let step = core.step(EngineEvent::BuildFinished(Ok(empty_bundle())));
    assert!(step.commands.is_empty());
    assert!(!step.keep_running);
}
