// src/watch/mod.rs

//! Filesystem change observation.
//!
//! [`FileWatcher`] hides the OS watch mechanism (`notify`) behind the small
//! interface the engine consumes: a stream of debounced
//! [`EngineEvent::ChangesDetected`](crate::engine::EngineEvent) batches, plus
//! `retarget` to swap the tracked file set after each rebuild.

pub mod watcher;

pub use watcher::FileWatcher;
