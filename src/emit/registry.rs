// src/emit/registry.rs

//! Rust model of the loader registry used as a pre-emit link check.
//!
//! Mirrors the semantics of the JS prelude: each module is in one of three
//! states, and a `require` hitting an `Initializing` module receives its
//! partially-initialized exports (lazy binding), which is what makes cyclic
//! graphs emittable. Running the model proves that every module's exports
//! are reachable from the entries without deadlock, and that every
//! dependency edge points at a module actually present in the graph.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::errors::{RepackError, Result};
use crate::graph::ModuleGraph;

/// Initialization state of one module record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Ready,
}

/// Simulate loading every entry through the lazy registry.
///
/// Returns the order in which modules become `Ready` (for an acyclic graph
/// this is a topological order). Fails with [`RepackError::CycleRuntime`]
/// when a dependency edge points outside the graph, the one situation lazy
/// binding cannot save.
pub fn link_check(graph: &ModuleGraph) -> Result<Vec<PathBuf>> {
    let mut states: HashMap<PathBuf, InitState> = HashMap::new();
    let mut ready_order = Vec::new();

    enum Visit {
        Enter(PathBuf),
        Exit(PathBuf),
    }

    for entry in graph.entries() {
        let mut stack = vec![Visit::Enter(entry.clone())];

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(path) => {
                    let state = states
                        .get(&path)
                        .copied()
                        .unwrap_or(InitState::Uninitialized);
                    if state != InitState::Uninitialized {
                        // Ready: memoized. Initializing: the lazy registry
                        // hands back partial exports; either way, no descent.
                        continue;
                    }

                    let module = graph.module(&path).ok_or_else(|| {
                        RepackError::CycleRuntime(format!(
                            "entry or dependency {:?} is not in the module graph",
                            path
                        ))
                    })?;

                    states.insert(path.clone(), InitState::Initializing);
                    stack.push(Visit::Exit(path));

                    for (specifier, target) in module.deps.iter().rev() {
                        if graph.module(target).is_none() {
                            return Err(RepackError::CycleRuntime(format!(
                                "{:?} requires '{}' -> {:?}, which is not in the module graph",
                                module.path, specifier, target
                            )));
                        }
                        stack.push(Visit::Enter(target.clone()));
                    }
                }
                Visit::Exit(path) => {
                    states.insert(path.clone(), InitState::Ready);
                    ready_order.push(path);
                }
            }
        }
    }

    Ok(ready_order)
}
