// src/emit/mod.rs

//! Serializes a [`ModuleGraph`] into one linear bundle.
//!
//! Each module gets a stable integer identifier (its discovery index, so
//! identical graphs always number identically). Output is the loader
//! prelude, then each module's text wrapped in a closure together with its
//! specifier->id dependency map, then the entry id list.
//!
//! Emission order is dependency-first: strongly connected components of the
//! import graph in reverse topological order, members of a cycle in
//! discovery order (the lazy registry makes any order inside a cycle safe).
//! Output is produced chunk-by-chunk, one module at a time, never buffered
//! whole.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::errors::Result;
use crate::graph::ModuleGraph;

pub mod prelude;
pub mod registry;

pub use registry::{InitState, link_check};

/// Stable identifier of a module within one bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModuleId(pub usize);

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What one emission produced.
#[derive(Debug, Clone)]
pub struct EmitSummary {
    pub modules: usize,
    pub entry_ids: Vec<ModuleId>,
    pub bytes: u64,
}

/// One rendered piece of the bundle: the prelude, a single module, or the
/// closing entry list.
#[derive(Debug, Clone)]
pub struct BundleChunk(pub String);

/// Read-once stream of bundle chunks, handed to the consumer of a build.
#[derive(Debug)]
pub struct BundleStream {
    rx: mpsc::UnboundedReceiver<BundleChunk>,
}

impl BundleStream {
    pub async fn next_chunk(&mut self) -> Option<BundleChunk> {
        self.rx.recv().await
    }

    /// Drain the remaining chunks into one string.
    pub async fn collect(mut self) -> String {
        let mut out = String::new();
        while let Some(BundleChunk(chunk)) = self.rx.recv().await {
            out.push_str(&chunk);
        }
        out
    }

    /// Synchronous drain for non-async consumers (e.g. one-shot CLI output).
    pub fn collect_blocking(mut self) -> String {
        let mut out = String::new();
        while let Some(BundleChunk(chunk)) = self.rx.blocking_recv() {
            out.push_str(&chunk);
        }
        out
    }
}

/// Emit into a chunk stream. The channel is unbounded, so rendering runs to
/// completion here and the consumer drains at its own pace.
pub fn emit(graph: &ModuleGraph) -> Result<(EmitSummary, BundleStream)> {
    let (tx, rx) = mpsc::unbounded_channel();
    let summary = emit_parts(graph, &mut |chunk: String| {
        // The receiver lives in this scope; a send can only fail if the
        // caller dropped the stream before we returned it, which it can't.
        tx.send(BundleChunk(chunk))
            .map_err(|_| anyhow!("bundle stream receiver dropped during emit"))?;
        Ok(())
    })?;
    Ok((summary, BundleStream { rx }))
}

/// Emit straight into a writer, module by module.
pub fn emit_to<W: Write>(graph: &ModuleGraph, writer: &mut W) -> Result<EmitSummary> {
    let summary = emit_parts(graph, &mut |chunk: String| {
        writer
            .write_all(chunk.as_bytes())
            .context("writing bundle chunk")?;
        Ok(())
    })?;
    writer.flush().context("flushing bundle output")?;
    Ok(summary)
}

/// Core renderer: pushes each part of the bundle through `sink` in order.
fn emit_parts(graph: &ModuleGraph, sink: &mut dyn FnMut(String) -> Result<()>) -> Result<EmitSummary> {
    let ids = assign_ids(graph);
    let order = emission_order(graph);
    let mut bytes = 0u64;

    let mut send = |chunk: String, bytes: &mut u64| -> Result<()> {
        *bytes += chunk.len() as u64;
        sink(chunk)
    };

    send(format!("{}({{\n", prelude::LOADER_PRELUDE), &mut bytes)?;

    for path in &order {
        let module = graph
            .module(path)
            .ok_or_else(|| anyhow!("ordered module {:?} missing from graph", path))?;
        let id = ids[path.as_path()];

        let mut dep_map = String::new();
        for (specifier, target) in &module.deps {
            let target_id = ids.get(target.as_path()).ok_or_else(|| {
                anyhow!("dependency {:?} of {:?} missing from graph", target, path)
            })?;
            if !dep_map.is_empty() {
                dep_map.push_str(", ");
            }
            dep_map.push_str(&format!("\"{}\": {}", escape_js(specifier), target_id));
        }

        send(
            format!(
                "{}: [function (require, module, exports) {{\n{}\n}}, {{{}}}],\n",
                id, module.text, dep_map
            ),
            &mut bytes,
        )?;
    }

    let entry_ids: Vec<ModuleId> = graph
        .entries()
        .iter()
        .filter_map(|e| ids.get(e.as_path()).copied())
        .collect();
    let entry_list = entry_ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    send(format!("}}, [{entry_list}]);\n"), &mut bytes)?;

    debug!(modules = order.len(), bytes, "bundle emitted");

    Ok(EmitSummary {
        modules: order.len(),
        entry_ids,
        bytes,
    })
}

/// Discovery index is the identifier: stable for a fixed graph.
fn assign_ids(graph: &ModuleGraph) -> HashMap<&Path, ModuleId> {
    graph
        .discovery_order()
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_path(), ModuleId(i)))
        .collect()
}

/// Dependency-first order over the import graph.
///
/// Tarjan's SCCs come out in reverse topological order of the condensation
/// (with edges importer -> dependency, a dependency's component precedes its
/// importers), which is exactly a valid topological order when the graph is
/// acyclic. Members of a cycle are ordered by discovery index.
fn emission_order(graph: &ModuleGraph) -> Vec<PathBuf> {
    let discovery = graph.discovery_order();
    let index: HashMap<&Path, usize> = discovery
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_path(), i))
        .collect();

    let mut import_graph: DiGraphMap<usize, ()> = DiGraphMap::new();
    for i in 0..discovery.len() {
        import_graph.add_node(i);
    }
    for path in discovery {
        let from = index[path.as_path()];
        for dep in graph.dependencies_of(path) {
            if let Some(&to) = index.get(dep.as_path()) {
                if from != to {
                    import_graph.add_edge(from, to, ());
                }
            }
        }
    }

    let mut order = Vec::with_capacity(discovery.len());
    for mut component in tarjan_scc(&import_graph) {
        component.sort_unstable();
        for i in component {
            order.push(discovery[i].clone());
        }
    }
    order
}

/// Escape a specifier for use inside a double-quoted JS string literal.
fn escape_js(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
