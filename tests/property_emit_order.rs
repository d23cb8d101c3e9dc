//! Property: for any acyclic module graph, emission is a valid topological
//! order (every module appears after the modules it depends on), and
//! emitting the same graph twice yields identical bytes.

use std::path::PathBuf;
use std::sync::Arc;

use proptest::prelude::*;

use repack::cache::SharedCaches;
use repack::emit;
use repack::fs::MemoryFileSystem;
use repack::graph::GraphBuilder;
use repack::resolve::{Resolver, ResolverConfig};
use repack::types::FingerprintMode;

/// A random DAG over `n` modules, encoded as one dependency bitmask per
/// module. Acyclicity is ensured by only allowing module `i` to depend on
/// modules `j > i`; module `i` always depends on `i + 1`, so the whole set
/// is reachable from module 0.
fn dag_strategy() -> impl Strategy<Value = Vec<u64>> {
    (3..9usize).prop_flat_map(|n| proptest::collection::vec(any::<u64>(), n))
}

fn deps_of(masks: &[u64], i: usize) -> Vec<usize> {
    let n = masks.len();
    let mut deps = Vec::new();
    if i + 1 < n {
        deps.push(i + 1);
    }
    for j in (i + 2)..n {
        if masks[i] & (1u64 << (j % 64)) != 0 {
            deps.push(j);
        }
    }
    deps
}

fn module_source(masks: &[u64], i: usize) -> String {
    let mut src = String::new();
    for j in deps_of(masks, i) {
        src.push_str(&format!("require('./m{j}.js');\n"));
    }
    src.push_str(&format!("exports.id = 'MODULE_{i}_MARKER';\n"));
    src
}

fn emit_bundle(masks: &[u64]) -> (String, usize) {
    let fs = Arc::new(MemoryFileSystem::new());
    for i in 0..masks.len() {
        fs.write(format!("/app/m{i}.js"), module_source(masks, i));
    }

    let caches = Arc::new(SharedCaches::new());
    let resolver = Resolver::new(
        fs.clone(),
        Arc::clone(&caches),
        ResolverConfig {
            fingerprint_mode: FingerprintMode::Content,
            ..ResolverConfig::default()
        },
    );
    let builder = GraphBuilder::new(fs, caches, resolver, Vec::new(), FingerprintMode::Content)
        .expect("graph builder");
    let report = builder
        .build(&[PathBuf::from("/app/m0.js")])
        .expect("building DAG fixture");

    let mut buf = Vec::new();
    emit::emit_to(&report.graph, &mut buf).expect("emitting");
    (String::from_utf8(buf).expect("utf8 bundle"), report.graph.len())
}

proptest! {
    #[test]
    fn emitted_order_is_topological(masks in dag_strategy()) {
        let (out, modules) = emit_bundle(&masks);
        prop_assert_eq!(modules, masks.len());

        let position = |i: usize| {
            out.find(&format!("MODULE_{i}_MARKER"))
                .unwrap_or_else(|| panic!("module {i} missing from bundle"))
        };

        for i in 0..masks.len() {
            for j in deps_of(&masks, i) {
                prop_assert!(
                    position(j) < position(i),
                    "module {} depends on {} but is emitted first", i, j
                );
            }
        }
    }

    #[test]
    fn emission_is_deterministic(masks in dag_strategy()) {
        let (first, _) = emit_bundle(&masks);
        let (second, _) = emit_bundle(&masks);
        prop_assert_eq!(first, second);
    }
}
