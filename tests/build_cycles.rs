//! Cyclic graphs must bundle: the lazy registry makes any order inside a
//! cycle safe, and the link-check model proves exports stay reachable.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use repack::bundler::Bundler;
use repack::cache::SharedCaches;
use repack::emit;
use repack::fs::MemoryFileSystem;
use repack::graph::GraphBuilder;
use repack::resolve::{Resolver, ResolverConfig};
use repack::types::FingerprintMode;
use repack_test_utils::builders::OptionsBuilder;
use repack_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn cyclic_fs() -> Arc<MemoryFileSystem> {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.write(
        "/app/a.js",
        "const b = require('./b.js');\nexports.name = 'A_MARKER';",
    );
    fs.write(
        "/app/b.js",
        "const a = require('./a.js');\nexports.name = 'B_MARKER';",
    );
    fs
}

fn memory_builder(fs: Arc<MemoryFileSystem>, caches: Arc<SharedCaches>) -> GraphBuilder {
    let config = ResolverConfig {
        fingerprint_mode: FingerprintMode::Content,
        ..ResolverConfig::default()
    };
    let resolver = Resolver::new(fs.clone(), Arc::clone(&caches), config);
    GraphBuilder::new(fs, caches, resolver, Vec::new(), FingerprintMode::Content)
        .expect("building graph builder")
}

#[test]
fn cyclic_imports_bundle_without_deadlock() -> TestResult {
    init_tracing();

    let fs = cyclic_fs();
    let caches = Arc::new(SharedCaches::new());
    let bundler = Bundler::with_fs(OptionsBuilder::new("/app").build(), caches, fs);

    let bundle = bundler.build(&[PathBuf::from("/app/a.js")])?;
    assert_eq!(bundle.summary.modules, 2);

    let out = bundle.stream.collect_blocking();
    assert!(out.contains("A_MARKER"));
    assert!(out.contains("B_MARKER"));

    Ok(())
}

#[test]
fn registry_model_marks_every_cycle_member_ready() -> TestResult {
    init_tracing();

    let fs = cyclic_fs();
    let caches = Arc::new(SharedCaches::new());
    let builder = memory_builder(fs, caches);

    let report = builder.build(&[PathBuf::from("/app/a.js")])?;
    let ready = emit::link_check(&report.graph)?;

    assert_eq!(ready.len(), 2, "both cycle members resolve");
    assert!(ready.iter().any(|p| p.ends_with("a.js")));
    assert!(ready.iter().any(|p| p.ends_with("b.js")));

    Ok(())
}

#[test]
fn cycle_members_emit_in_discovery_order() -> TestResult {
    init_tracing();

    let fs = cyclic_fs();
    let caches = Arc::new(SharedCaches::new());
    let builder = memory_builder(fs, caches);

    let report = builder.build(&[PathBuf::from("/app/a.js")])?;
    let mut buf = Vec::new();
    emit::emit_to(&report.graph, &mut buf)?;
    let out = String::from_utf8(buf)?;

    // a.js was discovered first (it is the entry), so inside the cycle it is
    // emitted first.
    let a_pos = out.find("A_MARKER").ok_or("a.js missing")?;
    let b_pos = out.find("B_MARKER").ok_or("b.js missing")?;
    assert!(a_pos < b_pos);

    Ok(())
}

#[test]
fn chain_behind_a_cycle_still_emits_dependencies_first() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/entry.js", "require('./a.js');\n// ENTRY_MARKER");
    fs.write("/app/a.js", "require('./b.js');\n// A_MARKER");
    fs.write("/app/b.js", "require('./a.js');\nrequire('./leaf.js');\n// B_MARKER");
    fs.write("/app/leaf.js", "exports.leaf = 'LEAF_MARKER';");

    let caches = Arc::new(SharedCaches::new());
    let builder = memory_builder(fs, caches);
    let report = builder.build(&[PathBuf::from("/app/entry.js")])?;

    let mut buf = Vec::new();
    emit::emit_to(&report.graph, &mut buf)?;
    let out = String::from_utf8(buf)?;

    let leaf_pos = out.find("LEAF_MARKER").ok_or("leaf missing")?;
    let a_pos = out.find("A_MARKER").ok_or("a missing")?;
    let entry_pos = out.find("ENTRY_MARKER").ok_or("entry missing")?;
    assert!(leaf_pos < a_pos, "the acyclic leaf precedes the cycle");
    assert!(a_pos < entry_pos, "the cycle precedes the entry importing it");

    Ok(())
}
