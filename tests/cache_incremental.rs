//! Incremental behaviour of the shared cache layer: warm builds parse
//! nothing, a single change re-parses a single module, and invalidation
//! cascades into the resolution store.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use repack::bundler::Bundler;
use repack::cache::SharedCaches;
use repack::fs::MemoryFileSystem;
use repack_test_utils::builders::OptionsBuilder;
use repack_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn three_module_fs() -> Arc<MemoryFileSystem> {
    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/index.js", "require('./util.js');\nrequire('./other.js');");
    fs.write("/app/util.js", "exports.v = 'v1';");
    fs.write("/app/other.js", "exports.o = 1;");
    fs
}

fn bundler_over(fs: Arc<MemoryFileSystem>, caches: Arc<SharedCaches>) -> Bundler {
    Bundler::with_fs(OptionsBuilder::new("/app").build(), caches, fs)
}

#[test]
fn warm_build_is_served_entirely_from_cache() -> TestResult {
    init_tracing();

    let fs = three_module_fs();
    let caches = Arc::new(SharedCaches::new());
    let bundler = bundler_over(fs, Arc::clone(&caches));
    let entries = [PathBuf::from("/app/index.js")];

    let cold = bundler.build(&entries)?;
    assert_eq!(cold.stats.reparsed, 3);
    assert_eq!(cold.stats.from_cache, 0);

    caches.reset_stats();
    let warm = bundler.build(&entries)?;
    assert_eq!(warm.stats.reparsed, 0);
    assert_eq!(warm.stats.from_cache, 3);
    assert!(warm.changed.is_empty());

    let stats = caches.stats();
    assert_eq!(stats.file_hits, 3);
    assert_eq!(stats.file_misses, 0);

    Ok(())
}

#[test]
fn single_change_reparses_only_that_module() -> TestResult {
    init_tracing();

    let fs = three_module_fs();
    let caches = Arc::new(SharedCaches::new());
    let bundler = bundler_over(Arc::clone(&fs), Arc::clone(&caches));
    let entries = [PathBuf::from("/app/index.js")];

    bundler.build(&entries)?;

    // Change one file; the stale fingerprint forces exactly one re-parse.
    fs.write("/app/util.js", "exports.v = 'v2';");
    caches.reset_stats();

    let rebuilt = bundler.build(&entries)?;
    assert_eq!(rebuilt.stats.reparsed, 1);
    assert_eq!(rebuilt.stats.from_cache, 2);
    assert_eq!(rebuilt.changed, vec![PathBuf::from("/app/util.js")]);

    let stats = caches.stats();
    assert_eq!(stats.file_hits, 2);
    assert_eq!(stats.file_misses, 1);

    let out = rebuilt.stream.collect_blocking();
    assert!(out.contains("'v2'"), "rebuilt bundle reflects the new content");

    Ok(())
}

#[test]
fn explicit_invalidation_forces_a_reparse_of_unchanged_content() -> TestResult {
    init_tracing();

    let fs = three_module_fs();
    let caches = Arc::new(SharedCaches::new());
    let bundler = bundler_over(fs, Arc::clone(&caches));
    let entries = [PathBuf::from("/app/index.js")];

    bundler.build(&entries)?;

    // Nothing on disk changed, but the watch pipeline invalidates changed
    // paths explicitly; the next build must not trust the dropped entry.
    caches.invalidate(&PathBuf::from("/app/util.js"));

    let rebuilt = bundler.build(&entries)?;
    assert_eq!(rebuilt.stats.reparsed, 1);
    assert_eq!(rebuilt.changed, vec![PathBuf::from("/app/util.js")]);

    Ok(())
}

#[test]
fn invalidation_cascades_into_the_resolution_store() -> TestResult {
    init_tracing();

    let fs = three_module_fs();
    let caches = Arc::new(SharedCaches::new());
    let bundler = bundler_over(fs, Arc::clone(&caches));
    let entries = [PathBuf::from("/app/index.js")];

    bundler.build(&entries)?;

    // util.js is the target of the ('./util.js', /app) resolution; dropping
    // the file must drop that resolution too.
    caches.invalidate(&PathBuf::from("/app/util.js"));
    caches.reset_stats();

    bundler.build(&entries)?;
    let stats = caches.stats();
    assert!(
        stats.resolution_misses >= 1,
        "cascade must have dropped the resolution for './util.js' (stats: {stats:?})"
    );

    Ok(())
}

#[test]
fn caches_shared_across_bundler_instances() -> TestResult {
    init_tracing();

    let fs = three_module_fs();
    let caches = Arc::new(SharedCaches::new());
    let entries = [PathBuf::from("/app/index.js")];

    let first = bundler_over(Arc::clone(&fs), Arc::clone(&caches));
    first.build(&entries)?;

    // A second instance handed the same caches starts warm.
    let second = bundler_over(fs, Arc::clone(&caches));
    let report = second.build(&entries)?;
    assert_eq!(report.stats.reparsed, 0);
    assert_eq!(report.stats.from_cache, 3);

    Ok(())
}
