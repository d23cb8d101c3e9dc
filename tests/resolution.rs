//! Resolver behaviour over the in-memory filesystem: extension and index
//! candidates, modules-root walk-up, package manifests, search-path
//! fallback, and the diagnostics carried by failures.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use repack::bundler::Bundler;
use repack::cache::SharedCaches;
use repack::errors::RepackError;
use repack::fs::MemoryFileSystem;
use repack::resolve::{Resolver, ResolverConfig};
use repack_test_utils::builders::OptionsBuilder;
use repack_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn resolver_over(fs: Arc<MemoryFileSystem>) -> Resolver {
    resolver_with_config(fs, ResolverConfig::default())
}

fn resolver_with_config(fs: Arc<MemoryFileSystem>, config: ResolverConfig) -> Resolver {
    Resolver::new(fs, Arc::new(SharedCaches::new()), config)
}

#[test]
fn relative_specifier_tries_extension_variants() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/src/util.js", "exports.ok = true;");

    let resolver = resolver_over(fs);
    let target = resolver.resolve("./util", &PathBuf::from("/app/src"))?;
    assert_eq!(target, PathBuf::from("/app/src/util.js"));

    Ok(())
}

#[test]
fn directory_import_falls_back_to_index() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/src/lib/index.js", "exports.ok = true;");

    let resolver = resolver_over(fs);
    let target = resolver.resolve("./lib", &PathBuf::from("/app/src"))?;
    assert_eq!(target, PathBuf::from("/app/src/lib/index.js"));

    Ok(())
}

#[test]
fn bare_specifier_walks_up_to_a_modules_root() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write(
        "/app/node_modules/leftpad/package.json",
        r#"{ "name": "leftpad", "main": "lib/main.js" }"#,
    );
    fs.write("/app/node_modules/leftpad/lib/main.js", "exports.pad = 1;");

    let resolver = resolver_over(fs);
    // Importing module lives two levels below the modules root.
    let target = resolver.resolve("leftpad", &PathBuf::from("/app/src/deep"))?;
    assert_eq!(target, PathBuf::from("/app/node_modules/leftpad/lib/main.js"));

    Ok(())
}

#[test]
fn package_without_manifest_uses_index() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/node_modules/tiny/index.js", "exports.tiny = true;");

    let resolver = resolver_over(fs);
    let target = resolver.resolve("tiny", &PathBuf::from("/app/src"))?;
    assert_eq!(target, PathBuf::from("/app/node_modules/tiny/index.js"));

    Ok(())
}

#[test]
fn package_subpath_resolves_inside_the_package() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/node_modules/pkg/helper.js", "exports.h = 1;");

    let resolver = resolver_over(fs);
    let target = resolver.resolve("pkg/helper.js", &PathBuf::from("/app/src"))?;
    assert_eq!(target, PathBuf::from("/app/node_modules/pkg/helper.js"));

    Ok(())
}

#[test]
fn search_paths_are_consulted_when_the_walk_fails() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/src/web_modules/widget/index.js", "exports.w = 1;");

    let config = ResolverConfig {
        search_paths: vec![PathBuf::from("/app/src/web_modules")],
        ..ResolverConfig::default()
    };
    let resolver = resolver_with_config(fs, config);
    let target = resolver.resolve("widget", &PathBuf::from("/app/src/page"))?;
    assert_eq!(target, PathBuf::from("/app/src/web_modules/widget/index.js"));

    Ok(())
}

#[test]
fn missing_import_lists_every_candidate_tried() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/src/index.js", "require('./missing.js');");

    let bundler = Bundler::with_fs(
        OptionsBuilder::new("/app/src").build(),
        Arc::new(SharedCaches::new()),
        fs,
    );
    let err = bundler
        .build(&[PathBuf::from("/app/src/index.js")])
        .expect_err("build must fail on an unresolvable import");

    match err {
        RepackError::Resolution {
            specifier,
            from_dir,
            candidates,
        } => {
            assert_eq!(specifier, "./missing.js");
            assert_eq!(from_dir, PathBuf::from("/app/src"));
            assert!(!candidates.is_empty());
            assert!(
                candidates
                    .iter()
                    .any(|c| c.ends_with("missing.js")),
                "candidates: {candidates:?}"
            );
        }
        other => panic!("expected Resolution error, got {other:?}"),
    }

    Ok(())
}

#[test]
fn parse_error_aborts_the_build_with_a_position() -> TestResult {
    init_tracing();

    let fs = Arc::new(MemoryFileSystem::new());
    fs.write("/app/src/index.js", "require('./ok.js');\nconst s = 'unterminated;\n");
    fs.write("/app/src/ok.js", "exports.ok = true;");

    let bundler = Bundler::with_fs(
        OptionsBuilder::new("/app/src").build(),
        Arc::new(SharedCaches::new()),
        fs,
    );
    let err = bundler
        .build(&[PathBuf::from("/app/src/index.js")])
        .expect_err("build must fail on malformed source");

    match err {
        RepackError::Parse { path, line, .. } => {
            assert!(path.ends_with("index.js"));
            assert_eq!(line, 2);
        }
        other => panic!("expected Parse error, got {other:?}"),
    }

    Ok(())
}
