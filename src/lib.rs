// src/lib.rs

pub mod bundler;
pub mod cache;
pub mod cli;
pub mod config;
pub mod emit;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod graph;
pub mod logging;
pub mod resolve;
pub mod scan;
pub mod types;
pub mod watch;

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info};

use crate::bundler::Bundler;
use crate::cache::SharedCaches;
use crate::cli::CliArgs;
use crate::config::model::ConfigFile;
use crate::config::{collect_entry_files, load_and_validate};
use crate::emit::{BundleChunk, BundleStream};
use crate::engine::BundleEvent;
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - entry-glob expansion
/// - the bundler (with caller-owned shared caches)
/// - one-shot build or the watch pipeline
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let config_root = config_root_dir(&config_path);

    let options = cfg.bundler_options(&config_root);
    let out_path = args
        .out
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| cfg.out_path(&config_root));

    let fs = RealFileSystem;
    let entries = collect_entry_files(&fs, &options.base_dir, &cfg.bundle.entries)?;

    if args.dry_run {
        print_dry_run(&cfg, &entries, &out_path);
        return Ok(());
    }

    let caches = Arc::new(SharedCaches::new());
    let bundler = Bundler::new(options, caches);

    if args.once {
        let bundle = bundler.build(&entries)?;
        let bytes = write_bundle(bundle.stream, &out_path).await?;
        info!(
            modules = bundle.summary.modules,
            bytes,
            out = ?out_path,
            "bundle written"
        );
        return Ok(());
    }

    let mut session = bundler.watch(entries)?;
    info!("watching; Ctrl-C to stop");

    loop {
        tokio::select! {
            ctrl_c = tokio::signal::ctrl_c() => {
                if let Err(e) = ctrl_c {
                    eprintln!("failed to listen for Ctrl+C: {e}");
                }
                info!("shutdown requested");
                break;
            }
            event = session.next_event() => match event {
                Some(BundleEvent::BuildSummary { entries }) => {
                    let names: Vec<String> = entries
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect();
                    info!("bundling: [ {} ]", names.join(", "));
                }
                Some(BundleEvent::BundleReady { stream, summary, changed }) => {
                    debug!(changed = changed.len(), "bundle ready");
                    let bytes = write_bundle(stream, &out_path).await?;
                    info!(
                        modules = summary.modules,
                        bytes,
                        out = ?out_path,
                        "bundle written"
                    );
                }
                Some(BundleEvent::Error(err)) => {
                    error!(%err, "build failed; still watching");
                }
                None => {
                    info!("watch pipeline ended");
                    return Ok(());
                }
            }
        }
    }

    session.shutdown().await?;
    Ok(())
}

/// Drain a bundle stream into `out_path`, chunk by chunk.
async fn write_bundle(mut stream: BundleStream, out_path: &Path) -> Result<u64> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {:?}", parent))?;
    }
    let file = std::fs::File::create(out_path)
        .with_context(|| format!("creating bundle file {:?}", out_path))?;
    let mut writer = std::io::BufWriter::new(file);

    let mut bytes = 0u64;
    while let Some(BundleChunk(chunk)) = stream.next_chunk().await {
        writer
            .write_all(chunk.as_bytes())
            .with_context(|| format!("writing bundle to {:?}", out_path))?;
        bytes += chunk.len() as u64;
    }
    writer.flush()?;
    Ok(bytes)
}

/// Figure out a sensible project root for relative config paths.
///
/// - If the config path has a non-empty parent (e.g. "configs/Repack.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Repack.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Simple dry-run output: print the resolved configuration and entry set.
fn print_dry_run(cfg: &ConfigFile, entries: &[PathBuf], out_path: &Path) {
    println!("repack dry-run");
    println!("  bundle.base_dir = {}", cfg.bundle.base_dir);
    println!("  bundle.out_file = {}", out_path.display());
    println!("  bundle.extensions = {:?}", cfg.bundle.extensions);
    println!("  bundle.modules_dir = {}", cfg.bundle.modules_dir);
    if !cfg.bundle.search_paths.is_empty() {
        println!("  bundle.search_paths = {:?}", cfg.bundle.search_paths);
    }
    println!("  watch.debounce_ms = {}", cfg.watch.debounce_ms);
    println!("  watch.fingerprint = {:?}", cfg.watch.fingerprint);
    println!();

    println!("entries ({}):", entries.len());
    for entry in entries {
        println!("  - {}", entry.display());
    }

    debug!("dry-run complete (no build)");
}
