// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `repack`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "repack",
    version,
    about = "Bundle JavaScript modules, incrementally rebuilding on file changes.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Repack.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Repack.toml")]
    pub config: String,

    /// Build once and exit, no watching.
    #[arg(long)]
    pub once: bool,

    /// Override the output file from the config.
    #[arg(long, value_name = "PATH")]
    pub out: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `REPACK_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate the config, print the resolved entry set, but do not
    /// build anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
