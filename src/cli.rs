// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::types::OrderPolicy;

/// Command-line arguments for `taskmaster`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskmaster",
    version,
    about = "Build targets from a TOML build file in dependency order.",
    long_about = None
)]
pub struct CliArgs {
    /// Targets to build. Defaults to `[config].default_targets`, or every
    /// target nothing depends on.
    #[arg(value_name = "TARGET")]
    pub targets: Vec<String>,

    /// Path to the build file (TOML).
    #[arg(short = 'f', long, value_name = "PATH", default_value = "Build.toml")]
    pub file: String,

    /// Number of commands to run concurrently. Overrides `[config].jobs`.
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// Keep building unrelated targets after a failure.
    #[arg(short = 'k', long)]
    pub keep_going: bool,

    /// Order in which dependencies are explored.
    #[arg(long, value_enum, value_name = "ORDER")]
    pub order: Option<OrderPolicy>,

    /// Write the scheduler's decision trace to this file (`-` for stdout).
    #[arg(long, value_name = "PATH")]
    pub trace: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKMASTER_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the planned order, but don't build anything.
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
