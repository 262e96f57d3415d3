// src/lib.rs

pub mod build;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod node;
pub mod task;
pub mod taskmaster;
pub mod trace;
pub mod types;
pub mod warnings;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::build::BuildGraph;
use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::config::planned_order;
use crate::exec::{BuildReport, JobOptions, run_parallel, run_serial};
use crate::fs::RealFileSystem;
use crate::taskmaster::Taskmaster;
use crate::trace::Trace;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - build file loading
/// - the command-backed node graph
/// - the taskmaster (with optional decision trace)
/// - the serial or parallel job runner
pub async fn run(args: CliArgs) -> Result<BuildReport> {
    let config_path = PathBuf::from(&args.file);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(BuildReport::default());
    }

    let root_dir = config_root_dir(&config_path);
    let build = BuildGraph::from_config(&cfg, &root_dir, Arc::new(RealFileSystem))?;

    let requested = if args.targets.is_empty() {
        cfg.default_targets()
    } else {
        args.targets.clone()
    };
    let targets = build.resolve(&requested)?;
    info!(?requested, "building targets");

    let order = args.order.unwrap_or(cfg.config.order);
    let mut tm = Taskmaster::new(build.into_graph(), targets)
        .with_order(move |nodes| order.apply(nodes));
    if let Some(trace) = open_trace(args.trace.as_deref())? {
        tm = tm.with_trace(trace);
    }

    let options = JobOptions {
        jobs: args.jobs.unwrap_or(cfg.config.jobs).max(1),
        keep_going: args.keep_going || cfg.config.keep_going,
    };
    debug!(?options, "job options");

    let report = if options.jobs > 1 {
        run_parallel(&mut tm, &options).await?
    } else {
        run_serial(&mut tm, &options)?
    };

    summarize(&report);
    Ok(report)
}

/// Directory that relative paths in the build file are resolved against.
///
/// - If the build file path has a non-empty parent (e.g. "sub/Build.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Build.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// `--trace -` writes to stdout, anything else is a file path.
fn open_trace(target: Option<&str>) -> Result<Option<Trace>> {
    match target {
        None => Ok(None),
        Some("-") => Ok(Some(Trace::new(std::io::stdout()))),
        Some(path) => {
            let file =
                File::create(path).with_context(|| format!("creating trace file {path:?}"))?;
            Ok(Some(Trace::new(file)))
        }
    }
}

fn summarize(report: &BuildReport) {
    for failure in &report.failed {
        eprintln!("taskmaster: *** {}", failure.message);
    }
    if report.is_success() {
        info!(
            executed = report.executed.len(),
            up_to_date = report.up_to_date.len(),
            "build finished"
        );
    } else {
        warn!(failed = report.failed.len(), "build finished with errors");
    }
}

/// Simple dry-run output: print targets, deps and the planned order.
fn print_dry_run(cfg: &ConfigFile) {
    println!("taskmaster dry-run");
    println!("  config.jobs = {}", cfg.config.jobs);
    println!("  config.keep_going = {}", cfg.config.keep_going);
    println!("  config.order = {:?}", cfg.config.order);
    println!("  default targets = {:?}", cfg.default_targets());
    println!();

    println!("targets ({}):", cfg.target.len());
    for (name, target) in cfg.target.iter() {
        println!("  - {name}");
        match &target.cmd {
            Some(cmd) => println!("      cmd: {cmd}"),
            None => println!("      (source)"),
        }
        if !target.deps.is_empty() {
            println!("      deps: {:?}", target.deps);
        }
        if !target.outputs.is_empty() {
            println!("      outputs: {:?}", target.outputs);
        }
        if !target.side_effects.is_empty() {
            println!("      side_effects: {:?}", target.side_effects);
        }
        if !target.co_targets.is_empty() {
            println!("      co_targets: {:?}", target.co_targets);
        }
        if !target.alternates.is_empty() {
            println!("      alternates: {:?}", target.alternates);
        }
        if target.always_build {
            println!("      always_build: true");
        }
    }
    println!();

    match planned_order(cfg) {
        Ok(order) => println!("planned order: {}", order.join(", ")),
        Err(node) => println!("planned order: unavailable, dependency cycle through '{node}'"),
    }

    debug!("dry-run complete (no execution)");
}
