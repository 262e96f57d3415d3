// tests/build_files.rs

mod common;
use crate::common::{BuildFileBuilder, TargetConfigBuilder, init_tracing};

use std::path::Path;
use std::sync::Arc;

use taskmaster::build::BuildGraph;
use taskmaster::config::ConfigFile;
use taskmaster::errors::TaskmasterError;
use taskmaster::exec::{JobOptions, run_serial};
use taskmaster::fs::MockFileSystem;
use taskmaster::node::{Executor, Node, NodeState};
use taskmaster::taskmaster::Taskmaster;

const ROOT: &str = "/proj";

fn app_config() -> ConfigFile {
    BuildFileBuilder::new()
        .with_source("main.c")
        .with_target(
            "main.o",
            TargetConfigBuilder::new("cc -c main.c")
                .dep("main.c")
                .output("main.o")
                .build(),
        )
        .with_target(
            "app",
            TargetConfigBuilder::new("cc -o app main.o")
                .dep("main.o")
                .output("app")
                .build(),
        )
        .build()
}

fn graph_for(cfg: &ConfigFile, fs: &MockFileSystem) -> BuildGraph {
    BuildGraph::from_config(cfg, Path::new(ROOT), Arc::new(fs.clone())).unwrap()
}

#[test]
fn graph_mirrors_the_build_file() {
    let cfg = app_config();
    let fs = MockFileSystem::new();
    let build = graph_for(&cfg, &fs);

    let app = build.lookup("app").unwrap();
    let main_o = build.lookup("main.o").unwrap();
    let main_c = build.lookup("main.c").unwrap();
    assert_eq!(build.graph().len(), 3);
    assert_eq!(build.graph().name(app), "app");
    assert_eq!(build.graph().node(app).children().unwrap(), vec![main_o]);
    assert!(build.graph().node(app).has_builder());
    assert!(!build.graph().node(main_c).has_builder());

    let err = build.resolve(&["app".into(), "nope".into()]).unwrap_err();
    assert!(matches!(err, TaskmasterError::ConfigError(ref m) if m == "unknown target 'nope'"));
}

#[test]
fn existing_outputs_make_targets_current() {
    init_tracing();
    let cfg = app_config();
    let fs = MockFileSystem::new();
    fs.add_file("/proj/main.c");
    fs.add_file("/proj/main.o");
    fs.add_file("/proj/app");
    let build = graph_for(&cfg, &fs);
    let targets = build.resolve(&["app".into()]).unwrap();

    let mut tm = Taskmaster::new(build.into_graph(), targets);
    let report = run_serial(&mut tm, &JobOptions::default()).unwrap();

    assert!(report.executed.is_empty());
    assert_eq!(report.up_to_date, vec!["main.c", "main.o", "app"]);
    assert!(report.is_success());
}

#[test]
fn missing_source_stops_the_build() {
    let cfg = app_config();
    let fs = MockFileSystem::new();
    let build = graph_for(&cfg, &fs);
    let app = build.lookup("app").unwrap();
    let main_o = build.lookup("main.o").unwrap();

    let mut tm = Taskmaster::new(build.into_graph(), vec![app]);
    let report = run_serial(&mut tm, &JobOptions { jobs: 1, keep_going: true }).unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].target, "main.o");
    assert_eq!(
        report.failed[0].message,
        "Source `main.c' not found, needed by target `main.o'."
    );
    assert!(tm.is_stopped());
    assert_eq!(tm.graph().state(main_o), NodeState::Failed);
    assert_eq!(tm.graph().state(app), NodeState::Failed);
}

#[test]
fn a_directory_is_not_an_output_file() {
    let cfg = BuildFileBuilder::new()
        .with_target("out", TargetConfigBuilder::new("mkdir out").output("out").build())
        .build();
    let fs = MockFileSystem::new();
    fs.add_dir("/proj/out");
    let build = graph_for(&cfg, &fs);
    let out = build.lookup("out").unwrap();

    assert!(!build.graph().node(out).is_up_to_date().unwrap());
}

#[test]
fn always_build_ignores_existing_outputs() {
    let cfg = BuildFileBuilder::new()
        .with_target(
            "stamp",
            TargetConfigBuilder::new("touch stamp")
                .output("stamp")
                .always_build(true)
                .build(),
        )
        .build();
    let fs = MockFileSystem::new();
    fs.add_file("/proj/stamp");
    let build = graph_for(&cfg, &fs);
    let stamp = build.lookup("stamp").unwrap();

    let node = build.graph().node(stamp);
    assert!(node.is_up_to_date().unwrap());
    assert!(node.always_build());
}

#[test]
fn alternates_come_with_a_message() {
    let cfg = BuildFileBuilder::new()
        .with_target("release", TargetConfigBuilder::new("true").build())
        .with_target("all", TargetConfigBuilder::new("true").alternate("release").build())
        .build();
    let fs = MockFileSystem::new();
    let build = graph_for(&cfg, &fs);
    let all = build.lookup("all").unwrap();
    let release = build.lookup("release").unwrap();

    let (alternates, message) = build.graph().node(all).alter_targets();
    assert_eq!(alternates, vec![release]);
    assert_eq!(message.as_deref(), Some("building alternates for `all'"));
}

#[test]
fn co_targets_share_one_executor() {
    let cfg = BuildFileBuilder::new()
        .with_target(
            "parser.c",
            TargetConfigBuilder::new("bison parser.y")
                .co_target("parser.h")
                .output("parser.c")
                .build(),
        )
        .with_source("parser.h")
        .build();
    let fs = MockFileSystem::new();
    let build = graph_for(&cfg, &fs);
    let c = build.lookup("parser.c").unwrap();
    let h = build.lookup("parser.h").unwrap();

    let via_c = build.graph().node(c).executor(c).targets();
    let via_h = build.graph().node(h).executor(h).targets();
    assert_eq!(via_c, vec![c, h]);
    assert_eq!(via_h, vec![c, h]);
    assert!(build.graph().node(h).has_builder());
}

#[cfg(unix)]
mod shell {
    use super::*;

    use std::fs;

    use tempfile::tempdir;

    use taskmaster::cli::CliArgs;

    fn args(file: &Path, jobs: usize) -> CliArgs {
        CliArgs {
            targets: Vec::new(),
            file: file.display().to_string(),
            jobs: Some(jobs),
            keep_going: false,
            order: None,
            trace: None,
            log_level: None,
            dry_run: false,
        }
    }

    const CHAIN: &str = r#"
[target.gen]
cmd = "echo hello > gen.txt"
outputs = ["gen.txt"]

[target.copy]
cmd = "cp gen.txt copy.txt && echo ran >> runs.log"
deps = ["gen"]
outputs = ["copy.txt"]
"#;

    #[tokio::test]
    async fn commands_run_once_and_then_are_current() {
        init_tracing();
        let dir = tempdir().unwrap();
        let file = dir.path().join("Build.toml");
        fs::write(&file, CHAIN).unwrap();

        let report = taskmaster::run(args(&file, 1)).await.unwrap();
        assert_eq!(report.executed, vec!["gen", "copy"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("copy.txt")).unwrap(),
            "hello\n"
        );

        let report = taskmaster::run(args(&file, 1)).await.unwrap();
        assert!(report.executed.is_empty());
        assert_eq!(report.up_to_date, vec!["gen", "copy"]);
        assert_eq!(
            fs::read_to_string(dir.path().join("runs.log")).unwrap(),
            "ran\n"
        );
    }

    #[tokio::test]
    async fn parallel_run_builds_the_same_targets() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Build.toml");
        fs::write(&file, CHAIN).unwrap();

        let report = taskmaster::run(args(&file, 4)).await.unwrap();
        assert_eq!(report.executed, vec!["gen", "copy"]);
        assert!(dir.path().join("copy.txt").is_file());
    }

    #[tokio::test]
    async fn failing_command_reports_its_exit_code() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Build.toml");
        fs::write(
            &file,
            r#"
[target.bad]
cmd = "exit 3"
"#,
        )
        .unwrap();

        let report = taskmaster::run(args(&file, 1)).await.unwrap();
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].message, "[bad] Error 3");
        assert_eq!(report.exit_code(), 2);
    }

    #[tokio::test]
    async fn trace_file_is_written() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Build.toml");
        let trace = dir.path().join("trace.txt");
        fs::write(&file, CHAIN).unwrap();

        let mut args = args(&file, 1);
        args.trace = Some(trace.display().to_string());
        args.targets = vec!["gen".into()];
        taskmaster::run(args).await.unwrap();

        let contents = fs::read_to_string(&trace).unwrap();
        assert!(contents.contains("Taskmaster: Evaluating <pending    0   'gen'>\n"));
        assert!(!contents.contains("'copy'"));
    }

    #[tokio::test]
    async fn dry_run_builds_nothing() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("Build.toml");
        fs::write(&file, CHAIN).unwrap();

        let mut args = args(&file, 1);
        args.dry_run = true;
        let report = taskmaster::run(args).await.unwrap();
        assert!(report.executed.is_empty());
        assert!(!dir.path().join("gen.txt").exists());
    }
}
