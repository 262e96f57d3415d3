// src/build/command.rs

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::errors::{BuildError, TaskmasterError};
use crate::fs::FileSystem;
use crate::node::{Executor, Node, NodeId};

/// The shell command shared by a target and its co-targets.
#[derive(Debug)]
pub struct CommandExecutor {
    leader: String,
    command: Option<String>,
    targets: Vec<NodeId>,
    /// Source files that must exist before the command runs.
    sources: Vec<PathBuf>,
    side_effects: Vec<NodeId>,
    workdir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl CommandExecutor {
    pub fn new(
        leader: impl Into<String>,
        command: Option<String>,
        targets: Vec<NodeId>,
        workdir: PathBuf,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            leader: leader.into(),
            command,
            targets,
            sources: Vec::new(),
            side_effects: Vec::new(),
            workdir,
            fs,
        }
    }

    pub fn with_sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_side_effects(mut self, side_effects: Vec<NodeId>) -> Self {
        self.side_effects = side_effects;
        self
    }

    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    /// Run the command through the platform shell in the build directory.
    fn run(&self, target: NodeId) -> Result<()> {
        let Some(command) = self.command.as_deref() else {
            return Ok(());
        };
        info!(target = %self.leader, cmd = %command, "running build command");

        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(command);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(command);
            c
        };

        let status = cmd
            .current_dir(&self.workdir)
            .status()
            .with_context(|| format!("spawning command for target '{}'", self.leader))?;

        let code = status.code().unwrap_or(-1);
        debug!(target = %self.leader, exit_code = code, "build command exited");
        if status.success() {
            Ok(())
        } else {
            Err(BuildError::new(format!("Error {code}"))
                .with_status(code)
                .for_node(target, self.leader.clone())
                .into())
        }
    }
}

impl Executor for CommandExecutor {
    fn prepare(&self) -> Result<()> {
        for source in &self.sources {
            let path = self.workdir.join(source);
            if !self.fs.exists(&path) {
                return Err(TaskmasterError::Stop(format!(
                    "Source `{}' not found, needed by target `{}'.",
                    source.display(),
                    self.leader
                ))
                .into());
            }
        }
        Ok(())
    }

    fn targets(&self) -> Vec<NodeId> {
        self.targets.clone()
    }

    fn action_side_effects(&self) -> Vec<NodeId> {
        self.side_effects.clone()
    }
}

/// A target from the build file.
///
/// A node without a command of its own and not produced by another target's
/// command is a source file: it has no builder and is always current.
#[derive(Debug)]
pub struct CommandNode {
    id: NodeId,
    name: String,
    deps: Vec<NodeId>,
    outputs: Vec<PathBuf>,
    side_effects: Vec<NodeId>,
    alternates: Vec<NodeId>,
    always_build: bool,
    executor: Option<Arc<CommandExecutor>>,
}

impl CommandNode {
    pub fn new(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            deps: Vec::new(),
            outputs: Vec::new(),
            side_effects: Vec::new(),
            alternates: Vec::new(),
            always_build: false,
            executor: None,
        }
    }

    pub fn with_deps(mut self, deps: Vec<NodeId>) -> Self {
        self.deps = deps;
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<PathBuf>) -> Self {
        self.outputs = outputs;
        self
    }

    pub fn with_side_effects(mut self, side_effects: Vec<NodeId>) -> Self {
        self.side_effects = side_effects;
        self
    }

    pub fn with_alternates(mut self, alternates: Vec<NodeId>) -> Self {
        self.alternates = alternates;
        self
    }

    pub fn with_always_build(mut self, always_build: bool) -> Self {
        self.always_build = always_build;
        self
    }

    pub fn with_executor(mut self, executor: Arc<CommandExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    fn output_path(&self, executor: &CommandExecutor, output: &Path) -> PathBuf {
        executor.workdir.join(output)
    }
}

impl Node for CommandNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn children(&self) -> Result<Vec<NodeId>> {
        Ok(self.deps.clone())
    }

    fn executor(&self, this: NodeId) -> Arc<dyn Executor> {
        match &self.executor {
            Some(executor) => Arc::clone(executor) as Arc<dyn Executor>,
            None => Arc::new(crate::node::TargetGroup::single(this)),
        }
    }

    fn side_effects(&self) -> Vec<NodeId> {
        self.side_effects.clone()
    }

    fn alter_targets(&self) -> (Vec<NodeId>, Option<String>) {
        if self.alternates.is_empty() {
            return (Vec::new(), None);
        }
        let message = format!("building alternates for `{}'", self.name);
        (self.alternates.clone(), Some(message))
    }

    fn has_builder(&self) -> bool {
        self.executor
            .as_ref()
            .is_some_and(|e| e.command().is_some())
    }

    fn always_build(&self) -> bool {
        self.always_build
    }

    /// Current when every declared output exists. A target without outputs
    /// is never current.
    fn is_up_to_date(&self) -> Result<bool> {
        let Some(executor) = &self.executor else {
            return Ok(true);
        };
        if self.outputs.is_empty() {
            return Ok(false);
        }
        Ok(self
            .outputs
            .iter()
            .all(|o| executor.fs.is_file(&self.output_path(executor, o))))
    }

    fn build(&self) -> Result<()> {
        match &self.executor {
            Some(executor) => executor.run(self.id),
            None => Ok(()),
        }
    }
}
