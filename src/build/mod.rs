// src/build/mod.rs

//! Build graphs backed by shell commands, assembled from a build file.
//!
//! - [`command`] holds [`CommandNode`] and the shared [`CommandExecutor`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::config::{ConfigFile, TargetConfig};
use crate::dag::Graph;
use crate::errors::{Result, TaskmasterError};
use crate::fs::FileSystem;
use crate::node::NodeId;

pub mod command;

pub use command::{CommandExecutor, CommandNode};

/// A [`Graph`] of [`CommandNode`]s plus a name index.
#[derive(Debug)]
pub struct BuildGraph {
    graph: Graph<CommandNode>,
    index: BTreeMap<String, NodeId>,
}

impl BuildGraph {
    /// Build the node graph for a validated build file. Relative paths in
    /// the file are resolved against `root`.
    pub fn from_config(cfg: &ConfigFile, root: &Path, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let mut graph = Graph::new();
        let base = graph.next_id().index();

        // Ids are assigned in name order, so every reference can be
        // resolved before any node exists.
        let index: BTreeMap<String, NodeId> = cfg
            .target
            .keys()
            .enumerate()
            .map(|(i, name)| (name.clone(), NodeId::new(base + i)))
            .collect();
        let resolve = |names: &[String]| -> Result<Vec<NodeId>> {
            names
                .iter()
                .map(|n| {
                    index.get(n).copied().ok_or_else(|| {
                        TaskmasterError::ConfigError(format!("unknown target '{n}'"))
                    })
                })
                .collect()
        };

        let executors = build_executors(cfg, &index, root, &fs, &resolve)?;

        for (name, target) in cfg.target.iter() {
            let id = index[name];
            let mut node = CommandNode::new(id, name.clone())
                .with_deps(resolve(&target.deps)?)
                .with_outputs(target.outputs.iter().map(PathBuf::from).collect())
                .with_side_effects(resolve(&target.side_effects)?)
                .with_alternates(resolve(&target.alternates)?)
                .with_always_build(target.always_build);
            if let Some(executor) = executors.get(name) {
                node = node.with_executor(Arc::clone(executor));
            }
            let added = graph.add(node);
            debug_assert_eq!(added, id);
        }

        debug!(nodes = graph.len(), "build graph assembled");
        Ok(Self { graph, index })
    }

    pub fn lookup(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    /// Resolve target names, failing on the first unknown one.
    pub fn resolve(&self, names: &[String]) -> Result<Vec<NodeId>> {
        names
            .iter()
            .map(|name| {
                self.lookup(name).ok_or_else(|| {
                    TaskmasterError::ConfigError(format!("unknown target '{name}'"))
                })
            })
            .collect()
    }

    pub fn graph(&self) -> &Graph<CommandNode> {
        &self.graph
    }

    pub fn into_graph(self) -> Graph<CommandNode> {
        self.graph
    }
}

/// One executor per command, shared by the command's target and its
/// co-targets. Sources get none.
fn build_executors(
    cfg: &ConfigFile,
    index: &BTreeMap<String, NodeId>,
    root: &Path,
    fs: &Arc<dyn FileSystem>,
    resolve: &dyn Fn(&[String]) -> Result<Vec<NodeId>>,
) -> Result<BTreeMap<String, Arc<CommandExecutor>>> {
    let mut executors = BTreeMap::new();

    for (name, target) in cfg.target.iter() {
        let Some(cmd) = &target.cmd else {
            continue;
        };

        let mut members = vec![name.clone()];
        members.extend(target.co_targets.iter().cloned());

        let mut targets = vec![index[name]];
        targets.extend(resolve(&target.co_targets)?);

        let mut sources = Vec::new();
        let mut side_effects = Vec::new();
        for member in &members {
            let member_cfg = &cfg.target[member];
            for dep in &member_cfg.deps {
                if is_source(cfg, dep) {
                    sources.extend(source_paths(dep, &cfg.target[dep]));
                }
            }
            side_effects.extend(resolve(&member_cfg.side_effects)?);
        }

        let executor = Arc::new(
            CommandExecutor::new(name.clone(), Some(cmd.clone()), targets, root.to_path_buf(), Arc::clone(fs))
                .with_sources(sources)
                .with_side_effects(side_effects),
        );
        for member in members {
            executors.insert(member, Arc::clone(&executor));
        }
    }

    Ok(executors)
}

fn is_source(cfg: &ConfigFile, name: &str) -> bool {
    let Some(target) = cfg.target.get(name) else {
        return false;
    };
    target.cmd.is_none()
        && !cfg
            .target
            .values()
            .any(|t| t.co_targets.iter().any(|c| c == name))
}

/// Files a source target stands for: its `outputs`, or its name.
fn source_paths(name: &str, target: &TargetConfig) -> Vec<PathBuf> {
    if target.outputs.is_empty() {
        vec![PathBuf::from(name)]
    } else {
        target.outputs.iter().map(PathBuf::from).collect()
    }
}
