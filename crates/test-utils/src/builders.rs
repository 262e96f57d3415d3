#![allow(dead_code)]

use std::collections::BTreeMap;

use taskmaster::config::{ConfigFile, ConfigSection, RawConfigFile, TargetConfig};
use taskmaster::dag::Graph;
use taskmaster::node::NodeId;

use crate::fake_node::{FakeNode, Journal};

/// Builder for a graph of [`FakeNode`]s sharing one [`Journal`].
pub struct GraphBuilder {
    graph: Graph<FakeNode>,
    journal: Journal,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            graph: Graph::new(),
            journal: Journal::new(),
        }
    }

    pub fn node(&mut self, name: &str) -> NodeId {
        self.graph.add(FakeNode::new(name, &self.journal))
    }

    pub fn node_with_kids(&mut self, name: &str, kids: &[NodeId]) -> NodeId {
        self.graph
            .add(FakeNode::new(name, &self.journal).with_kids(kids))
    }

    pub fn get(&self, id: NodeId) -> &FakeNode {
        self.graph.node(id)
    }

    pub fn journal(&self) -> Journal {
        self.journal.clone()
    }

    pub fn build(self) -> (Graph<FakeNode>, Journal) {
        (self.graph, self.journal)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ConfigFile` to simplify test setup.
pub struct BuildFileBuilder {
    config: RawConfigFile,
}

impl BuildFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                target: BTreeMap::new(),
            },
        }
    }

    pub fn with_target(mut self, name: &str, target: TargetConfig) -> Self {
        self.config.target.insert(name.to_string(), target);
        self
    }

    /// A source file target.
    pub fn with_source(self, name: &str) -> Self {
        self.with_target(name, TargetConfig::default())
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.config.config.jobs = jobs;
        self
    }

    pub fn with_keep_going(mut self, val: bool) -> Self {
        self.config.config.keep_going = val;
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }
}

impl Default for BuildFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TargetConfig`.
pub struct TargetConfigBuilder {
    target: TargetConfig,
}

impl TargetConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            target: TargetConfig {
                cmd: Some(cmd.to_string()),
                ..TargetConfig::default()
            },
        }
    }

    pub fn dep(mut self, dep: &str) -> Self {
        self.target.deps.push(dep.to_string());
        self
    }

    pub fn output(mut self, path: &str) -> Self {
        self.target.outputs.push(path.to_string());
        self
    }

    pub fn side_effect(mut self, name: &str) -> Self {
        self.target.side_effects.push(name.to_string());
        self
    }

    pub fn co_target(mut self, name: &str) -> Self {
        self.target.co_targets.push(name.to_string());
        self
    }

    pub fn alternate(mut self, name: &str) -> Self {
        self.target.alternates.push(name.to_string());
        self
    }

    pub fn always_build(mut self, val: bool) -> Self {
        self.target.always_build = val;
        self
    }

    pub fn build(self) -> TargetConfig {
        self.target
    }
}
