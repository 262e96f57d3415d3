// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::OrderPolicy;

/// Top-level build file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// jobs = 4
/// keep_going = false
/// default_targets = ["app"]
///
/// [target."main.c"]
///
/// [target.app]
/// cmd = "cc -o app main.c"
/// deps = ["main.c"]
/// outputs = ["app"]
/// ```
///
/// A target without `cmd` is a source: it is never built, only checked for
/// existence when something depends on it.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All targets from `[target.<name>]`, keyed by target name.
    #[serde(default)]
    pub target: BTreeMap<String, TargetConfig>,
}

/// A validated build file. Construct with `ConfigFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub target: BTreeMap<String, TargetConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        target: BTreeMap<String, TargetConfig>,
    ) -> Self {
        Self { config, target }
    }

    /// Targets to build when none are requested: `default_targets` if set,
    /// otherwise every target nothing else depends on.
    pub fn default_targets(&self) -> Vec<String> {
        if !self.config.default_targets.is_empty() {
            return self.config.default_targets.clone();
        }
        self.target
            .keys()
            .filter(|name| {
                !self
                    .target
                    .values()
                    .any(|t| t.deps.contains(name) || t.co_targets.contains(name))
            })
            .cloned()
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Number of tasks executed concurrently. `1` runs serially.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Keep building unrelated targets after a failure.
    #[serde(default)]
    pub keep_going: bool,

    #[serde(default)]
    pub order: OrderPolicy,

    #[serde(default)]
    pub default_targets: Vec<String>,
}

fn default_jobs() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            keep_going: false,
            order: OrderPolicy::default(),
            default_targets: Vec::new(),
        }
    }
}

/// `[target.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TargetConfig {
    /// Shell command that builds this target (and its co-targets).
    #[serde(default)]
    pub cmd: Option<String>,

    /// Targets that must be finished before this one is built.
    #[serde(default)]
    pub deps: Vec<String>,

    /// Files the command produces, relative to the build file. The target
    /// is current when all of them exist.
    #[serde(default)]
    pub outputs: Vec<String>,

    /// Targets touched as a by-product of the command. Two commands sharing
    /// a side effect never run at the same time.
    #[serde(default)]
    pub side_effects: Vec<String>,

    /// Other targets produced by the same command invocation.
    #[serde(default)]
    pub co_targets: Vec<String>,

    /// Targets built in place of this one when it is requested.
    #[serde(default)]
    pub alternates: Vec<String>,

    /// Run the command even when every output exists.
    #[serde(default)]
    pub always_build: bool,
}
