// src/config/validate.rs

use std::collections::BTreeMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskmasterError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskmasterError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.target))
    }
}

/// Dependency cycles are left to the walk, which reports the full path.
fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_targets(cfg)?;
    validate_global_config(cfg)?;
    validate_references(cfg)?;
    validate_co_targets(cfg)?;
    Ok(())
}

fn config_error(msg: String) -> TaskmasterError {
    TaskmasterError::ConfigError(msg)
}

fn ensure_has_targets(cfg: &RawConfigFile) -> Result<()> {
    if cfg.target.is_empty() {
        return Err(config_error(
            "build file must contain at least one [target.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.jobs == 0 {
        return Err(config_error(
            "[config].jobs must be >= 1 (got 0)".to_string(),
        ));
    }
    for name in &cfg.config.default_targets {
        if !cfg.target.contains_key(name) {
            return Err(config_error(format!(
                "[config].default_targets names unknown target '{name}'"
            )));
        }
    }
    Ok(())
}

fn validate_references(cfg: &RawConfigFile) -> Result<()> {
    for (name, target) in cfg.target.iter() {
        let lists = [
            ("deps", &target.deps),
            ("side_effects", &target.side_effects),
            ("co_targets", &target.co_targets),
            ("alternates", &target.alternates),
        ];
        for (field, refs) in lists {
            for other in refs {
                if !cfg.target.contains_key(other) {
                    return Err(config_error(format!(
                        "target '{name}' has unknown target '{other}' in `{field}`"
                    )));
                }
                if other == name {
                    return Err(config_error(format!(
                        "target '{name}' cannot reference itself in `{field}`"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_co_targets(cfg: &RawConfigFile) -> Result<()> {
    let mut produced_by: BTreeMap<&str, &str> = BTreeMap::new();
    for (name, target) in cfg.target.iter() {
        if target.co_targets.is_empty() {
            continue;
        }
        if target.cmd.is_none() {
            return Err(config_error(format!(
                "target '{name}' lists co_targets but has no `cmd`"
            )));
        }
        for member in &target.co_targets {
            if cfg.target[member].cmd.is_some() {
                return Err(config_error(format!(
                    "co-target '{member}' of '{name}' must not define its own `cmd`"
                )));
            }
            if let Some(previous) = produced_by.insert(member.as_str(), name.as_str()) {
                return Err(config_error(format!(
                    "target '{member}' is a co-target of both '{previous}' and '{name}'"
                )));
            }
        }
    }
    for leader in produced_by.values() {
        if produced_by.contains_key(leader) {
            return Err(config_error(format!(
                "target '{leader}' cannot both have co_targets and be one"
            )));
        }
    }
    Ok(())
}

/// A dependency-respecting order of every target, for dry runs.
///
/// On a cycle, returns the name of a target on it.
pub fn planned_order(cfg: &ConfigFile) -> std::result::Result<Vec<String>, String> {
    // Edge direction: dep -> target
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.target.keys() {
        graph.add_node(name.as_str());
    }

    for (name, target) in cfg.target.iter() {
        for dep in target.deps.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(cycle.node_id().to_string()),
    }
}
