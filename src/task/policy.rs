// src/task/policy.rs

use std::fmt;
use std::sync::Arc;

use crate::node::NodeId;

/// Predicate over `(targets, out_of_date)` deciding whether a task runs.
pub type ExecutePredicate = Arc<dyn Fn(&[NodeId], &[NodeId]) -> bool + Send + Sync>;

/// Decides whether a prepared task needs its `execute` phase.
///
/// There is no "undecided" policy: every task is created with one of these,
/// so a task variant that forgets to answer cannot be constructed.
#[derive(Clone, Default)]
pub enum TaskPolicy {
    /// Always execute, even when every target is current.
    Always,
    /// Execute only if some target was found out of date.
    #[default]
    OutOfDate,
    Custom(ExecutePredicate),
}

impl TaskPolicy {
    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&[NodeId], &[NodeId]) -> bool + Send + Sync + 'static,
    {
        TaskPolicy::Custom(Arc::new(predicate))
    }

    pub fn needs_execute(&self, targets: &[NodeId], out_of_date: &[NodeId]) -> bool {
        match self {
            TaskPolicy::Always => true,
            TaskPolicy::OutOfDate => !out_of_date.is_empty(),
            TaskPolicy::Custom(predicate) => predicate(targets, out_of_date),
        }
    }
}

impl fmt::Debug for TaskPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPolicy::Always => f.write_str("Always"),
            TaskPolicy::OutOfDate => f.write_str("OutOfDate"),
            TaskPolicy::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// How `make_ready` classifies a task's targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReadyMode {
    /// Consult each target's up-to-date check.
    #[default]
    Current,
    /// Treat every target as out of date.
    All,
}
