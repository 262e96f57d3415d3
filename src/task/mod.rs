// src/task/mod.rs

//! One schedulable unit of work: a node plus the executor targets it builds.
//!
//! A task moves through fixed phases, driven by a job runner:
//!
//! 1. `make_ready` (run by [`Taskmaster::next_task`]) classifies targets as
//!    current or out of date.
//! 2. [`Task::prepare`] re-raises anything captured earlier and readies the
//!    executor and targets.
//! 3. [`Task::execute`] builds, or restores from cache. This is the only
//!    phase that may run off the coordinator thread.
//! 4. [`Task::executed`] or [`Task::failed`] records the outcome.
//! 5. [`Task::postprocess`] releases waiting parents back to the walk.
//!
//! - [`policy`]: whether a task needs its execute phase at all.
//! - [`exception`]: the captured-failure slot.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::dag::Slot;
use crate::errors::{BuildError, Result, TaskmasterError};
use crate::node::{Node, NodeId, NodeState};
use crate::taskmaster::Taskmaster;
use crate::trace::Trace;
use crate::warnings::{WarningKind, WarningSink};

pub mod exception;
pub mod policy;

pub use exception::TaskException;
pub use policy::{ExecutePredicate, ReadyMode, TaskPolicy};

pub struct Task<N: Node> {
    node: Arc<Slot<N>>,
    targets: Vec<Arc<Slot<N>>>,
    top: bool,
    out_of_date: Vec<NodeId>,
    exception: Option<TaskException>,
    served_from_cache: BTreeSet<NodeId>,
    policy: TaskPolicy,
    trace: Option<Trace>,
    warnings: Arc<dyn WarningSink>,
}

impl<N: Node> Task<N> {
    pub(crate) fn new(tm: &Taskmaster<N>, targets: Vec<NodeId>, top: bool, node: NodeId) -> Self {
        Self {
            node: Arc::clone(tm.graph.slot(node)),
            targets: targets
                .into_iter()
                .map(|t| Arc::clone(tm.graph.slot(t)))
                .collect(),
            top,
            out_of_date: Vec::new(),
            exception: None,
            served_from_cache: BTreeSet::new(),
            policy: tm.policy.clone(),
            trace: tm.trace.clone(),
            warnings: Arc::clone(&tm.warnings),
        }
    }

    /// The node whose evaluation produced this task.
    pub fn node(&self) -> NodeId {
        self.node.id()
    }

    /// The first target, the one whose `build` runs the action.
    pub fn get_target(&self) -> NodeId {
        self.primary().id()
    }

    pub fn targets(&self) -> Vec<NodeId> {
        self.targets.iter().map(|t| t.id()).collect()
    }

    /// Replace the target list. Only meaningful before `make_ready`.
    pub fn set_targets(&mut self, tm: &Taskmaster<N>, targets: Vec<NodeId>) {
        self.targets = targets
            .into_iter()
            .map(|t| Arc::clone(tm.graph.slot(t)))
            .collect();
    }

    /// Whether the task's node is one of the requested top-level targets.
    pub fn is_top(&self) -> bool {
        self.top
    }

    pub fn out_of_date(&self) -> &[NodeId] {
        &self.out_of_date
    }

    /// Whether `target` was restored from cache by the last `execute`.
    pub fn served_from_cache(&self, target: NodeId) -> bool {
        self.served_from_cache.contains(&target)
    }

    pub fn needs_execute(&self) -> bool {
        self.policy.needs_execute(&self.targets(), &self.out_of_date)
    }

    fn primary(&self) -> &Arc<Slot<N>> {
        self.targets.first().unwrap_or(&self.node)
    }

    fn trace_phase(&self, method: &str) {
        if let Some(trace) = &self.trace {
            trace.task(method, "node", &self.node.describe());
        }
    }

    // ---- readiness ----------------------------------------------------

    pub(crate) fn make_ready(&mut self, tm: &mut Taskmaster<N>) -> Result<()> {
        match tm.ready_mode {
            ReadyMode::Current => self.make_ready_current(tm),
            ReadyMode::All => {
                self.make_ready_all(tm);
                Ok(())
            }
        }
    }

    /// Split targets into current and out of date.
    ///
    /// If anything is out of date, every target and its side effects move to
    /// `Executing`. Otherwise every target is visited and marked
    /// `UpToDate`.
    pub fn make_ready_current(&mut self, tm: &mut Taskmaster<N>) -> Result<()> {
        self.trace_phase("Task.make_ready_current()");

        self.out_of_date.clear();
        for target in &self.targets {
            let node = target.node();
            node.make_ready()
                .map_err(|err| readiness_failure(target.id(), target.name(), err))?;
            let current = !node.has_builder()
                || (!node.always_build()
                    && node
                        .is_up_to_date()
                        .map_err(|err| readiness_failure(target.id(), target.name(), err))?);
            if !current {
                self.out_of_date.push(target.id());
            }
        }

        if self.out_of_date.is_empty() {
            for target in &self.targets {
                target.node().visited();
                target.set_state(NodeState::UpToDate);
                target.node().release_target_info();
            }
        } else {
            self.mark_executing(tm);
        }
        Ok(())
    }

    /// Treat every target as out of date.
    pub fn make_ready_all(&mut self, tm: &mut Taskmaster<N>) {
        self.trace_phase("Task.make_ready_all()");
        self.out_of_date = self.targets();
        self.mark_executing(tm);
    }

    fn mark_executing(&self, tm: &Taskmaster<N>) {
        for target in &self.targets {
            target.set_state(NodeState::Executing);
            for side_effect in target.node().side_effects() {
                tm.graph.slot(side_effect).set_state(NodeState::Executing);
            }
        }
    }

    // ---- prepare / execute ------------------------------------------

    /// Re-raise anything captured earlier, then prepare the executor and
    /// every target and side effect.
    pub fn prepare(&mut self, tm: &mut Taskmaster<N>) -> Result<()> {
        self.trace_phase("Task.prepare()");

        self.exception_raise()?;

        if let Some(message) = tm.message.take() {
            info!("{message}");
        }

        let primary = Arc::clone(self.primary());
        let executor = primary.node().executor(primary.id());
        executor
            .prepare()
            .map_err(|err| TaskmasterError::lift_for(primary.id(), primary.name(), err))?;

        for target in executor.targets() {
            let slot = tm.graph.slot(target);
            slot.node()
                .prepare()
                .map_err(|err| TaskmasterError::lift_for(slot.id(), slot.name(), err))?;
            for side_effect in slot.node().side_effects() {
                let se = tm.graph.slot(side_effect);
                se.node()
                    .prepare()
                    .map_err(|err| TaskmasterError::lift_for(se.id(), se.name(), err))?;
            }
        }
        Ok(())
    }

    /// Build the targets, or restore all of them from cache.
    ///
    /// Cache retrieval walks the targets in order and stops at the first
    /// miss. A partial hit is undone (retrieved files are removed) and the
    /// action runs for the whole group.
    pub fn execute(&mut self) -> Result<()> {
        self.trace_phase("Task.execute()");

        let mut retrieved = Vec::new();
        for target in &self.targets {
            if !target.node().retrieve_from_cache() {
                break;
            }
            retrieved.push(Arc::clone(target));
        }

        if retrieved.len() == self.targets.len() {
            for target in retrieved {
                debug!(target = %target.name(), "restored from cache");
                self.served_from_cache.insert(target.id());
            }
            return Ok(());
        }

        for target in &retrieved {
            if let Err(err) = target.node().remove_retrieved() {
                self.warnings.warn(
                    WarningKind::CacheCleanupError,
                    &format!(
                        "Failed copying all target files from cache, Error while attempting to remove file {} retrieved from cache: {}",
                        target.node().internal_path(),
                        err
                    ),
                );
            }
        }

        let primary = Arc::clone(self.primary());
        debug!(target = %primary.name(), "building");
        primary
            .node()
            .build()
            .map_err(|err| build_failure(primary.id(), primary.name(), err))
    }

    // ---- outcome --------------------------------------------------------

    /// Record a successful task and run the node callbacks.
    pub fn executed(&mut self, tm: &mut Taskmaster<N>) {
        self.trace_phase("Task.executed_with_callbacks()");
        self.finish_targets(tm, true);
    }

    /// Record a successful task without the node callbacks.
    pub fn executed_without_callbacks(&mut self, tm: &mut Taskmaster<N>) {
        self.trace_phase("Task.executed_without_callbacks()");
        self.finish_targets(tm, false);
    }

    fn finish_targets(&self, tm: &Taskmaster<N>, callbacks: bool) {
        for target in &self.targets {
            if target.state() != NodeState::Executing {
                if callbacks {
                    target.node().visited();
                }
                continue;
            }
            for side_effect in target.node().side_effects() {
                tm.graph.slot(side_effect).set_state(NodeState::NoState);
            }
            target.set_state(NodeState::Executed);
            if !callbacks {
                continue;
            }
            let node = target.node();
            if !self.served_from_cache(target.id()) {
                node.push_to_cache();
            }
            node.built();
            for parent in tm.graph.waiting_parents(target.id()) {
                tm.graph.node(parent).reset_implicit_deps();
            }
            node.visited();
            node.release_target_info();
        }
    }

    /// Record a failed task. Keep going unless the captured failure forces
    /// a stop.
    pub fn failed(&mut self, tm: &mut Taskmaster<N>, keep_going: bool) {
        let forced = self
            .exception
            .as_ref()
            .is_some_and(TaskException::forces_stop);
        if keep_going && !forced {
            self.fail_continue(tm);
        } else {
            self.fail_stop(tm);
        }
    }

    /// Fail the targets and everything waiting on them, then stop the walk.
    ///
    /// The task is retargeted at the top-level node being built, so the
    /// failure is reported at that granularity.
    pub fn fail_stop(&mut self, tm: &mut Taskmaster<N>) {
        self.trace_phase("Task.failed_stop()");
        tm.will_not_build(&self.targets(), Some(NodeState::Failed));
        tm.stop();
        if let Some(top) = tm.current_top {
            self.targets = vec![Arc::clone(tm.graph.slot(top))];
        }
        self.top = true;
    }

    /// Fail the targets and everything waiting on them; the walk continues
    /// with unrelated nodes.
    pub fn fail_continue(&mut self, tm: &mut Taskmaster<N>) {
        self.trace_phase("Task.failed_continue()");
        tm.will_not_build(&self.targets(), Some(NodeState::Failed));
    }

    /// Release parents waiting on the targets (and on side effects that are
    /// free again), queueing any whose ref count drops to zero.
    pub fn postprocess(&mut self, tm: &mut Taskmaster<N>) {
        self.trace_phase("Task.postprocess()");

        let mut targets: Vec<NodeId> = Vec::with_capacity(self.targets.len());
        for id in self.targets() {
            if !targets.contains(&id) {
                targets.push(id);
            }
        }

        let mut parents: Vec<(NodeId, usize)> = Vec::new();
        let mut bump = |parent: NodeId| match parents.iter_mut().find(|(p, _)| *p == parent) {
            Some((_, count)) => *count += 1,
            None => parents.push((parent, 1)),
        };

        for &target in &targets {
            let waiting = tm.graph.take_waiting_parents(target);
            if !waiting.is_empty() {
                if let Some(trace) = &self.trace {
                    trace.task("Task.postprocess()", "removing", &tm.graph.describe(target));
                }
                tm.pending_children.remove(&target);
            }
            waiting.into_iter().for_each(&mut bump);
        }

        for &target in &targets {
            for side_effect in tm.graph.node(target).side_effects() {
                let slot = Arc::clone(tm.graph.slot(side_effect));
                if slot.state() == NodeState::Executing {
                    slot.set_state(NodeState::NoState);
                }
                if slot.state() == NodeState::NoState {
                    let waiting = tm.graph.take_waiting_parents(side_effect);
                    if !waiting.is_empty() {
                        tm.pending_children.remove(&side_effect);
                        waiting.into_iter().for_each(&mut bump);
                    }
                }
                for blocked in tm.graph.take_waiting_side_effects(side_effect) {
                    if tm.graph.ref_count(blocked) == 0 {
                        tm.candidates.push(blocked);
                    }
                }
            }
        }

        for (parent, count) in parents {
            let slot = Arc::clone(tm.graph.slot(parent));
            let remaining = slot.release_refs(count);
            if let Some(trace) = &self.trace {
                trace.task(
                    "Task.postprocess()",
                    "adjusted parent ref count",
                    &slot.describe(),
                );
            }
            if remaining == 0 {
                tm.candidates.push(parent);
            }
        }

        for &target in &targets {
            tm.graph.node(target).postprocess();
        }
    }

    // ---- exception slot ---------------------------------------------

    pub fn exception(&self) -> Option<&TaskException> {
        self.exception.as_ref()
    }

    pub fn exception_set(&mut self, err: TaskmasterError) {
        self.exception = Some(TaskException::Error(err));
    }

    /// Record a non-error value in the exception slot.
    pub fn exception_set_payload(&mut self, payload: impl Into<String>) {
        self.exception = Some(TaskException::Payload(payload.into()));
    }

    pub fn exc_clear(&mut self) {
        self.exception = None;
    }

    /// Return whatever is in the exception slot as an error, emptying it.
    pub fn exception_raise(&mut self) -> Result<()> {
        match self.exception.take() {
            Some(exception) => Err(exception.into_error()),
            None => Ok(()),
        }
    }
}

/// Failures from the up-to-date check. Filesystem errors are attributed to
/// the target being checked.
fn readiness_failure(node: NodeId, name: &str, err: anyhow::Error) -> TaskmasterError {
    if let Some(io) = err.downcast_ref::<std::io::Error>() {
        return BuildError::new(io.to_string()).for_node(node, name).into();
    }
    TaskmasterError::lift_for(node, name, err)
}

/// User errors, build errors and exit requests pass through; anything else
/// becomes a [`BuildError`] naming the failure's kind.
fn build_failure(node: NodeId, name: &str, err: anyhow::Error) -> TaskmasterError {
    match TaskmasterError::lift_for(node, name, err) {
        err @ (TaskmasterError::User(_)
        | TaskmasterError::Build(_)
        | TaskmasterError::ExplicitExit { .. }) => err,
        TaskmasterError::Other(err) => BuildError::wrap(node, name, err).into(),
        other => BuildError::wrap(node, name, anyhow::Error::new(other)).into(),
    }
}
