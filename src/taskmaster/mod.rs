// src/taskmaster/mod.rs

//! The coordinator: walks the dependency graph from the requested targets
//! and hands out [`Task`]s whose children are all finished.
//!
//! - [`walk`] contains the candidate selection and the ready-node search.
//!
//! The taskmaster is single-threaded. Job runners call [`Taskmaster::next_task`]
//! and every task phase except `execute` from one coordinator; `execute` may
//! run anywhere.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::dag::{Graph, find_cycle, render_cycle};
use crate::errors::{Result, TaskmasterError};
use crate::node::{Node, NodeId, NodeState};
use crate::task::{ReadyMode, Task, TaskPolicy};
use crate::trace::Trace;
use crate::warnings::{LogWarnings, WarningSink};

pub mod walk;

/// Reorders freshly discovered children before they join the candidate
/// stack. The default keeps them as given.
pub type OrderFn = Box<dyn Fn(Vec<NodeId>) -> Vec<NodeId> + Send>;

/// Hook run when the walk is stopped.
pub type StopHook = Box<dyn FnMut() + Send>;

pub struct Taskmaster<N: Node> {
    pub(crate) graph: Graph<N>,
    /// Requested targets plus any alternates picked in their place.
    top_nodes: BTreeSet<NodeId>,
    /// Requested targets not yet started, last one on top.
    top_targets_left: Vec<NodeId>,
    pub(crate) candidates: Vec<NodeId>,
    /// Nodes that were found pending while some parent was waiting on them.
    pub(crate) pending_children: BTreeSet<NodeId>,
    pub(crate) policy: TaskPolicy,
    pub(crate) ready_mode: ReadyMode,
    order: OrderFn,
    pub(crate) trace: Option<Trace>,
    pub(crate) warnings: Arc<dyn WarningSink>,
    /// Shown by the next task to be prepared.
    pub(crate) message: Option<String>,
    pub(crate) current_top: Option<NodeId>,
    stopped: bool,
    on_stop: Option<StopHook>,
    /// Failure met while evaluating the node about to be handed out.
    ready_exc: Option<TaskmasterError>,
}

impl<N: Node> Taskmaster<N> {
    /// Start a walk over `graph` that builds `targets`, in order.
    ///
    /// Duplicates in `targets` are allowed; a target already handled is
    /// skipped.
    pub fn new(graph: Graph<N>, targets: Vec<NodeId>) -> Self {
        let top_nodes = targets.iter().copied().collect();
        let mut top_targets_left = targets;
        top_targets_left.reverse();
        Self {
            graph,
            top_nodes,
            top_targets_left,
            candidates: Vec::new(),
            pending_children: BTreeSet::new(),
            policy: TaskPolicy::default(),
            ready_mode: ReadyMode::default(),
            order: Box::new(|nodes| nodes),
            trace: None,
            warnings: Arc::new(LogWarnings),
            message: None,
            current_top: None,
            stopped: false,
            on_stop: None,
            ready_exc: None,
        }
    }

    pub fn with_policy(mut self, policy: TaskPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_ready_mode(mut self, mode: ReadyMode) -> Self {
        self.ready_mode = mode;
        self
    }

    pub fn with_order<F>(mut self, order: F) -> Self
    where
        F: Fn(Vec<NodeId>) -> Vec<NodeId> + Send + 'static,
    {
        self.order = Box::new(order);
        self
    }

    pub fn with_trace(mut self, trace: Trace) -> Self {
        self.trace = Some(trace);
        self
    }

    pub fn with_warnings(mut self, warnings: Arc<dyn WarningSink>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        self.on_stop = Some(Box::new(hook));
        self
    }

    pub fn graph(&self) -> &Graph<N> {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph<N> {
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph<N> {
        self.graph
    }

    /// The requested target currently being worked towards.
    pub fn current_top(&self) -> Option<NodeId> {
        self.current_top
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop handing out tasks. Tasks already handed out may still finish.
    pub fn stop(&mut self) {
        if !self.stopped {
            debug!("taskmaster stopped");
        }
        self.stopped = true;
        if let Some(hook) = self.on_stop.as_mut() {
            hook();
        }
    }

    /// Hand out the next task whose children are all finished, or `None`
    /// when nothing else can be started.
    ///
    /// A failure while scanning the node's children, or while checking its
    /// targets, is not returned here: it is stored on the task and surfaces
    /// from the task's `prepare`. A dependency cycle is returned directly.
    pub fn next_task(&mut self) -> Result<Option<Task<N>>> {
        let Some(node) = self.find_next_ready_node()? else {
            return Ok(None);
        };

        let executor = self.graph.node(node).executor(node);
        let targets = executor.targets();
        let top = self.top_nodes.contains(&node);

        let mut task = Task::new(self, targets, top, node);
        if let Err(err) = task.make_ready(self) {
            self.ready_exc = Some(err);
        }
        if let Some(err) = self.ready_exc.take() {
            task.exception_set(err);
        }
        Ok(Some(task))
    }

    /// Mark `nodes` and, transitively, every parent waiting on them as never
    /// to be built. Optionally sets `mark` as the state of each.
    pub fn will_not_build(&mut self, nodes: &[NodeId], mark: Option<NodeState>) {
        let mut to_visit: BTreeSet<NodeId> = nodes.iter().copied().collect();

        for node in nodes {
            self.pending_children.remove(node);
            self.trace_message(&format!(
                "       removing node {} from the pending children set",
                self.graph.describe(*node)
            ));
        }

        while let Some(node) = to_visit.pop_first() {
            if let Some(state) = mark {
                self.graph.slot(node).set_state(state);
            }
            for parent in self.graph.take_waiting_parents(node) {
                self.pending_children.remove(&parent);
                self.graph.slot(parent).release_refs(1);
                self.trace_message(&format!(
                    "       removing parent {} from the pending children set",
                    self.graph.describe(parent)
                ));
                to_visit.insert(parent);
            }
        }
    }

    /// Report nodes that were left pending once the walk is over.
    ///
    /// Nodes that finished executing are fine. Anything else is either part
    /// of a cycle or an internal inconsistency; both are reported in one
    /// [`TaskmasterError::CycleCleanup`].
    pub fn cleanup(&self) -> Result<()> {
        if self.pending_children.is_empty() {
            return Ok(());
        }

        let findings: Vec<(NodeId, Option<Vec<NodeId>>)> = self
            .pending_children
            .iter()
            .map(|&node| (node, find_cycle(&self.graph, node)))
            .collect();

        let genuine = findings
            .iter()
            .any(|(node, cycle)| cycle.is_some() || self.graph.state(*node) != NodeState::Executed);
        if !genuine {
            return Ok(());
        }

        let mut desc = String::new();
        for (node, cycle) in &findings {
            match cycle {
                Some(cycle) => {
                    desc.push_str(&format!("  {}\n", render_cycle(&self.graph, cycle)));
                }
                None => {
                    desc.push_str(&format!(
                        "  Internal Error: no cycle found for node {} ({}) in state {}\n",
                        self.graph.name(*node),
                        node,
                        self.graph.state(*node)
                    ));
                }
            }
        }
        warn!(pending = findings.len(), "nodes left pending after the walk");
        Err(TaskmasterError::CycleCleanup(desc))
    }

    pub(crate) fn trace_line(&self, text: &str) {
        if let Some(trace) = &self.trace {
            trace.write(text);
        }
    }

    pub(crate) fn trace_message(&self, message: &str) {
        if let Some(trace) = &self.trace {
            trace.taskmaster(message);
        }
    }
}
