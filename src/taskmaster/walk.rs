// src/taskmaster/walk.rs

//! Candidate selection and the search for the next ready node.
//!
//! Candidates form a stack. When a node's children are not all finished,
//! the unvisited ones are pushed on top and the node registers itself as a
//! waiting parent of every unfinished child. It comes back as a candidate
//! once its ref count drops to zero in `Task::postprocess`.

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::dag::{find_cycle, render_cycle};
use crate::errors::{Result, TaskmasterError};
use crate::node::{Node, NodeId, NodeState};
use crate::taskmaster::Taskmaster;

impl<N: Node> Taskmaster<N> {
    /// Next node to evaluate: the candidate stack first, then the next
    /// requested target.
    pub(crate) fn next_candidate(&mut self) -> Option<NodeId> {
        if self.is_stopped() {
            return None;
        }
        if let Some(node) = self.candidates.pop() {
            return Some(node);
        }

        let node = self.top_targets_left.pop()?;
        self.current_top = Some(node);

        let (alternates, message) = self.graph.node(node).alter_targets();
        if alternates.is_empty() {
            return Some(node);
        }

        debug!(
            node = %self.graph.name(node),
            alternates = alternates.len(),
            "building alternates in place of target"
        );
        self.message = message;
        self.top_nodes.extend(alternates.iter().copied());
        self.candidates.push(node);
        let ordered = (self.order)(alternates);
        self.candidates.extend(ordered);
        self.candidates.pop()
    }

    /// Walk candidates until one is found whose children are all finished.
    ///
    /// Returns `Ok(None)` once there is nothing left to evaluate.
    pub(crate) fn find_next_ready_node(&mut self) -> Result<Option<NodeId>> {
        self.trace_line("\n");
        self.trace_message("Looking for a node to evaluate");

        loop {
            let Some(candidate) = self.next_candidate() else {
                self.trace_message("No candidate anymore.");
                return Ok(None);
            };

            let node = self.graph.node(candidate).disambiguate(candidate);
            let state = self.graph.state(node);

            self.trace_message(&format!(
                "    Considering node {} and its children:",
                self.graph.describe(node)
            ));

            if state == NodeState::NoState {
                self.graph.slot(node).set_state(NodeState::Pending);
            } else if state > NodeState::Pending {
                self.trace_message(&format!("       already handled ({state})"));
                continue;
            }

            let executor = self.graph.node(node).executor(node);
            let executor_targets = executor.targets();

            let mut children: Vec<NodeId> = Vec::new();
            let mut scan_error = None;
            for target in &executor_targets {
                match self.graph.node(*target).children() {
                    Ok(kids) => {
                        for kid in kids {
                            if !children.contains(&kid) {
                                children.push(kid);
                            }
                        }
                    }
                    Err(err) => {
                        let name = self.graph.name(*target).to_string();
                        scan_error = Some(TaskmasterError::lift_for(*target, &name, err));
                        break;
                    }
                }
            }
            if let Some(err) = scan_error {
                // Hand the node out anyway; the failure surfaces from prepare.
                self.trace_message(&format!("       exception {err} while scanning children."));
                debug!(node = %self.graph.name(node), error = %err, "failed to scan children");
                self.ready_exc = Some(err);
                return Ok(Some(node));
            }

            let mut not_visited = Vec::new();
            let mut pending = BTreeSet::new();
            let mut not_ready = Vec::new();
            let mut failed = false;

            for child in executor.prerequisites().into_iter().chain(children) {
                let child = self.graph.node(child).disambiguate(child);
                let child_state = self.graph.state(child);
                self.trace_message(&format!("       {}", self.graph.describe(child)));

                match child_state {
                    NodeState::NoState => not_visited.push(child),
                    NodeState::Pending => {
                        pending.insert(child);
                    }
                    NodeState::Failed => failed = true,
                    _ => {}
                }
                if child_state <= NodeState::Executing && !not_ready.contains(&child) {
                    not_ready.push(child);
                }
            }

            if not_visited.len() > 1 {
                not_visited.reverse();
            }
            let ordered = (self.order)(not_visited);
            self.candidates.extend(ordered);

            if failed {
                for target in &executor_targets {
                    self.graph.slot(*target).set_state(NodeState::Failed);
                }
                self.trace_message(&format!(
                    "       ****** {}",
                    self.graph.describe(node)
                ));
                continue;
            }

            if !not_ready.is_empty() {
                for child in not_ready {
                    if self.graph.add_waiting_parent(child, node) {
                        self.graph.slot(node).add_ref(1);
                    }
                    self.trace_message(&format!(
                        "     adjusted ref count: {}, child '{}'",
                        self.graph.describe(node),
                        self.graph.name(child)
                    ));
                }
                self.detect_cycle(&pending)?;
                self.pending_children.extend(pending);
                continue;
            }

            let busy: Vec<NodeId> = executor
                .action_side_effects()
                .into_iter()
                .filter(|se| self.graph.state(*se) == NodeState::Executing)
                .collect();
            if !busy.is_empty() {
                for side_effect in busy {
                    self.graph.add_waiting_side_effect(side_effect, node);
                    trace!(
                        node = %self.graph.name(node),
                        side_effect = %self.graph.name(side_effect),
                        "waiting on side effect"
                    );
                }
                continue;
            }

            self.trace_message(&format!("Evaluating {}\n", self.graph.describe(node)));
            return Ok(Some(node));
        }
    }

    /// A parent just started waiting on children that were already pending.
    /// If one of them is (transitively) waiting on that parent, no node on
    /// the loop can ever become ready.
    fn detect_cycle(&self, pending: &BTreeSet<NodeId>) -> Result<()> {
        for &child in pending {
            if let Some(cycle) = find_cycle(&self.graph, child) {
                let rendered = render_cycle(&self.graph, &cycle);
                debug!(cycle = %rendered, "dependency cycle detected");
                return Err(TaskmasterError::DependencyCycle(rendered));
            }
        }
        Ok(())
    }
}
