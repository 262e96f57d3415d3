// src/dag/cycle.rs

//! Cycle search over the waiting-parent relation.
//!
//! A pending node waits on its children; each child records the parent in
//! its waiting list. Following those lists from a node and arriving back at
//! it means no node on the path can ever become ready.

use std::collections::HashSet;

use crate::dag::Graph;
use crate::node::{Node, NodeId};

/// Find a waiting-parent path that starts and ends at `start`.
///
/// The returned path repeats `start` as its last element.
pub fn find_cycle<N: Node>(graph: &Graph<N>, start: NodeId) -> Option<Vec<NodeId>> {
    let mut stack = vec![start];
    let mut visited = HashSet::new();
    if walk(graph, &mut stack, &mut visited) {
        Some(stack)
    } else {
        None
    }
}

fn walk<N: Node>(graph: &Graph<N>, stack: &mut Vec<NodeId>, visited: &mut HashSet<NodeId>) -> bool {
    let Some(&top) = stack.last() else {
        return false;
    };
    if !visited.insert(top) {
        return false;
    }
    for parent in graph.waiting_parents(top) {
        stack.push(parent);
        if stack[0] == parent {
            return true;
        }
        if walk(graph, stack, visited) {
            return true;
        }
        stack.pop();
    }
    false
}

/// `a -> b -> a` rendering of a cycle path.
pub fn render_cycle<N: Node>(graph: &Graph<N>, cycle: &[NodeId]) -> String {
    cycle
        .iter()
        .map(|id| graph.name(*id))
        .collect::<Vec<_>>()
        .join(" -> ")
}
