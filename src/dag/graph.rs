// src/dag/graph.rs

use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::node::{Node, NodeId, NodeState};

/// A node together with the scheduler's per-node counters.
///
/// Slots are shared (`Arc`) so a task can carry its targets to a worker
/// thread and progress readers can observe states while a build runs. Only
/// the coordinator writes state and ref counts.
#[derive(Debug)]
pub struct Slot<N> {
    id: NodeId,
    node: N,
    state: AtomicU8,
    ref_count: AtomicUsize,
}

impl<N: Node> Slot<N> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn name(&self) -> &str {
        self.node.name()
    }

    pub fn state(&self) -> NodeState {
        NodeState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Number of children this node is still waiting on.
    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Acquire)
    }

    pub(crate) fn set_state(&self, state: NodeState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub(crate) fn add_ref(&self, n: usize) {
        self.ref_count.fetch_add(n, Ordering::AcqRel);
    }

    /// Drop `n` references, stopping at zero.
    pub(crate) fn release_refs(&self, n: usize) -> usize {
        let previous = self
            .ref_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |rc| {
                Some(rc.saturating_sub(n))
            })
            .unwrap_or_else(|rc| rc);
        previous.saturating_sub(n)
    }

    /// `<state      rc  'name'>`, the form used in trace output.
    pub fn describe(&self) -> String {
        format!(
            "<{:<10} {:<3} '{}'>",
            self.state().as_str(),
            self.ref_count(),
            self.name()
        )
    }
}

/// Coordinator-only wait lists for one node.
#[derive(Debug, Default, Clone)]
pub(crate) struct Links {
    /// Parents blocked on this node.
    pub(crate) waiting_parents: BTreeSet<NodeId>,
    /// Nodes blocked because this side effect was executing.
    pub(crate) waiting_side_effects: BTreeSet<NodeId>,
}

/// Arena owning every node of a build, addressed by [`NodeId`].
///
/// Ids are only meaningful for the graph that issued them; indexing with a
/// foreign id panics.
#[derive(Debug)]
pub struct Graph<N> {
    slots: Vec<Arc<Slot<N>>>,
    links: Vec<Links>,
}

impl<N: Node> Graph<N> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            links: Vec::new(),
        }
    }

    /// Id the next call to [`Graph::add`] will return.
    pub fn next_id(&self) -> NodeId {
        NodeId::new(self.slots.len())
    }

    pub fn add(&mut self, node: N) -> NodeId {
        let id = self.next_id();
        self.slots.push(Arc::new(Slot {
            id,
            node,
            state: AtomicU8::new(NodeState::NoState as u8),
            ref_count: AtomicUsize::new(0),
        }));
        self.links.push(Links::default());
        id
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.slots.iter().map(|s| s.id)
    }

    pub fn node(&self, id: NodeId) -> &N {
        &self.slots[id.index()].node
    }

    pub fn slot(&self, id: NodeId) -> &Arc<Slot<N>> {
        &self.slots[id.index()]
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.slots[id.index()].name()
    }

    pub fn state(&self, id: NodeId) -> NodeState {
        self.slots[id.index()].state()
    }

    /// Force a node's state, e.g. to mark it built by an earlier pass.
    pub fn set_state(&mut self, id: NodeId, state: NodeState) {
        self.slots[id.index()].set_state(state);
    }

    pub fn ref_count(&self, id: NodeId) -> usize {
        self.slots[id.index()].ref_count()
    }

    pub fn waiting_parents(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.links[id.index()].waiting_parents.iter().copied()
    }

    pub fn describe(&self, id: NodeId) -> String {
        self.slots[id.index()].describe()
    }

    /// Put every node back in its initial scheduling state so the graph can
    /// be walked again.
    pub fn reset(&mut self) {
        for slot in &self.slots {
            slot.set_state(NodeState::NoState);
            slot.ref_count.store(0, Ordering::Release);
        }
        for links in &mut self.links {
            *links = Links::default();
        }
    }

    /// Register `parent` as waiting on `child`. Returns true if it was not
    /// already registered.
    pub(crate) fn add_waiting_parent(&mut self, child: NodeId, parent: NodeId) -> bool {
        self.links[child.index()].waiting_parents.insert(parent)
    }

    pub(crate) fn take_waiting_parents(&mut self, id: NodeId) -> BTreeSet<NodeId> {
        std::mem::take(&mut self.links[id.index()].waiting_parents)
    }

    pub(crate) fn add_waiting_side_effect(&mut self, side_effect: NodeId, node: NodeId) {
        self.links[side_effect.index()]
            .waiting_side_effects
            .insert(node);
    }

    pub(crate) fn take_waiting_side_effects(&mut self, id: NodeId) -> BTreeSet<NodeId> {
        std::mem::take(&mut self.links[id.index()].waiting_side_effects)
    }
}

impl<N: Node> Default for Graph<N> {
    fn default() -> Self {
        Self::new()
    }
}
