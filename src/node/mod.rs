// src/node/mod.rs

//! The contract between the scheduler and the things it schedules.
//!
//! Nodes live in a [`Graph`](crate::dag::Graph) arena and refer to each other
//! by [`NodeId`]. The scheduler keeps the bookkeeping (state, ref count,
//! waiting parents) next to each node, so a [`Node`] implementation only
//! supplies the behaviours below.
//!
//! - [`state`]: the [`NodeState`] lattice.
//! - [`Executor`]: the action that builds a group of co-produced targets.
//! - [`TargetGroup`]: an executor over a fixed target list.

use std::fmt;
use std::sync::Arc;

pub mod state;

pub use state::NodeState;

/// Handle to a node inside a [`Graph`](crate::dag::Graph).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Ids are handed out densely from zero in insertion order.
    pub const fn new(index: usize) -> Self {
        NodeId(index)
    }

    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The action that produces one or more targets together.
///
/// Every target in [`Executor::targets`] is considered built by a single
/// invocation of the first target's [`Node::build`].
pub trait Executor: Send + Sync {
    /// Last check before building, e.g. that source inputs exist.
    fn prepare(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn targets(&self) -> Vec<NodeId>;

    /// Nodes that must be finished before the action may run, in addition to
    /// the targets' children.
    fn prerequisites(&self) -> Vec<NodeId> {
        Vec::new()
    }

    /// Side-effect nodes touched by the action. While any of them is being
    /// built by another task, this action waits.
    fn action_side_effects(&self) -> Vec<NodeId> {
        Vec::new()
    }
}

/// Executor over a fixed list of targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetGroup {
    targets: Vec<NodeId>,
}

impl TargetGroup {
    pub fn new(targets: Vec<NodeId>) -> Self {
        Self { targets }
    }

    pub fn single(target: NodeId) -> Self {
        Self::new(vec![target])
    }
}

impl Executor for TargetGroup {
    fn targets(&self) -> Vec<NodeId> {
        self.targets.clone()
    }
}

/// Behaviour the scheduler needs from a graph vertex.
///
/// All methods take `&self`; a node that records build results uses interior
/// mutability. Methods may be called from worker threads (`build`,
/// `retrieve_from_cache`, `remove_retrieved`) while the coordinator reads
/// other nodes, hence `Send + Sync`.
pub trait Node: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Direct dependencies. May trigger a scan on first call.
    fn children(&self) -> anyhow::Result<Vec<NodeId>>;

    /// The action that builds this node. `this` is the node's own id.
    fn executor(&self, this: NodeId) -> Arc<dyn Executor> {
        Arc::new(TargetGroup::single(this))
    }

    /// Nodes modified as a by-product of building this one.
    fn side_effects(&self) -> Vec<NodeId> {
        Vec::new()
    }

    /// Nodes to build in place of this one, with an optional message to
    /// display when they are picked.
    fn alter_targets(&self) -> (Vec<NodeId>, Option<String>) {
        (Vec::new(), None)
    }

    /// Resolve an ambiguous node to its concrete counterpart.
    fn disambiguate(&self, this: NodeId) -> NodeId {
        this
    }

    /// Nodes without a builder are sources and never need executing.
    fn has_builder(&self) -> bool {
        true
    }

    fn always_build(&self) -> bool {
        false
    }

    fn is_up_to_date(&self) -> anyhow::Result<bool>;

    /// Hook run before the node's up-to-date check.
    fn make_ready(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn prepare(&self) -> anyhow::Result<()> {
        Ok(())
    }

    fn build(&self) -> anyhow::Result<()>;

    /// Try to satisfy the node from a cache. Returns true on a hit.
    fn retrieve_from_cache(&self) -> bool {
        false
    }

    /// Undo a cache retrieval when a co-target could not be retrieved.
    fn remove_retrieved(&self) -> std::io::Result<()> {
        Ok(())
    }

    /// Path shown in messages about this node's files.
    fn internal_path(&self) -> String {
        self.name().to_string()
    }

    fn push_to_cache(&self) {}

    /// Finalize build bookkeeping after a successful build.
    fn built(&self) {}

    /// Drop any implicit dependencies computed by an earlier scan.
    fn reset_implicit_deps(&self) {}

    /// Called once the node is known to be current, built or not.
    fn visited(&self) {}

    fn release_target_info(&self) {}

    fn postprocess(&self) {}
}
