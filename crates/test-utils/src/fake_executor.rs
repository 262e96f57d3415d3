use std::sync::{Arc, Mutex};

use taskmaster::node::{Executor, NodeId};

use crate::fake_node::Failure;

/// Executor handed out by [`FakeNode`](crate::FakeNode).
///
/// The lists are shared with the node, so changing the node's targets after
/// the executor was created is visible through it.
#[derive(Debug, Clone)]
pub struct FakeExecutor {
    pub(crate) this: NodeId,
    pub(crate) targets: Arc<Mutex<Vec<NodeId>>>,
    pub(crate) prerequisites: Arc<Mutex<Vec<NodeId>>>,
    pub(crate) action_side_effects: Arc<Mutex<Vec<NodeId>>>,
    pub(crate) prepare_failure: Arc<Mutex<Option<Failure>>>,
}

impl Executor for FakeExecutor {
    fn prepare(&self) -> anyhow::Result<()> {
        match self.prepare_failure.lock().unwrap().as_ref() {
            Some(failure) => Err(failure.to_error()),
            None => Ok(()),
        }
    }

    /// The node alone unless targets were set explicitly.
    fn targets(&self) -> Vec<NodeId> {
        let targets = self.targets.lock().unwrap();
        if targets.is_empty() {
            vec![self.this]
        } else {
            targets.clone()
        }
    }

    fn prerequisites(&self) -> Vec<NodeId> {
        self.prerequisites.lock().unwrap().clone()
    }

    fn action_side_effects(&self) -> Vec<NodeId> {
        self.action_side_effects.lock().unwrap().clone()
    }
}
