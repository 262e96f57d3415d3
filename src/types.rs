// src/types.rs

use clap::ValueEnum;
use serde::Deserialize;

use crate::node::NodeId;

/// Order in which freshly discovered children are explored.
///
/// - `Declared`: children are built in the order they are listed
///   (default behaviour).
/// - `Reverse`: the last listed child is built first. Useful to shake out
///   missing dependency declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OrderPolicy {
    #[default]
    Declared,
    Reverse,
}

impl OrderPolicy {
    /// Reorder children before they are pushed onto the candidate stack.
    ///
    /// The stack pops from the end, and the walk has already reversed the
    /// list, so `Declared` leaves it alone.
    pub fn apply(self, nodes: Vec<NodeId>) -> Vec<NodeId> {
        match self {
            OrderPolicy::Declared => nodes,
            OrderPolicy::Reverse => {
                let mut nodes = nodes;
                nodes.reverse();
                nodes
            }
        }
    }
}
