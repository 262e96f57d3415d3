// src/node/state.rs

use std::fmt;

/// Scheduling state of a node.
///
/// The variants are ordered: everything above [`NodeState::Executing`] is a
/// finished state, and the walk treats any child at or below `Executing` as
/// not ready yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum NodeState {
    #[default]
    NoState = 0,
    Pending = 1,
    Executing = 2,
    UpToDate = 3,
    Executed = 4,
    Failed = 5,
}

impl NodeState {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeState::NoState => "no_state",
            NodeState::Pending => "pending",
            NodeState::Executing => "executing",
            NodeState::UpToDate => "up_to_date",
            NodeState::Executed => "executed",
            NodeState::Failed => "failed",
        }
    }

    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            1 => NodeState::Pending,
            2 => NodeState::Executing,
            3 => NodeState::UpToDate,
            4 => NodeState::Executed,
            5 => NodeState::Failed,
            _ => NodeState::NoState,
        }
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}
