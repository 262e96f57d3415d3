// src/dag/mod.rs

//! Node storage and graph searches.
//!
//! - [`graph`] is the arena holding every node plus the scheduler's
//!   per-node counters and wait lists.
//! - [`cycle`] finds cycles through the waiting-parent relation.

pub mod cycle;
pub mod graph;

pub use cycle::{find_cycle, render_cycle};
pub use graph::{Graph, Slot};
