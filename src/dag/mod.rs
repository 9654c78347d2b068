// src/dag/mod.rs

//! Task graph.
//!
//! - [`task`] holds the task node, its lifecycle and the linking, grafting
//!   and notification protocol between nodes.
//! - [`node`] is the per-node bookkeeping guarded by each node's lock.
//! - [`graph`] builds diagnostic snapshots (topological order, cycles).

pub mod graph;
mod node;
pub mod task;

pub use graph::GraphSnapshot;
pub use node::Readiness;
pub use task::{Task, TaskId, Work};
