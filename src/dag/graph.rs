// src/dag/graph.rs

//! Point-in-time view of a task graph for diagnostics.
//!
//! The live graph has no global index, so a snapshot walks dependency edges
//! from a set of root tasks. Edges point from dependency to dependant, as in
//! a build order. A cycle in the live graph is never detected by the
//! scheduler itself; the tasks on it simply never become ready.

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::dag::task::{Task, TaskId};
use crate::errors::{Result, TaskGraphError};
use crate::types::TaskState;

#[derive(Debug, Clone)]
struct NodeInfo {
    label: String,
    state: TaskState,
}

#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    graph: DiGraphMap<TaskId, ()>,
    nodes: BTreeMap<TaskId, NodeInfo>,
}

impl GraphSnapshot {
    /// Collect `roots` and everything they transitively depend on.
    pub fn collect(roots: &[Task]) -> Self {
        let mut graph = DiGraphMap::new();
        let mut nodes = BTreeMap::new();
        let mut seen = HashSet::new();
        let mut stack: Vec<Task> = roots.to_vec();

        while let Some(task) = stack.pop() {
            if !seen.insert(task.id()) {
                continue;
            }
            graph.add_node(task.id());
            nodes.insert(
                task.id(),
                NodeInfo {
                    label: task.label(),
                    state: task.state(),
                },
            );

            for dependency in task.dependencies() {
                graph.add_edge(dependency.id(), task.id(), ());
                stack.push(dependency);
            }
        }

        Self { graph, nodes }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn state_of(&self, id: TaskId) -> Option<TaskState> {
        self.nodes.get(&id).map(|n| n.state)
    }

    /// Direct dependencies of `id` within the snapshot.
    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.graph
            .neighbors_directed(id, petgraph::Direction::Incoming)
            .collect()
    }

    /// Dependency-first order of all tasks in the snapshot.
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        toposort(&self.graph, None).map_err(|cycle| {
            let id = cycle.node_id();
            let label = self
                .nodes
                .get(&id)
                .map(|n| n.label.clone())
                .unwrap_or_else(|| id.to_string());
            TaskGraphError::DagCycle(format!("cycle detected involving task '{label}'"))
        })
    }

    /// Labels of tasks that have not completed, in id order.
    pub fn unfinished(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| !n.state.is_done())
            .map(|n| n.label.clone())
            .collect()
    }
}
