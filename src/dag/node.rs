// src/dag/node.rs

//! Per-node bookkeeping guarded by the node's own lock.
//!
//! Everything in here is plain data plus small state transitions; the
//! cross-node protocol (linking, grafting, notifying) lives in
//! [`super::task`] and never holds more than one `NodeState` lock at a time.

use std::sync::Arc;

use crate::dag::task::Task;
use crate::types::TaskState;

/// Callback run exactly once when a scheduled task becomes ready.
pub(crate) type ReadyCallback = Box<dyn FnOnce(Task) + Send + 'static>;

/// What [`Task::register_ready_callback`](super::Task::register_ready_callback)
/// decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No pending dependencies: the caller must enqueue the task itself.
    ReadyNow,
    /// The callback was stored and will fire once the last pending
    /// dependency completes.
    Deferred,
}

pub(crate) struct NodeState {
    pub state: TaskState,
    /// Dependencies that were not yet done when they were linked.
    pub dependencies: Vec<Task>,
    /// Tasks waiting on this one. Held strongly, since a scheduled dependant
    /// may have no other owner; released once they have been notified. If
    /// this task never runs, the pair with each dependant stays alive.
    pub dependants: Vec<Task>,
    pub dependencies_done: usize,
    pub continuations: Vec<Task>,
    pub ready_callback: Option<ReadyCallback>,
    pub failure: Option<Arc<anyhow::Error>>,
}

impl NodeState {
    pub fn new() -> Self {
        Self {
            state: TaskState::Created,
            dependencies: Vec::new(),
            dependants: Vec::new(),
            dependencies_done: 0,
            continuations: Vec::new(),
            ready_callback: None,
            failure: None,
        }
    }

    pub fn all_dependencies_done(&self) -> bool {
        self.dependencies_done == self.dependencies.len()
    }

    pub fn pending(&self) -> usize {
        self.dependencies.len() - self.dependencies_done
    }

    /// Remove the most recently linked occurrence of `dependency`.
    pub fn forget_dependency(&mut self, dependency: &Task) -> bool {
        match self.dependencies.iter().rposition(|d| d == dependency) {
            Some(pos) => {
                self.dependencies.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Record one completed dependency.
    pub fn record_dependency_done(&mut self) {
        debug_assert!(
            self.dependencies_done < self.dependencies.len(),
            "more completions than dependencies"
        );
        self.dependencies_done += 1;
    }

    /// If this node is waiting and now has nothing pending, mark it ready and
    /// hand back the stored callback for the caller to run outside the lock.
    pub fn take_ready_callback(&mut self) -> Option<ReadyCallback> {
        if self.state == TaskState::Waiting && self.all_dependencies_done() {
            self.state = TaskState::Ready;
            return Some(self.ready_callback.take().unwrap_or_else(|| Box::new(|_| {})));
        }
        None
    }
}
