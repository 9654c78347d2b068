use std::sync::Arc;

use parking_lot::Mutex;
use taskgraph::{SchedulerHandle, Task};

/// Shared, ordered record of which tasks ran.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str) {
        self.entries.lock().push(name.to_string());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Position of `name` in the log, if it ran.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.lock().iter().position(|e| e == name)
    }

    /// Whether `before` was recorded strictly before `after`.
    pub fn ran_before(&self, before: &str, after: &str) -> bool {
        match (self.position(before), self.position(after)) {
            (Some(b), Some(a)) => b < a,
            _ => false,
        }
    }

    /// A named task that records itself and returns no continuations.
    pub fn task(&self, name: &str, dependencies: &[Task]) -> Task {
        let log = self.clone();
        let label = name.to_string();
        Task::named(
            name,
            move |_: &SchedulerHandle| {
                log.record(&label);
                Ok(Vec::new())
            },
            dependencies,
        )
    }

    /// A named task that records itself and fails if any of `checked` is not
    /// done when it runs.
    pub fn checking_task(&self, name: &str, checked: &[Task], dependencies: &[Task]) -> Task {
        let log = self.clone();
        let label = name.to_string();
        let checked = checked.to_vec();
        Task::named(
            name,
            move |_: &SchedulerHandle| {
                for dep in &checked {
                    anyhow::ensure!(dep.is_done(), "dependency {} not done", dep.label());
                }
                log.record(&label);
                Ok(Vec::new())
            },
            dependencies,
        )
    }
}
