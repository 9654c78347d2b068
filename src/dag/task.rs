// src/dag/task.rs

//! The task node: a unit of work plus its position in the dependency graph.
//!
//! A [`Task`] is a cheap, clonable handle. Edges are stored in both
//! directions (dependencies and dependants), each guarded by the owning
//! node's lock. No operation here ever holds two node locks at once:
//!
//! - Linking `D -> X` records `X` in `D` first, then asks `X` to accept `D`
//!   as a dependant. If `X` is already done it refuses and `D` forgets it
//!   again, so a dependency finished at registration time is never counted.
//! - When `X` finishes, continuations returned by its work are grafted onto
//!   every dependant *before* `X` is marked done and before any dependant is
//!   notified. Dependants registering while grafting is in progress are
//!   picked up by the next snapshot.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::dag::node::{NodeState, ReadyCallback, Readiness};
use crate::errors::TaskError;
use crate::exec::SchedulerHandle;
use crate::types::TaskState;

/// The work closure of a task. It receives a handle to the scheduler running
/// it (to submit further tasks) and returns the continuations to graft.
pub type Work = Box<dyn FnOnce(&SchedulerHandle) -> anyhow::Result<Vec<Task>> + Send + 'static>;

/// Work whose failure is already shared, so the same error can be stored on
/// the task and handed to other owners (e.g. a `ResultCell`).
type SharedWork =
    Box<dyn FnOnce(&SchedulerHandle) -> Result<Vec<Task>, Arc<anyhow::Error>> + Send + 'static>;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

struct TaskInner {
    id: TaskId,
    name: Option<String>,
    work: Mutex<Option<SharedWork>>,
    node: Mutex<NodeState>,
}

/// Shared handle to a task node.
///
/// Equality is identity: two handles are equal when they refer to the same
/// node.
#[derive(Clone)]
pub struct Task {
    inner: Arc<TaskInner>,
}

impl Task {
    /// Create a task and link it to `dependencies`.
    ///
    /// Dependencies that are already done are not recorded.
    pub fn new<F>(work: F, dependencies: &[Task]) -> Self
    where
        F: FnOnce(&SchedulerHandle) -> anyhow::Result<Vec<Task>> + Send + 'static,
    {
        Self::build(None, share_failure(Box::new(work)), dependencies)
    }

    /// Like [`Task::new`], with a debug name used in logs and errors.
    pub fn named<F>(name: impl Into<String>, work: F, dependencies: &[Task]) -> Self
    where
        F: FnOnce(&SchedulerHandle) -> anyhow::Result<Vec<Task>> + Send + 'static,
    {
        Self::build(Some(name.into()), share_failure(Box::new(work)), dependencies)
    }

    /// Like [`Task::named`], for work that reports an already shared error.
    pub(crate) fn named_shared<F>(name: impl Into<String>, work: F, dependencies: &[Task]) -> Self
    where
        F: FnOnce(&SchedulerHandle) -> Result<Vec<Task>, Arc<anyhow::Error>> + Send + 'static,
    {
        Self::build(Some(name.into()), Box::new(work), dependencies)
    }

    /// A task whose work does nothing.
    pub fn noop(dependencies: &[Task]) -> Self {
        Self::new(|_| Ok(Vec::new()), dependencies)
    }

    fn build(name: Option<String>, work: SharedWork, dependencies: &[Task]) -> Self {
        let task = Task {
            inner: Arc::new(TaskInner {
                id: TaskId::next(),
                name,
                work: Mutex::new(Some(work)),
                node: Mutex::new(NodeState::new()),
            }),
        };

        for dependency in dependencies {
            task.link_dependency(dependency);
        }

        trace!(
            task = %task.label(),
            pending = task.pending_dependencies(),
            "task created"
        );
        task
    }

    pub fn id(&self) -> TaskId {
        self.inner.id
    }

    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Debug name if set, otherwise the id.
    pub fn label(&self) -> String {
        match &self.inner.name {
            Some(name) => format!("{name}{}", self.inner.id),
            None => format!("task{}", self.inner.id),
        }
    }

    pub fn state(&self) -> TaskState {
        self.inner.node.lock().state
    }

    pub fn is_done(&self) -> bool {
        self.state().is_done()
    }

    /// Dependencies this task waits (or waited) on, including grafted
    /// continuations.
    pub fn dependencies(&self) -> Vec<Task> {
        self.inner.node.lock().dependencies.clone()
    }

    /// Tasks currently registered as waiting on this one. Empty once this
    /// task is done and has notified them; kept as long as it never runs.
    pub fn dependants(&self) -> Vec<Task> {
        self.inner.node.lock().dependants.clone()
    }

    pub fn dependencies_done(&self) -> usize {
        self.inner.node.lock().dependencies_done
    }

    pub fn pending_dependencies(&self) -> usize {
        self.inner.node.lock().pending()
    }

    /// Continuations returned by this task's work.
    pub fn continuations(&self) -> Vec<Task> {
        self.inner.node.lock().continuations.clone()
    }

    /// The error returned by this task's work, if it failed.
    pub fn failure(&self) -> Option<Arc<anyhow::Error>> {
        self.inner.node.lock().failure.clone()
    }

    /// Run the work closure.
    ///
    /// Fails if the task is done, currently executing, or still has pending
    /// dependencies. A failing work closure still completes the task (no
    /// continuations, dependants notified) and is reported as
    /// [`TaskError::WorkFailed`].
    pub fn execute(&self, scheduler: &SchedulerHandle) -> Result<(), TaskError> {
        {
            let mut node = self.inner.node.lock();
            match node.state {
                TaskState::Done => {
                    return Err(TaskError::AlreadyExecuted { task: self.label() });
                }
                TaskState::Executing => {
                    return Err(TaskError::AlreadyExecuting { task: self.label() });
                }
                _ => {}
            }
            if !node.all_dependencies_done() {
                return Err(TaskError::DependenciesNotSatisfied {
                    task: self.label(),
                    done: node.dependencies_done,
                    total: node.dependencies.len(),
                });
            }
            node.state = TaskState::Executing;
        }

        let work = self
            .inner
            .work
            .lock()
            .take()
            .ok_or_else(|| TaskError::AlreadyExecuted { task: self.label() })?;

        debug!(task = %self.label(), "executing task");

        let (mut continuations, failure) = match work(scheduler) {
            Ok(continuations) => (continuations, None),
            Err(e) => (Vec::new(), Some(e)),
        };
        continuations.retain(|continuation| {
            if continuation == self {
                warn!(task = %self.label(), "ignoring task returned as its own continuation");
                return false;
            }
            true
        });

        let dependants = self.graft_and_complete(continuations, failure.clone());

        for dependant in &dependants {
            dependant.notify_dependency_done();
        }

        debug!(
            task = %self.label(),
            notified = dependants.len(),
            "task done"
        );

        match failure {
            Some(error) => Err(TaskError::WorkFailed {
                task: self.label(),
                error,
            }),
            None => Ok(()),
        }
    }

    /// Graft `continuations` onto every dependant, then mark this task done
    /// and take the dependant list for notification.
    ///
    /// The done transition happens in the same critical section that observes
    /// "no dependant left ungrafted", so a dependant either got every
    /// continuation or registers after this task is done (and is refused).
    fn graft_and_complete(
        &self,
        continuations: Vec<Task>,
        failure: Option<Arc<anyhow::Error>>,
    ) -> Vec<Task> {
        let mut grafted = 0;

        loop {
            let fresh = {
                let mut node = self.inner.node.lock();
                if grafted == node.dependants.len() {
                    node.state = TaskState::Done;
                    node.failure = failure;
                    node.continuations = continuations;
                    return std::mem::take(&mut node.dependants);
                }
                node.dependants[grafted..].to_vec()
            };
            grafted += fresh.len();

            if continuations.is_empty() {
                continue;
            }
            for dependant in &fresh {
                debug!(
                    task = %self.label(),
                    dependant = %dependant.label(),
                    continuations = continuations.len(),
                    "grafting continuations"
                );
                for continuation in &continuations {
                    dependant.link_dependency(continuation);
                }
            }
        }
    }

    /// Make `dependency` a dependency of `self`. Returns `true` if it was
    /// recorded, `false` if it was already done (and so is not waited on).
    fn link_dependency(&self, dependency: &Task) -> bool {
        if dependency == self {
            warn!(task = %self.label(), "ignoring self-dependency");
            return false;
        }

        self.inner.node.lock().dependencies.push(dependency.clone());

        if dependency.try_add_dependant(self) {
            trace!(
                task = %self.label(),
                dependency = %dependency.label(),
                "linked dependency"
            );
            return true;
        }

        let callback = {
            let mut node = self.inner.node.lock();
            node.forget_dependency(dependency);
            node.take_ready_callback()
        };
        if let Some(callback) = callback {
            callback(self.clone());
        }
        false
    }

    /// Register `dependant` unless this task is already done.
    fn try_add_dependant(&self, dependant: &Task) -> bool {
        let mut node = self.inner.node.lock();
        if node.state.is_done() {
            return false;
        }
        node.dependants.push(dependant.clone());
        true
    }

    /// Called by a dependency once it is done.
    pub(crate) fn notify_dependency_done(&self) {
        let callback = {
            let mut node = self.inner.node.lock();
            node.record_dependency_done();
            node.take_ready_callback()
        };

        if let Some(callback) = callback {
            debug!(task = %self.label(), "dependencies satisfied; task ready");
            callback(self.clone());
        }
    }

    /// Store `callback` to be run once all pending dependencies are done.
    ///
    /// Returns [`Readiness::ReadyNow`] without storing the callback if
    /// nothing is pending; the caller is then responsible for enqueueing.
    pub fn register_ready_callback<F>(&self, callback: F) -> Result<Readiness, TaskError>
    where
        F: FnOnce(Task) + Send + 'static,
    {
        self.register_boxed(Box::new(callback))
    }

    fn register_boxed(&self, callback: ReadyCallback) -> Result<Readiness, TaskError> {
        let mut node = self.inner.node.lock();
        match node.state {
            TaskState::Created => {}
            TaskState::Done => return Err(TaskError::AlreadyExecuted { task: self.label() }),
            _ => return Err(TaskError::AlreadyScheduled { task: self.label() }),
        }

        if node.all_dependencies_done() {
            node.state = TaskState::Ready;
            Ok(Readiness::ReadyNow)
        } else {
            node.state = TaskState::Waiting;
            node.ready_callback = Some(callback);
            Ok(Readiness::Deferred)
        }
    }
}

fn share_failure(work: Work) -> SharedWork {
    Box::new(move |scheduler| work(scheduler).map_err(Arc::new))
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Task {}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.inner.node.lock();
        f.debug_struct("Task")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .field("state", &node.state)
            .field("dependencies", &node.dependencies.len())
            .field("dependencies_done", &node.dependencies_done)
            .field("dependants", &node.dependants.len())
            .finish()
    }
}
