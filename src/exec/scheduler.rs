// src/exec/scheduler.rs

//! The scheduler: owns the ready-queue and the worker threads.
//!
//! Two execution modes exist:
//! - threaded: `n` background workers pop ready tasks and execute them;
//! - manual: no background threads, the caller drives execution one task at
//!   a time with [`Scheduler::manual_step`].
//!
//! The scheduler is a scoped resource. Dropping it while it is still running
//! waits until the queue is idle and then joins the workers.

use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::{ExecutionMode, SchedulerConfig};
use crate::dag::{Readiness, Task, TaskId};
use crate::errors::{SchedulerError, TaskError};
use crate::exec::queue::{Job, ReadyQueue};
use crate::exec::worker::spawn_worker;
use crate::types::SchedulerState;

/// A task execution that returned an error, as recorded by the scheduler.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub task: TaskId,
    pub label: String,
    pub error: TaskError,
}

#[derive(Debug)]
pub(crate) struct Shared {
    pub(crate) queue: ReadyQueue,
    state: Mutex<SchedulerState>,
    joining: AtomicBool,
    canceled: AtomicBool,
    manual: bool,
    failures: Mutex<Vec<TaskFailure>>,
}

impl Shared {
    pub(crate) fn is_joining(&self) -> bool {
        self.joining.load(Ordering::Acquire)
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// Cheap, clonable handle to a scheduler.
///
/// This is what work closures receive; it can submit more tasks but cannot
/// stop the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    shared: Arc<Shared>,
}

impl SchedulerHandle {
    /// Submit a task.
    ///
    /// If the task has no pending dependencies it is queued immediately,
    /// otherwise it is queued by its last dependency to complete. Submitting
    /// the same task twice fails with [`TaskError::AlreadyScheduled`].
    pub fn schedule(&self, task: &Task) -> Result<(), SchedulerError> {
        let state = self.state();
        if matches!(state, SchedulerState::Canceled | SchedulerState::Stopped) {
            return Err(SchedulerError::NotRunning(state));
        }

        let shared: Weak<Shared> = Arc::downgrade(&self.shared);
        let readiness = task.register_ready_callback(move |ready| match shared.upgrade() {
            Some(shared) => {
                shared.queue.push(ready);
            }
            None => debug!(task = %ready.label(), "scheduler gone; ready task dropped"),
        })?;

        match readiness {
            Readiness::ReadyNow => {
                debug!(task = %task.label(), "scheduled; ready now");
                self.shared.queue.push(task.clone());
            }
            Readiness::Deferred => {
                debug!(
                    task = %task.label(),
                    pending = task.pending_dependencies(),
                    "scheduled; waiting on dependencies"
                );
            }
        }
        Ok(())
    }

    pub fn state(&self) -> SchedulerState {
        *self.shared.state.lock()
    }

    pub fn is_manual(&self) -> bool {
        self.shared.manual
    }

    pub(crate) fn shared(&self) -> &Shared {
        &self.shared
    }

    /// Execute a popped task, recording any error.
    pub(crate) fn run_task(&self, task: Task) {
        if let Err(err) = task.execute(self) {
            error!(task = %task.label(), error = %err, "task execution failed");
            self.shared.failures.lock().push(TaskFailure {
                task: task.id(),
                label: task.label(),
                error: err,
            });
        }
    }
}

pub struct Scheduler {
    handle: SchedulerHandle,
    workers: Mutex<Vec<JoinHandle<()>>>,
    thread_count: usize,
}

impl Scheduler {
    /// Build a scheduler from a configuration, spawning its workers.
    ///
    /// Rejects misconfiguration (non-positive thread count, or manual mode
    /// combined with worker threads).
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        let mode = config.validate()?;
        let (thread_count, manual) = match mode {
            ExecutionMode::Threaded(n) => (n, false),
            ExecutionMode::Manual => (0, true),
        };

        let handle = SchedulerHandle {
            shared: Arc::new(Shared {
                queue: ReadyQueue::new(),
                state: Mutex::new(SchedulerState::Running),
                joining: AtomicBool::new(false),
                canceled: AtomicBool::new(false),
                manual,
                failures: Mutex::new(Vec::new()),
            }),
        };

        let scheduler = Scheduler {
            handle,
            workers: Mutex::new(Vec::with_capacity(thread_count)),
            thread_count,
        };

        for index in 0..thread_count {
            let worker = spawn_worker(scheduler.handle.clone(), index, &config.thread_name)?;
            scheduler.workers.lock().push(worker);
        }

        info!(threads = thread_count, manual, "scheduler started");
        Ok(scheduler)
    }

    /// Threaded scheduler with `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, SchedulerError> {
        Self::new(SchedulerConfig::threads(threads))
    }

    /// Threaded scheduler with one worker per available processor.
    pub fn with_default_threads() -> Result<Self, SchedulerError> {
        Self::new(SchedulerConfig::default())
    }

    /// Scheduler without background threads, driven by
    /// [`Scheduler::manual_step`].
    pub fn manual() -> Result<Self, SchedulerError> {
        Self::new(SchedulerConfig::manual())
    }

    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    pub fn schedule(&self, task: &Task) -> Result<(), SchedulerError> {
        self.handle.schedule(task)
    }

    pub fn state(&self) -> SchedulerState {
        self.handle.state()
    }

    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    pub fn is_manual(&self) -> bool {
        self.handle.is_manual()
    }

    /// Ready tasks currently queued.
    pub fn queued(&self) -> usize {
        self.handle.shared().queue.queued()
    }

    /// Failures recorded since the last call.
    pub fn take_failures(&self) -> Vec<TaskFailure> {
        std::mem::take(&mut *self.handle.shared().failures.lock())
    }

    /// Execute at most one ready task on the calling thread.
    ///
    /// Returns `Ok(false)` if the queue was empty. Only valid in manual mode.
    pub fn manual_step(&self) -> Result<bool, SchedulerError> {
        if !self.is_manual() {
            return Err(SchedulerError::NotManual);
        }

        let shared = self.handle.shared();
        while let Some(job) = shared.queue.try_pop() {
            let Job::Run(task) = job else {
                continue;
            };
            let _done = shared.queue.completion_guard();
            if shared.is_canceled() {
                return Ok(false);
            }
            self.handle.run_task(task);
            return Ok(true);
        }
        Ok(false)
    }

    /// Block until every task pushed so far has been processed, without
    /// stopping the workers.
    ///
    /// In manual mode the calling thread is the only worker, so this drains
    /// the queue by stepping. Must not be called from inside a work closure
    /// in threaded mode.
    pub fn wait_until_idle(&self) {
        if self.is_manual() {
            loop {
                match self.manual_step() {
                    Ok(true) => continue,
                    Ok(false) | Err(_) => break,
                }
            }
            return;
        }
        self.handle.shared().queue.wait_idle();
    }

    /// Stop the workers once the remaining queued work has drained.
    ///
    /// In threaded mode, tasks that become ready after the workers exited
    /// are dropped instead of queued. Idempotent; a second call after the
    /// scheduler stopped is a no-op.
    pub fn join(&self) -> Result<(), SchedulerError> {
        {
            let mut state = self.handle.shared.state.lock();
            match *state {
                SchedulerState::Stopped => return Ok(()),
                SchedulerState::Running => *state = SchedulerState::Joining,
                SchedulerState::Joining | SchedulerState::Canceled => {}
            }
        }
        self.shutdown()
    }

    /// Stop the workers without running the tasks still queued.
    ///
    /// Task bodies already running are not interrupted.
    pub fn cancel(&self) -> Result<(), SchedulerError> {
        {
            let shared = self.handle.shared();
            let mut state = shared.state.lock();
            if *state == SchedulerState::Stopped {
                return Ok(());
            }
            // Flags first: anyone observing `Canceled` also sees them.
            shared.canceled.store(true, Ordering::Release);
            shared.queue.close();
            *state = SchedulerState::Canceled;
        }
        info!("scheduler canceled");

        self.shutdown()
    }

    fn shutdown(&self) -> Result<(), SchedulerError> {
        let shared = self.handle.shared();
        shared.joining.store(true, Ordering::Release);

        let workers = std::mem::take(&mut *self.workers.lock());
        for _ in 0..workers.len() {
            shared.queue.push_wake();
        }

        let mut panicked = 0;
        for worker in workers {
            if worker.join().is_err() {
                panicked += 1;
            }
        }

        // With no worker left, tasks becoming ready from now on could never
        // run. Manual mode keeps what is queued for `manual_step`.
        if !shared.manual {
            shared.queue.close();
        }
        if shared.is_canceled() || !shared.manual {
            let discarded = shared.queue.discard_remaining();
            if discarded > 0 {
                info!(discarded, "discarded queued tasks on shutdown");
            }
        }

        *shared.state.lock() = SchedulerState::Stopped;
        info!(panicked, "scheduler stopped");

        if panicked > 0 {
            return Err(SchedulerError::WorkerPanicked { count: panicked });
        }
        Ok(())
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        if self.state() != SchedulerState::Running {
            return;
        }
        self.wait_until_idle();
        if let Err(err) = self.join() {
            warn!(error = %err, "scheduler shutdown on drop reported an error");
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state())
            .field("threads", &self.thread_count)
            .field("manual", &self.is_manual())
            .finish()
    }
}
