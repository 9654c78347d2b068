// src/errors.rs

//! Crate-wide error types.
//!
//! Misuse of the graph or future API is reported synchronously at the call
//! that violated the contract. Failures raised inside work closures are
//! stored on the task and surfaced through [`TaskError::WorkFailed`].

use std::sync::Arc;

use thiserror::Error;

use crate::types::SchedulerState;

/// Protocol violations and work failures on a single task.
#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("task {task} was already executed")]
    AlreadyExecuted { task: String },

    #[error("task {task} is already being executed")]
    AlreadyExecuting { task: String },

    #[error("task {task} has unsatisfied dependencies ({done}/{total} done)")]
    DependenciesNotSatisfied {
        task: String,
        done: usize,
        total: usize,
    },

    #[error("task {task} was already scheduled")]
    AlreadyScheduled { task: String },

    #[error("task {task} failed: {error:#}")]
    WorkFailed {
        task: String,
        error: Arc<anyhow::Error>,
    },
}

/// Misuse of [`ResultCell`](crate::future::ResultCell) and
/// [`AsyncResult`](crate::future::AsyncResult), or a stored failure.
#[derive(Error, Debug, Clone)]
pub enum FutureError {
    #[error("result was already set")]
    AlreadySet,

    #[error("result is not ready")]
    NotReady,

    #[error("task {task} is not done yet")]
    TaskNotDone { task: String },

    #[error("{0:#}")]
    Failed(Arc<anyhow::Error>),
}

#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("invalid number of worker threads: {0} (expected >= 1)")]
    InvalidThreadCount(i64),

    #[error("manual execution requires zero worker threads (got {0})")]
    ManualWithThreads(i64),

    #[error("worker thread name must not be empty")]
    EmptyThreadName,

    #[error("manual_step is only available in manual mode")]
    NotManual,

    #[error("scheduler is not running (state: {0:?})")]
    NotRunning(SchedulerState),

    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("{count} worker thread(s) panicked")]
    WorkerPanicked { count: usize },

    #[error(transparent)]
    Task(#[from] TaskError),
}

#[derive(Error, Debug)]
pub enum TaskGraphError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Cycle detected in task graph: {0}")]
    DagCycle(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Future(#[from] FutureError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskGraphError>;
