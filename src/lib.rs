// src/lib.rs

//! Dynamic task graph with continuations and a thread-pool executor.
//!
//! A [`Task`] declares dependencies on other tasks. When it runs, its work
//! closure may return new tasks (continuations); these become extra
//! dependencies of everything already waiting on the task that returned
//! them, so the graph can grow while it executes. A [`Scheduler`] drains a ready-queue of
//! tasks whose dependencies are all done, either on a pool of worker threads
//! or, in manual mode, one step at a time on the caller's thread.
//!
//! ```no_run
//! use taskgraph::{Scheduler, Task};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = Scheduler::with_threads(2)?;
//! let fetch = Task::named("fetch", |_| Ok(vec![]), &[]);
//! let report = Task::named("report", |_| Ok(vec![]), &[fetch.clone()]);
//!
//! scheduler.schedule(&report)?;
//! scheduler.schedule(&fetch)?;
//! scheduler.wait_until_idle();
//! scheduler.join()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dag;
pub mod errors;
pub mod exec;
pub mod future;
pub mod logging;
pub mod types;

pub use crate::config::{ExecutionMode, SchedulerConfig};
pub use crate::dag::{GraphSnapshot, Readiness, Task, TaskId};
pub use crate::errors::{FutureError, SchedulerError, TaskError, TaskGraphError};
pub use crate::exec::{Scheduler, SchedulerHandle, TaskFailure};
pub use crate::future::{AsyncResult, ResultCell, async_deps, wrap_async_task};
pub use crate::types::{LogLevel, SchedulerState, TaskState};

/// Run `f` with a scheduler built from `config`, then wait until it is idle
/// and join it.
///
/// If `f` panics the scheduler's `Drop` performs the same shutdown.
pub fn run_scoped<T, F>(config: SchedulerConfig, f: F) -> Result<T, SchedulerError>
where
    F: FnOnce(&Scheduler) -> T,
{
    let scheduler = Scheduler::new(config)?;
    let output = f(&scheduler);
    scheduler.wait_until_idle();
    scheduler.join()?;
    Ok(output)
}
