// src/exec/mod.rs

//! Execution layer.
//!
//! - `queue` is the ready-queue shared by all workers, with an idle
//!   barrier.
//! - [`scheduler`] owns the queue and the worker threads, and implements the
//!   threaded, manual, join and cancel modes.
//! - `worker` is the loop each background thread runs.

mod queue;
pub mod scheduler;
mod worker;

pub use scheduler::{Scheduler, SchedulerHandle, TaskFailure};
