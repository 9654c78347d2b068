// src/exec/worker.rs

//! Worker thread loop.

use std::io;
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

use crate::exec::queue::Job;
use crate::exec::scheduler::SchedulerHandle;

/// Spawn worker `index`, named `<name>-<index>`.
pub(crate) fn spawn_worker(
    handle: SchedulerHandle,
    index: usize,
    name: &str,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("{name}-{index}"))
        .spawn(move || worker_loop(handle, index))
}

/// Pop and execute ready tasks until shutdown.
///
/// - canceled: exit after the current task; anything popped later is
///   discarded.
/// - joining: a `Wake` exits the worker once no ready task is queued,
///   otherwise the sentinel goes back to the end of the queue so the
///   remaining work drains first. Each live worker owns exactly one `Wake`.
fn worker_loop(handle: SchedulerHandle, index: usize) {
    debug!(worker = index, "worker started");
    let shared = handle.shared();

    while let Some(job) = shared.queue.pop() {
        match job {
            Job::Run(task) => {
                let _done = shared.queue.completion_guard();
                if shared.is_canceled() {
                    trace!(worker = index, task = %task.label(), "canceled; not executing");
                    break;
                }
                handle.run_task(task);
            }
            Job::Wake => {
                if shared.is_canceled() {
                    break;
                }
                if shared.is_joining() {
                    if shared.queue.queued() == 0 {
                        break;
                    }
                    shared.queue.push_wake();
                }
            }
        }

        if shared.is_canceled() {
            break;
        }
    }

    debug!(worker = index, "worker exiting");
}
