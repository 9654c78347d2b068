// src/future/async_result.rs

use std::sync::Arc;

use tracing::debug;

use crate::dag::Task;
use crate::errors::FutureError;
use crate::exec::SchedulerHandle;
use crate::future::ResultCell;

/// A [`ResultCell`] paired with the task that fills it.
///
/// Retrieval is only legal once the task is done; it does not wait.
#[derive(Debug)]
pub struct AsyncResult<T> {
    result: ResultCell<T>,
    task: Task,
}

impl<T> AsyncResult<T> {
    pub fn new(result: ResultCell<T>, task: Task) -> Self {
        Self { result, task }
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn result(&self) -> &ResultCell<T> {
        &self.result
    }

    pub fn is_done(&self) -> bool {
        self.task.is_done()
    }
}

impl<T: Clone> AsyncResult<T> {
    pub fn get(&self) -> Result<T, FutureError> {
        if !self.task.is_done() {
            return Err(FutureError::TaskNotDone {
                task: self.task.label(),
            });
        }
        self.result.get()
    }
}

impl<T> Clone for AsyncResult<T> {
    fn clone(&self) -> Self {
        Self {
            result: self.result.clone(),
            task: self.task.clone(),
        }
    }
}

/// Wrap `work` in a task that is handed a fresh [`ResultCell`] to fill.
///
/// If `work` fails and left the cell empty, the failure is stored in the
/// cell too, so [`AsyncResult::get`] re-raises it.
pub fn wrap_async_task<T, F>(name: impl Into<String>, work: F) -> AsyncResult<T>
where
    T: Send + 'static,
    F: FnOnce(&SchedulerHandle, &ResultCell<T>) -> anyhow::Result<Vec<Task>> + Send + 'static,
{
    wrap_async_task_after(name, &[], work)
}

/// Like [`wrap_async_task`], with dependencies.
pub fn wrap_async_task_after<T, F>(
    name: impl Into<String>,
    dependencies: &[Task],
    work: F,
) -> AsyncResult<T>
where
    T: Send + 'static,
    F: FnOnce(&SchedulerHandle, &ResultCell<T>) -> anyhow::Result<Vec<Task>> + Send + 'static,
{
    let result = ResultCell::new();
    let sink = result.clone();

    let task = Task::named_shared(
        name,
        move |scheduler| match work(scheduler, &sink) {
            Ok(continuations) => Ok(continuations),
            Err(error) => {
                let error = Arc::new(error);
                if sink.set_shared_error(Arc::clone(&error)).is_err() {
                    debug!("work failed after filling its result");
                }
                Err(error)
            }
        },
        dependencies,
    );

    AsyncResult::new(result, task)
}

/// The tasks behind `results`, for use as a dependency list.
pub fn async_deps<T>(results: &[AsyncResult<T>]) -> Vec<Task> {
    results.iter().map(|r| r.task.clone()).collect()
}
