// src/exec/queue.rs

//! Ready-queue shared by the scheduler and its workers.
//!
//! A `crossbeam-channel` MPMC channel carries ready tasks plus wake-up
//! sentinels used for shutdown. Workers block on `recv` instead of polling.
//!
//! Next to the channel the queue tracks how many pushed tasks have not been
//! finished yet, which gives [`ReadyQueue::wait_idle`] its "everything pushed
//! so far has been processed" barrier.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::dag::Task;

/// Item travelling through the ready-queue.
#[derive(Debug)]
pub enum Job {
    Run(Task),
    /// Wakes a blocked worker so it can observe shutdown flags.
    Wake,
}

#[derive(Debug)]
pub struct ReadyQueue {
    tx: Sender<Job>,
    rx: Receiver<Job>,
    /// Run jobs sitting in the channel.
    queued: AtomicUsize,
    /// Run jobs pushed but not yet finished (queued or in flight).
    outstanding: Mutex<usize>,
    idle: Condvar,
    closed: AtomicBool,
}

impl ReadyQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            queued: AtomicUsize::new(0),
            outstanding: Mutex::new(0),
            idle: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Enqueue a ready task. Returns `false` (dropping the task) once the
    /// queue has been closed by a cancellation or a finished join.
    ///
    /// The closed check and the send happen under the `outstanding` lock, so
    /// once [`ReadyQueue::close`] returns every accepted task is already in
    /// the channel.
    pub fn push(&self, task: Task) -> bool {
        let mut outstanding = self.outstanding.lock();
        if self.closed.load(Ordering::Acquire) {
            debug!(task = %task.label(), "queue closed; dropping ready task");
            return false;
        }

        *outstanding += 1;
        self.queued.fetch_add(1, Ordering::AcqRel);
        trace!(task = %task.label(), "enqueue");

        // Both ends live in `self`, so the channel cannot be disconnected.
        if let Err(err) = self.tx.send(Job::Run(task)) {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            *outstanding -= 1;
            debug!(?err, "ready-queue send failed");
            return false;
        }
        true
    }

    pub fn push_wake(&self) {
        let _ = self.tx.send(Job::Wake);
    }

    /// Block until a job is available.
    pub fn pop(&self) -> Option<Job> {
        self.rx.recv().ok().map(|job| self.popped(job))
    }

    /// Take a job if one is immediately available.
    pub fn try_pop(&self) -> Option<Job> {
        match self.rx.try_recv() {
            Ok(job) => Some(self.popped(job)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn popped(&self, job: Job) -> Job {
        if matches!(job, Job::Run(_)) {
            self.queued.fetch_sub(1, Ordering::AcqRel);
        }
        job
    }

    /// Number of ready tasks waiting in the channel. Wake sentinels are not
    /// counted.
    pub fn queued(&self) -> usize {
        self.queued.load(Ordering::Acquire)
    }

    /// Number of pushed tasks not yet finished (queued or in flight).
    pub fn outstanding(&self) -> usize {
        *self.outstanding.lock()
    }

    /// Guard that marks one popped task as finished when dropped, including
    /// during unwinding.
    pub fn completion_guard(&self) -> CompletionGuard<'_> {
        CompletionGuard { queue: self }
    }

    fn finish_one(&self) {
        let mut outstanding = self.outstanding.lock();
        *outstanding = outstanding.saturating_sub(1);
        if *outstanding == 0 {
            self.idle.notify_all();
        }
    }

    /// Block until every task pushed so far has been finished.
    pub fn wait_idle(&self) {
        let mut outstanding = self.outstanding.lock();
        while *outstanding > 0 {
            self.idle.wait(&mut outstanding);
        }
    }

    /// Refuse further pushes.
    pub fn close(&self) {
        let _outstanding = self.outstanding.lock();
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Drop everything still queued without running it. Returns how many
    /// tasks were discarded.
    pub fn discard_remaining(&self) -> usize {
        let mut discarded = 0;
        while let Some(job) = self.try_pop() {
            if let Job::Run(task) = job {
                debug!(task = %task.label(), "discarding queued task");
                self.finish_one();
                discarded += 1;
            }
        }
        discarded
    }
}

impl Default for ReadyQueue {
    fn default() -> Self {
        Self::new()
    }
}

pub struct CompletionGuard<'a> {
    queue: &'a ReadyQueue,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        self.queue.finish_one();
    }
}
