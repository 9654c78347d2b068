// src/future/result.rs

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::errors::FutureError;

enum Slot<T> {
    Empty,
    Fulfilled(T),
    Failed(Arc<anyhow::Error>),
}

/// One-shot value/error container.
///
/// Clones share the same slot, so a work closure can fill a cell that the
/// submitting code reads later. The slot can be set exactly once.
/// Retrieval never blocks: it fails with [`FutureError::NotReady`] until a
/// setter ran.
pub struct ResultCell<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> ResultCell<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Empty)),
        }
    }

    pub fn set_value(&self, value: T) -> Result<(), FutureError> {
        self.fill(Slot::Fulfilled(value))
    }

    pub fn set_error(&self, error: impl Into<anyhow::Error>) -> Result<(), FutureError> {
        self.fill(Slot::Failed(Arc::new(error.into())))
    }

    pub(crate) fn set_shared_error(&self, error: Arc<anyhow::Error>) -> Result<(), FutureError> {
        self.fill(Slot::Failed(error))
    }

    fn fill(&self, value: Slot<T>) -> Result<(), FutureError> {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Empty) {
            return Err(FutureError::AlreadySet);
        }
        *slot = value;
        Ok(())
    }

    /// True once either setter succeeded.
    pub fn is_set(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Empty)
    }
}

impl<T: Clone> ResultCell<T> {
    /// The stored value, or the stored error as [`FutureError::Failed`].
    pub fn get(&self) -> Result<T, FutureError> {
        match &*self.slot.lock() {
            Slot::Empty => Err(FutureError::NotReady),
            Slot::Fulfilled(value) => Ok(value.clone()),
            Slot::Failed(error) => Err(FutureError::Failed(Arc::clone(error))),
        }
    }
}

impl<T> Clone for ResultCell<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> Default for ResultCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for ResultCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.lock() {
            Slot::Empty => "empty",
            Slot::Fulfilled(_) => "fulfilled",
            Slot::Failed(_) => "failed",
        };
        f.debug_struct("ResultCell").field("state", &state).finish()
    }
}
