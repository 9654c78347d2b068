// src/config/validate.rs

use tracing::debug;

use crate::config::model::{
    ConfigFile, ExecutionMode, RawConfigFile, SchedulerConfig, default_thread_count,
};
use crate::errors::{SchedulerError, TaskGraphError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskGraphError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let mode = raw.scheduler.validate()?;
        Ok(ConfigFile::new_unchecked(raw.scheduler, raw.logging, mode))
    }
}

impl SchedulerConfig {
    /// Check the combination of `threads` and `manual` and resolve the
    /// effective execution mode.
    ///
    /// - manual mode allows `threads` to be absent or zero;
    /// - threaded mode needs `threads >= 1`, or absent for the default.
    pub fn validate(&self) -> Result<ExecutionMode, SchedulerError> {
        if self.thread_name.trim().is_empty() {
            return Err(SchedulerError::EmptyThreadName);
        }

        let mode = match (self.manual, self.threads) {
            (true, None) | (true, Some(0)) => ExecutionMode::Manual,
            (true, Some(n)) => return Err(SchedulerError::ManualWithThreads(n)),
            (false, None) => ExecutionMode::Threaded(default_thread_count()),
            (false, Some(n)) if n >= 1 => {
                let n = usize::try_from(n).map_err(|_| SchedulerError::InvalidThreadCount(n))?;
                ExecutionMode::Threaded(n)
            }
            (false, Some(n)) => return Err(SchedulerError::InvalidThreadCount(n)),
        };

        debug!(?mode, "scheduler config validated");
        Ok(mode)
    }
}
