// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Lifecycle of a task. Transitions are monotonic:
/// `Created -> (Waiting ->) Ready -> Executing -> Done`.
///
/// A task that is never scheduled stays `Created` even if all of its
/// dependencies complete; executing it directly is still allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskState {
    Created,
    /// Scheduled, but some dependencies are still pending.
    Waiting,
    /// Pushed onto a ready-queue.
    Ready,
    Executing,
    Done,
}

impl TaskState {
    pub fn is_done(self) -> bool {
        matches!(self, TaskState::Done)
    }
}

/// Lifecycle of a scheduler.
///
/// `Running -> Joining -> Stopped` or `Running -> Canceled -> Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running,
    Joining,
    Canceled,
    Stopped,
}

/// Log verbosity accepted by [`crate::logging::init_logging`] and the
/// `[logging]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(format!(
                "invalid log level: {other} (expected error, warn, info, debug or trace)"
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        };
        f.write_str(s)
    }
}
