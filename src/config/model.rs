// src/config/model.rs

use serde::Deserialize;

use crate::types::LogLevel;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [scheduler]
/// threads = 4
/// manual = false
/// thread_name = "taskgraph-worker"
///
/// [logging]
/// level = "debug"
/// ```
///
/// All sections are optional and have reasonable defaults. This is the raw,
/// unvalidated form; see [`ConfigFile`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub logging: LoggingSection,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>` (see
/// [`super::validate`]), so holding one means the scheduler section is
/// consistent.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerConfig,
    pub logging: LoggingSection,
    mode: ExecutionMode,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        scheduler: SchedulerConfig,
        logging: LoggingSection,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            scheduler,
            logging,
            mode,
        }
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.mode
    }
}

/// `[scheduler]` section, also the constructor argument of
/// [`Scheduler::new`](crate::exec::Scheduler::new).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads. `None` means one per available processor.
    ///
    /// Signed so that nonsensical values can be reported instead of failing
    /// deserialization.
    #[serde(default)]
    pub threads: Option<i64>,

    /// Run without background threads; the caller drives execution.
    #[serde(default)]
    pub manual: bool,

    /// Worker threads are named `<thread_name>-<index>`.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_thread_name() -> String {
    "taskgraph-worker".to_string()
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            threads: None,
            manual: false,
            thread_name: default_thread_name(),
        }
    }
}

impl SchedulerConfig {
    /// Threaded mode with a fixed number of workers.
    pub fn threads(n: usize) -> Self {
        Self {
            threads: Some(i64::try_from(n).unwrap_or(i64::MAX)),
            ..Self::default()
        }
    }

    /// Manual mode, no background threads.
    pub fn manual() -> Self {
        Self {
            threads: None,
            manual: true,
            ..Self::default()
        }
    }

    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

/// How a scheduler executes tasks, as derived from [`SchedulerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Threaded(usize),
    Manual,
}

/// `[logging]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSection {
    /// Overrides `TASKGRAPH_LOG` when set.
    #[serde(default)]
    pub level: Option<LogLevel>,
}

/// One worker per available processor, falling back to one.
pub fn default_thread_count() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
