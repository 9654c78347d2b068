// src/config/mod.rs

//! Scheduler configuration.
//!
//! Constructor arguments are the primary interface; the same settings can
//! also be read from a TOML file.
//!
//! - `model.rs`: the TOML-backed data model.
//! - `loader.rs`: reading and parsing.
//! - `validate.rs`: rejecting inconsistent thread/manual settings.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str};
pub use model::{
    ConfigFile, ExecutionMode, LoggingSection, RawConfigFile, SchedulerConfig,
    default_thread_count,
};
