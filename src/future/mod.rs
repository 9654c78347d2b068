// src/future/mod.rs

//! One-shot results handed back out of asynchronous work.
//!
//! - [`ResultCell`] is the value/error container.
//! - [`AsyncResult`] pairs a cell with the task that fills it and refuses
//!   retrieval before that task is done.

pub mod async_result;
pub mod result;

pub use async_result::{AsyncResult, async_deps, wrap_async_task, wrap_async_task_after};
pub use result::ResultCell;
