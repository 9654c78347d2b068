#![allow(dead_code)]

use taskgraph::Task;

use crate::recorder::ExecutionLog;

/// Builds recording tasks named `<prefix>0`, `<prefix>1`, ... where each task
/// depends on the previous one.
pub struct ChainBuilder {
    prefix: String,
    len: usize,
}

impl ChainBuilder {
    pub fn new(len: usize) -> Self {
        Self {
            prefix: "t".to_string(),
            len,
        }
    }

    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    pub fn build(self, log: &ExecutionLog) -> Vec<Task> {
        let mut tasks: Vec<Task> = Vec::with_capacity(self.len);
        for i in 0..self.len {
            let deps: Vec<Task> = tasks.last().cloned().into_iter().collect();
            tasks.push(log.task(&format!("{}{}", self.prefix, i), &deps));
        }
        tasks
    }
}

/// Builds `width` independent recording tasks plus one sink depending on all
/// of them.
pub struct FanInBuilder {
    width: usize,
}

impl FanInBuilder {
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Returns `(sources, sink)`; the sink checks that every source is done
    /// when it runs.
    pub fn build(self, log: &ExecutionLog) -> (Vec<Task>, Task) {
        let sources: Vec<Task> = (0..self.width)
            .map(|i| log.task(&format!("source{i}"), &[]))
            .collect();
        let sink = log.checking_task("sink", &sources, &sources);
        (sources, sink)
    }
}
