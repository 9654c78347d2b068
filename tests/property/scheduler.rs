use std::collections::BTreeSet;

use proptest::prelude::*;
use taskgraph::{Scheduler, SchedulerHandle, Task};
use taskgraph_test_utils::recorder::ExecutionLog;
use taskgraph_test_utils::with_timeout;

/// A random DAG plus the order in which its tasks are submitted.
#[derive(Debug, Clone)]
struct GraphPlan {
    deps: Vec<Vec<usize>>,
    order: Vec<usize>,
    spawns_continuation: Vec<bool>,
}

impl GraphPlan {
    fn expected_runs(&self) -> usize {
        self.deps.len() + self.spawns_continuation.iter().filter(|s| **s).count()
    }
}

// Acyclic by construction: task N only depends on tasks 0..N-1.
fn graph_plan_strategy(max_tasks: usize) -> impl Strategy<Value = GraphPlan> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        let deps = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..4),
            num_tasks,
        );
        let order = Just((0..num_tasks).collect::<Vec<_>>()).prop_shuffle();
        let spawns = proptest::collection::vec(any::<bool>(), num_tasks);

        (deps, order, spawns).prop_map(|(raw_deps, order, spawns_continuation)| {
            let deps = raw_deps
                .into_iter()
                .enumerate()
                .map(|(i, potential)| {
                    if i == 0 {
                        return Vec::new();
                    }
                    let valid: BTreeSet<usize> = potential.into_iter().map(|d| d % i).collect();
                    valid.into_iter().collect()
                })
                .collect();
            GraphPlan {
                deps,
                order,
                spawns_continuation,
            }
        })
    })
}

fn build_graph(plan: &GraphPlan, log: &ExecutionLog) -> Vec<Task> {
    let mut tasks: Vec<Task> = Vec::with_capacity(plan.deps.len());
    for (i, deps) in plan.deps.iter().enumerate() {
        let deps: Vec<Task> = deps.iter().map(|&d| tasks[d].clone()).collect();
        let name = format!("n{i}");

        let task = if plan.spawns_continuation[i] {
            let log = log.clone();
            let label = name.clone();
            Task::named(
                name,
                move |handle: &SchedulerHandle| {
                    log.record(&label);
                    let follow_up = log.task(&format!("{label}-cont"), &[]);
                    handle.schedule(&follow_up)?;
                    Ok(vec![follow_up])
                },
                &deps,
            )
        } else {
            log.task(&name, &deps)
        };
        tasks.push(task);
    }
    tasks
}

fn check_dependency_order(plan: &GraphPlan, log: &ExecutionLog) -> Result<(), TestCaseError> {
    for (i, deps) in plan.deps.iter().enumerate() {
        for d in deps {
            prop_assert!(
                log.ran_before(&format!("n{d}"), &format!("n{i}")),
                "n{} ran before its dependency n{}: {:?}",
                i,
                d,
                log.entries()
            );
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn manual_mode_runs_every_task_after_its_dependencies(plan in graph_plan_strategy(12)) {
        let log = ExecutionLog::new();
        let tasks = build_graph(&plan, &log);
        let scheduler = Scheduler::manual().expect("scheduler");

        for &i in &plan.order {
            scheduler.schedule(&tasks[i]).expect("schedule");
        }
        scheduler.wait_until_idle();

        prop_assert!(tasks.iter().all(|t| t.is_done()));
        prop_assert_eq!(log.len(), plan.expected_runs());
        prop_assert!(scheduler.take_failures().is_empty());
        check_dependency_order(&plan, &log)?;

        // Continuations are grafted before any dependant can become ready.
        for (i, deps) in plan.deps.iter().enumerate() {
            for &d in deps.iter().filter(|&&d| plan.spawns_continuation[d]) {
                prop_assert!(
                    log.ran_before(&format!("n{d}-cont"), &format!("n{i}")),
                    "n{} ran before continuation of n{}: {:?}",
                    i,
                    d,
                    log.entries()
                );
            }
        }
    }

    #[test]
    fn threaded_mode_runs_every_task_after_its_dependencies(
        plan in graph_plan_strategy(12),
        threads in 1..4usize,
    ) {
        let log = ExecutionLog::new();
        let tasks = build_graph(&plan, &log);

        let order = plan.order.clone();
        let submitted = tasks.clone();
        let failures = with_timeout(move || {
            let scheduler = Scheduler::with_threads(threads).expect("scheduler");
            for &i in &order {
                scheduler.schedule(&submitted[i]).expect("schedule");
            }
            scheduler.wait_until_idle();
            scheduler.join().expect("join");
            scheduler.take_failures().len()
        });

        prop_assert_eq!(failures, 0);
        prop_assert!(tasks.iter().all(|t| t.is_done()));
        prop_assert_eq!(log.len(), plan.expected_runs());
        check_dependency_order(&plan, &log)?;
    }
}
