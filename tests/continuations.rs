// tests/continuations.rs

use std::error::Error;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use taskgraph::{Scheduler, SchedulerHandle, Task, TaskState};
use taskgraph_test_utils::recorder::ExecutionLog;
use taskgraph_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn continuations_are_grafted_onto_dependants() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::manual()?;
    let log = ExecutionLog::new();

    let base = log.task("base", &[]);
    let c1 = log.task("c1", &[]);
    let c2 = log.task("c2", &[]);

    let a = {
        let log = log.clone();
        let continuations = vec![c1.clone(), c2.clone()];
        Task::named(
            "a",
            move |_| {
                log.record("a");
                Ok(continuations)
            },
            &[],
        )
    };
    let d = log.checking_task("d", &[a.clone(), c1.clone(), c2.clone()], &[base.clone(), a.clone()]);

    scheduler.schedule(&d)?;
    scheduler.schedule(&base)?;
    scheduler.schedule(&a)?;

    // base, a
    assert!(scheduler.manual_step()?);
    assert!(scheduler.manual_step()?);

    assert_eq!(a.continuations(), vec![c1.clone(), c2.clone()]);
    assert_eq!(
        d.dependencies(),
        vec![base.clone(), a.clone(), c1.clone(), c2.clone()]
    );
    assert_eq!(d.state(), TaskState::Waiting);
    assert_eq!(d.pending_dependencies(), 2);

    // d stays parked until the continuations themselves are scheduled.
    assert!(!scheduler.manual_step()?);

    scheduler.schedule(&c1)?;
    assert!(scheduler.manual_step()?);
    assert_eq!(d.state(), TaskState::Waiting);

    scheduler.schedule(&c2)?;
    scheduler.wait_until_idle();

    assert!(d.is_done());
    assert_eq!(log.entries(), vec!["base", "a", "c1", "c2", "d"]);
    assert!(scheduler.take_failures().is_empty());
    Ok(())
}

#[test]
fn continuation_scheduled_from_work_delays_dependants() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::manual()?;
    let log = ExecutionLog::new();

    let a = {
        let log = log.clone();
        Task::named(
            "a",
            move |handle: &SchedulerHandle| {
                log.record("a");
                let follow_up = log.task("follow-up", &[]);
                handle.schedule(&follow_up)?;
                Ok(vec![follow_up])
            },
            &[],
        )
    };
    let d = log.task("d", &[a.clone()]);

    scheduler.schedule(&d)?;
    scheduler.schedule(&a)?;
    scheduler.wait_until_idle();

    assert!(d.is_done());
    assert_eq!(log.entries(), vec!["a", "follow-up", "d"]);
    Ok(())
}

#[test]
fn continuation_already_done_is_not_waited_on() -> TestResult {
    init_tracing();
    // Mirrors a task handing back a dependency that already finished.
    let scheduler = Scheduler::manual()?;
    let log = ExecutionLog::new();

    let task = log.task("task", &[]);
    scheduler.schedule(&task)?;

    let task2 = {
        let log = log.clone();
        let earlier = task.clone();
        Task::named(
            "task2",
            move |_| {
                log.record("task2");
                Ok(vec![earlier])
            },
            &[],
        )
    };
    scheduler.schedule(&task2)?;
    assert!(scheduler.manual_step()?);

    let task3 = log.task("task3", &[task2.clone()]);
    scheduler.schedule(&task3)?;
    assert!(scheduler.manual_step()?);
    assert!(scheduler.manual_step()?);

    // Nothing left.
    assert!(!scheduler.manual_step()?);

    assert!(task.is_done());
    assert!(task2.is_done());
    assert!(task3.is_done());
    assert_eq!(task3.dependencies(), vec![task2]);
    assert_eq!(log.entries(), vec!["task", "task2", "task3"]);
    Ok(())
}

#[test]
fn continuations_without_dependants_are_only_recorded() -> TestResult {
    let scheduler = Scheduler::manual()?;
    let c = Task::noop(&[]);
    let a = {
        let c = c.clone();
        Task::new(move |_| Ok(vec![c]), &[])
    };

    a.execute(&scheduler.handle())?;

    assert_eq!(a.continuations(), vec![c.clone()]);
    assert!(c.dependants().is_empty());
    assert_eq!(c.state(), TaskState::Created);
    Ok(())
}

#[test]
fn nested_continuations_chain_through_every_dependant() -> TestResult {
    init_tracing();
    let scheduler = Scheduler::manual()?;
    let log = ExecutionLog::new();

    let inner = log.task("inner", &[]);
    let outer = {
        let log = log.clone();
        let inner = inner.clone();
        Task::named(
            "outer",
            move |handle: &SchedulerHandle| {
                log.record("outer");
                handle.schedule(&inner)?;
                Ok(vec![inner])
            },
            &[],
        )
    };
    let root = {
        let log = log.clone();
        let outer = outer.clone();
        Task::named(
            "root",
            move |handle: &SchedulerHandle| {
                log.record("root");
                handle.schedule(&outer)?;
                Ok(vec![outer])
            },
            &[],
        )
    };
    let left = log.task("left", &[root.clone()]);
    let right = log.task("right", &[root.clone()]);

    for task in [&left, &right, &root] {
        scheduler.schedule(task)?;
    }
    scheduler.wait_until_idle();

    assert_eq!(log.len(), 5);
    for dependant in ["left", "right"] {
        assert!(log.ran_before("outer", dependant), "{:?}", log.entries());
        assert!(log.ran_before("inner", dependant), "{:?}", log.entries());
    }
    assert_eq!(left.dependencies(), vec![root.clone(), outer.clone(), inner.clone()]);
    assert_eq!(right.dependencies(), vec![root, outer, inner]);
    Ok(())
}

#[test]
fn threaded_continuations_finish_before_dependants() {
    init_tracing();
    with_timeout(|| {
        let scheduler = Scheduler::with_threads(3).expect("scheduler");
        let log = ExecutionLog::new();

        // Continuations are handed back unscheduled and submitted once the
        // parent is done, so no worker can run them before they are grafted.
        let parked: Arc<Mutex<Vec<Task>>> = Arc::new(Mutex::new(Vec::new()));
        let parent = {
            let log = log.clone();
            let parked = Arc::clone(&parked);
            Task::named(
                "parent",
                move |_| {
                    log.record("parent");
                    let children: Vec<Task> =
                        (0..4).map(|i| log.task(&format!("child{i}"), &[])).collect();
                    parked.lock().extend(children.iter().cloned());
                    Ok(children)
                },
                &[],
            )
        };
        let after = log.task("after", &[parent.clone()]);

        scheduler.schedule(&after).expect("schedule after");
        scheduler.schedule(&parent).expect("schedule parent");
        scheduler.wait_until_idle();

        assert!(parent.is_done());
        assert_eq!(after.state(), TaskState::Waiting);

        for child in parked.lock().iter() {
            scheduler.schedule(child).expect("schedule child");
        }
        scheduler.wait_until_idle();
        scheduler.join().expect("join");

        assert!(after.is_done());
        for i in 0..4 {
            assert!(log.ran_before(&format!("child{i}"), "after"));
        }
    });
}

#[test]
fn task_returned_as_its_own_continuation_is_ignored() {
    init_tracing();
    with_timeout(|| {
        let scheduler = Scheduler::manual().expect("scheduler");
        let me: Arc<OnceLock<Task>> = Arc::new(OnceLock::new());

        let a = {
            let me = Arc::clone(&me);
            Task::named(
                "a",
                move |_| Ok(me.get().cloned().into_iter().collect()),
                &[],
            )
        };
        me.set(a.clone()).expect("slot empty");
        let d = Task::noop(&[a.clone()]);

        a.execute(&scheduler.handle()).expect("execute");

        assert!(a.is_done());
        assert!(a.continuations().is_empty());
        assert_eq!(d.dependencies(), vec![a.clone()]);
        assert_eq!(d.pending_dependencies(), 0);
    });
}
