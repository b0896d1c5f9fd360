//! End-to-end dispatch through a hooked thread pool

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{build_runtime, wait_until, EventLog, RecordingPlugin};
use crossbeam::channel;
use parking_lot::Mutex;
use poolhook_core::error::{RejectReason, TaskError};
use poolhook_core::plugin::AdaptedPlugin;
use poolhook_core::task::Task;

const WAIT: Duration = Duration::from_secs(5);

#[test]
fn test_hooks_follow_priority_order() {
    let log = EventLog::new();
    let runtime = build_runtime("ordered", 1, 1, 8);
    runtime.register(RecordingPlugin::new("A", 3, &log));
    runtime.register(RecordingPlugin::new("B", 1, &log));
    runtime.register(RecordingPlugin::new("C", 2, &log));

    let labels = Arc::new(Mutex::new(Vec::new()));
    let observed = Arc::clone(&labels);
    runtime.register(Arc::new(
        AdaptedPlugin::builder("label-observer")
            .priority(100)
            .before_execute(move |_, _, info| observed.lock().push(info.label.clone()))
            .build(),
    ));

    let handle = runtime.submit_labeled("task:", || Ok(())).unwrap();
    assert_eq!(handle.join(), Ok(()));
    assert!(wait_until(WAIT, || log.plugins_for("after_execute").len() == 3));

    let expected = vec!["B", "C", "A"];
    assert_eq!(log.plugins_for("before_task_execute"), expected);
    assert_eq!(log.plugins_for("before_execute"), expected);
    assert_eq!(log.plugins_for("after_execute"), expected);
    assert_eq!(*labels.lock(), vec!["task:BCA".to_string()]);

    runtime.shutdown();
    assert!(runtime.await_termination(Some(WAIT)));
    assert_eq!(log.plugins_for("before_shutdown"), expected);
    assert_eq!(log.plugins_for("after_shutdown"), expected);
    assert_eq!(log.plugins_for("after_terminated"), expected);
}

#[test]
fn test_equal_priorities_keep_registration_order() {
    let log = EventLog::new();
    let runtime = build_runtime("stable", 1, 1, 8);
    for id in ["first", "second", "third"] {
        runtime.register(RecordingPlugin::new(id, 0, &log));
    }

    runtime.execute(Task::from_fn(|| {})).unwrap();
    assert_eq!(
        log.plugins_for("before_task_execute"),
        vec!["first", "second", "third"]
    );
    runtime.shutdown();
}

#[test]
fn test_panicking_hooks_are_isolated() {
    let log = EventLog::new();
    let runtime = build_runtime("isolated", 1, 1, 8);
    runtime.register(Arc::new(
        AdaptedPlugin::builder("broken")
            .priority(0)
            .before_task_execute(|_| panic!("broken decorator"))
            .before_execute(|_, _, _| panic!("broken before_execute"))
            .after_execute(|_, _, _| panic!("broken after_execute"))
            .build(),
    ));
    runtime.register(RecordingPlugin::new("healthy", 1, &log));

    let handle = runtime.submit(|| Ok("still runs")).unwrap();
    assert_eq!(handle.join(), Ok("still runs"));
    assert!(wait_until(WAIT, || log.plugins_for("after_execute").len() == 1));

    assert_eq!(log.plugins_for("before_task_execute"), vec!["healthy"]);
    assert_eq!(log.plugins_for("before_execute"), vec!["healthy"]);

    runtime.shutdown();
    assert!(runtime.await_termination(Some(WAIT)));
}

#[test]
fn test_after_execute_sees_task_failures() {
    let runtime = build_runtime("failures", 1, 1, 8);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&seen);
    runtime.register(Arc::new(
        AdaptedPlugin::builder("error-observer")
            .after_execute(move |_, _, error| recorder.lock().push(error.cloned()))
            .build(),
    ));

    let failed = runtime.submit::<(), _>(|| anyhow::bail!("boom")).unwrap();
    assert!(matches!(failed.join(), Err(TaskError::Failed { .. })));

    let panicked = runtime.submit::<(), _>(|| panic!("kaboom")).unwrap();
    assert!(matches!(panicked.join(), Err(TaskError::Panicked { .. })));

    // The worker survives both and keeps serving tasks
    let ok = runtime.submit(|| Ok(1)).unwrap();
    assert_eq!(ok.join(), Ok(1));

    assert!(wait_until(WAIT, || seen.lock().len() == 3));
    let seen = seen.lock();
    assert!(matches!(seen[0], Some(TaskError::Failed { .. })));
    assert!(matches!(seen[1], Some(TaskError::Panicked { .. })));
    assert_eq!(seen[2], None);

    runtime.shutdown();
}

#[test]
fn test_rejection_is_observed_and_returned() {
    let log = EventLog::new();
    let runtime = build_runtime("handoff", 1, 1, 0);
    runtime.register(RecordingPlugin::new("observer", 0, &log));

    let (release_tx, release_rx) = channel::bounded::<()>(0);
    let (started_tx, started_rx) = channel::bounded::<()>(1);
    runtime
        .execute(Task::from_fn(move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
        }))
        .unwrap();
    started_rx.recv_timeout(WAIT).unwrap();

    let err = runtime.execute(Task::from_fn(|| {})).unwrap_err();
    assert!(err.is_rejection());
    match err {
        poolhook_core::PoolHookError::Rejected { pool_id, reason, .. } => {
            assert_eq!(pool_id, "handoff");
            assert_eq!(reason, RejectReason::QueueFull);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(log.plugins_for("before_rejected_execution"), vec!["observer"]);

    release_tx.send(()).unwrap();
    runtime.shutdown();
    assert!(runtime.await_termination(Some(WAIT)));
}

#[test]
fn test_shutdown_now_reports_drained_tasks() {
    let runtime = build_runtime("drain", 1, 1, 8);
    let drained = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&drained);
    runtime.register(Arc::new(
        AdaptedPlugin::builder("drain-observer")
            .after_shutdown(move |_, remaining| {
                recorder
                    .lock()
                    .extend(remaining.iter().map(|info| info.label.clone()))
            })
            .build(),
    ));

    let (release_tx, release_rx) = channel::bounded::<()>(0);
    let (started_tx, started_rx) = channel::bounded::<()>(1);
    runtime
        .execute(Task::from_fn(move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
        }))
        .unwrap();
    started_rx.recv_timeout(WAIT).unwrap();

    runtime.execute(Task::labeled("queued-1", || Ok(()))).unwrap();
    runtime.execute(Task::labeled("queued-2", || Ok(()))).unwrap();

    let remaining = runtime.shutdown_now();
    assert_eq!(remaining.len(), 2);
    assert_eq!(
        *drained.lock(),
        vec!["queued-1".to_string(), "queued-2".to_string()]
    );

    drop(release_tx);
    assert!(runtime.await_termination(Some(WAIT)));
}

#[test]
fn test_after_terminated_waits_for_running_tasks() {
    let log = EventLog::new();
    let runtime = build_runtime("terminating", 1, 1, 8);
    runtime.register(RecordingPlugin::new("phases", 0, &log));

    let (release_tx, release_rx) = channel::bounded::<()>(0);
    let (started_tx, started_rx) = channel::bounded::<()>(1);
    runtime
        .execute(Task::from_fn(move || {
            let _ = started_tx.send(());
            let _ = release_rx.recv();
        }))
        .unwrap();
    started_rx.recv_timeout(WAIT).unwrap();

    runtime.shutdown();
    assert!(log.plugins_for("after_shutdown").len() == 1);
    assert!(log.plugins_for("after_terminated").is_empty());

    release_tx.send(()).unwrap();
    assert!(runtime.await_termination(Some(WAIT)));
    assert!(wait_until(WAIT, || log.plugins_for("after_terminated").len() == 1));

    let shutdown_events: Vec<String> = log
        .events()
        .into_iter()
        .filter(|event| event.contains("shutdown") || event.contains("terminated"))
        .collect();
    assert_eq!(
        shutdown_events,
        vec![
            "phases:before_shutdown",
            "phases:after_shutdown",
            "phases:after_terminated"
        ]
    );
}
