//! End-to-end lifecycle tests driving real `/bin/sh` children.
//!
//! Timing-sensitive scenarios run with short poll intervals instead of a
//! simulated clock; budgets are generous enough for loaded CI machines.

#![cfg(unix)]

use std::time::{Duration, SystemTime};

use procvisor::{
    BackoffPolicy, Config, JitterPolicy, PidRecord, RestartPolicy, ServiceSpec, ServiceStatus,
    StartMode, StartOutcome, StopOutcome, Supervisor, SupervisorError, WatchdogExit,
};

fn fast_config(dir: &std::path::Path) -> Config {
    let mut cfg = Config::default().with_base_dir(dir);
    cfg.poll_interval = Duration::from_millis(40);
    cfg.stop_checks = 5;
    cfg.stop_check_interval = Duration::from_millis(50);
    cfg.restart = RestartPolicy {
        max_restarts_per_window: 3,
        window: Duration::from_secs(60),
        backoff: BackoffPolicy {
            base: Duration::from_millis(10),
            factor: 2.0,
            max: Duration::from_millis(80),
            jitter: JitterPolicy::None,
        },
    };
    cfg
}

fn supervisor(dir: &std::path::Path) -> Supervisor {
    Supervisor::new(fast_config(dir), "svc", Vec::new())
}

fn sh(script: &str) -> ServiceSpec {
    ServiceSpec::new(
        "svc",
        vec!["/bin/sh".into(), "-c".into(), script.into()],
    )
}

/// A pid that is certainly dead: spawn a short-lived child and reap it.
fn dead_pid() -> u32 {
    let mut child = std::process::Command::new("true").spawn().expect("spawn");
    let pid = child.id();
    child.wait().expect("wait");
    pid
}

#[tokio::test]
async fn stop_is_idempotent_without_a_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sup = supervisor(dir.path());

    assert_eq!(sup.stop().await.expect("stop"), StopOutcome::NotRunning);
    assert_eq!(sup.stop().await.expect("stop"), StopOutcome::NotRunning);
    assert_eq!(sup.status(), ServiceStatus::NotRunning);
}

#[tokio::test]
async fn start_stop_status_roundtrip() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sup = supervisor(dir.path());

    let outcome = sup
        .start(&sh("sleep 30"), StartMode::Basic)
        .await
        .expect("start");
    let StartOutcome::Launched { pid } = outcome else {
        panic!("expected a detached launch, got {outcome:?}");
    };

    match sup.status() {
        ServiceStatus::Running {
            pid: status_pid, ..
        } => assert_eq!(status_pid, pid),
        ServiceStatus::NotRunning => panic!("expected RUNNING right after start"),
    }

    let stopped = sup.stop().await.expect("stop");
    assert_eq!(
        stopped,
        StopOutcome::Terminated {
            pid,
            escalated: false
        }
    );

    assert_eq!(sup.status(), ServiceStatus::NotRunning);
    assert!(
        !fast_config(dir.path()).pid_path("svc").exists(),
        "record file must be gone after a confirmed stop"
    );
}

#[tokio::test]
async fn duplicate_start_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sup = supervisor(dir.path());

    let outcome = sup
        .start(&sh("sleep 30"), StartMode::Basic)
        .await
        .expect("first start");
    let StartOutcome::Launched { pid } = outcome else {
        panic!("expected a detached launch");
    };

    let err = sup.start(&sh("sleep 30"), StartMode::Basic).await.unwrap_err();
    match err {
        SupervisorError::AlreadyRunning { pid: reported } => assert_eq!(reported, pid),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    // Still exactly one process: status names the original pid.
    match sup.status() {
        ServiceStatus::Running {
            pid: status_pid, ..
        } => assert_eq!(status_pid, pid),
        ServiceStatus::NotRunning => panic!("service vanished"),
    }

    sup.stop().await.expect("cleanup stop");
}

#[tokio::test]
async fn stale_record_is_recovered_on_status_and_start() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = fast_config(dir.path());
    let sup = supervisor(dir.path());

    // Plant a record naming a pid that is no longer alive.
    let record = PidRecord {
        pid: dead_pid(),
        written_at: SystemTime::now(),
    };
    std::fs::create_dir_all(dir.path()).expect("mkdir");
    std::fs::write(
        cfg.pid_path("svc"),
        serde_json::to_string(&record).expect("serialize"),
    )
    .expect("plant record");

    // The stale record reads as absent, not as an error.
    assert_eq!(sup.status(), ServiceStatus::NotRunning);

    // And a subsequent start succeeds, replacing the stale record.
    let outcome = sup
        .start(&sh("sleep 30"), StartMode::Basic)
        .await
        .expect("start over a stale record");
    let StartOutcome::Launched { pid } = outcome else {
        panic!("expected a detached launch");
    };
    assert_ne!(pid, record.pid);

    sup.stop().await.expect("cleanup stop");
}

#[tokio::test]
async fn bounded_restart_ends_in_crash_loop() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sup = supervisor(dir.path());

    sup.start(&sh("exit 1"), StartMode::Persistent)
        .await
        .expect("persistent start");

    let joined = tokio::time::timeout(Duration::from_secs(10), sup.join_watchdog())
        .await
        .expect("watchdog should give up well within the timeout");

    match joined {
        Some(Err(SupervisorError::CrashLoopDetected { restarts, .. })) => {
            assert_eq!(restarts, 3);
        }
        other => panic!("expected CrashLoopDetected, got {other:?}"),
    }

    // The service is left stopped; no record lingers, a fresh start is clean.
    assert_eq!(sup.status(), ServiceStatus::NotRunning);
    sup.start(&sh("sleep 30"), StartMode::Basic)
        .await
        .expect("fresh start after crash loop");
    sup.stop().await.expect("cleanup stop");
}

#[tokio::test]
async fn stop_suspends_the_watchdog_before_signaling() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sup = supervisor(dir.path());

    sup.start(&sh("sleep 30"), StartMode::Persistent)
        .await
        .expect("persistent start");

    // Let the watchdog take a few healthy ticks first.
    tokio::time::sleep(Duration::from_millis(150)).await;

    let stopped = sup.stop().await.expect("stop");
    assert!(matches!(stopped, StopOutcome::Terminated { .. }));

    // Several poll intervals later: no resurrection, no record.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(sup.status(), ServiceStatus::NotRunning);
}

#[tokio::test]
async fn second_persistent_start_is_rejected_while_watchdog_is_active() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sup = supervisor(dir.path());

    sup.start(&sh("sleep 30"), StartMode::Persistent)
        .await
        .expect("persistent start");

    // The AlreadyRunning guard fires first: same outcome, no second loop.
    let err = sup
        .start(&sh("sleep 30"), StartMode::Persistent)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        SupervisorError::AlreadyRunning { .. } | SupervisorError::WatchdogActive
    ));

    sup.stop().await.expect("cleanup stop");
}

#[tokio::test]
async fn debug_mode_waits_and_reports_the_exit_code() {
    let dir = tempfile::tempdir().expect("tempdir");
    let sup = supervisor(dir.path());

    let outcome = sup
        .start(&sh("exit 7"), StartMode::Debug)
        .await
        .expect("debug start");
    assert_eq!(outcome, StartOutcome::DebugExited { exit_code: 7 });

    // Debug runs leave no record behind.
    assert_eq!(sup.status(), ServiceStatus::NotRunning);
}

#[tokio::test]
async fn service_output_is_appended_to_the_log_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = fast_config(dir.path());
    let sup = supervisor(dir.path());

    sup.start(&sh("echo first"), StartMode::Basic)
        .await
        .expect("start");
    tokio::time::sleep(Duration::from_millis(300)).await;

    // The record is stale now (the echo exited); a second start must append,
    // not truncate.
    sup.start(&sh("echo second"), StartMode::Basic)
        .await
        .expect("restart");
    tokio::time::sleep(Duration::from_millis(300)).await;

    let out = std::fs::read_to_string(cfg.stdout_path("svc")).expect("stdout log");
    assert!(out.contains("first"));
    assert!(out.contains("second"));
}

#[tokio::test]
async fn watchdog_exits_idle_when_the_record_disappears() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cfg = fast_config(dir.path());
    let sup = supervisor(dir.path());

    sup.start(&sh("sleep 5"), StartMode::Persistent)
        .await
        .expect("persistent start");

    // Simulate an external cleanup: remove the record out from under the
    // watchdog. The loop must notice and end rather than relaunch.
    std::fs::remove_file(cfg.pid_path("svc")).expect("remove record");

    let joined = tokio::time::timeout(Duration::from_secs(5), sup.join_watchdog())
        .await
        .expect("watchdog should notice the empty registry");
    assert!(matches!(joined, Some(Ok(WatchdogExit::Idle))));
}
