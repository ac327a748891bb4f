// tests/supervisor.rs
#![cfg(unix)]

use std::error::Error;
use std::time::Duration;

use clusterherd::exec::StopOutcome;
use clusterherd::load::LoadGenerator;
use clusterherd::orchestrator::cleanup::shutdown_cluster;
use clusterherd::signal::{Shutdown, on_interrupt};
use clusterherd::supervisor::{ProcessSupervisor, worker_command};
use clusterherd::types::ProcessState;
use clusterherd_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

const WARMUP: Duration = Duration::from_millis(300);
const GRACE: Duration = Duration::from_millis(500);

fn supervisor(dir: &std::path::Path) -> ProcessSupervisor {
    ProcessSupervisor::new(dir, GRACE, Shutdown::new())
}

#[test]
fn worker_command_substitutes_every_placeholder() {
    assert_eq!(
        worker_command("node run --id {id} --log node{id}", 3),
        "node run --id 3 --log node3"
    );
}

#[tokio::test]
async fn all_workers_alive_after_warmup_is_healthy() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor(dir.path());

    let report = with_timeout(sup.start(4, "echo node {id} up; sleep 30", WARMUP)).await;

    assert!(report.healthy());
    assert_eq!(report.healthy_count(), 4);
    assert_eq!(
        report.statuses.iter().map(|(id, _)| *id).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(sup.live_workers().await, 4);

    for id in 1..=4 {
        let log = std::fs::read_to_string(dir.path().join(format!("node{id}.log")))?;
        assert!(log.contains(&format!("node {id} up")), "node{id}.log: {log:?}");
    }

    assert_eq!(with_timeout(sup.terminate_all()).await, 4);
    Ok(())
}

#[tokio::test]
async fn worker_exiting_during_warmup_fails_start() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor(dir.path());

    let report = with_timeout(sup.start(
        4,
        "if [ {id} -eq 3 ]; then exit 1; fi; sleep 30",
        WARMUP,
    ))
    .await;

    assert!(!report.healthy());
    assert_eq!(report.healthy_count(), 3);
    assert_eq!(report.failed_ids(), vec![3]);
    assert!(report.statuses.contains(&(3, ProcessState::Exited)));

    // Partial state is left running until someone cleans up.
    assert_eq!(sup.live_workers().await, 3);

    with_timeout(sup.terminate_all()).await;
    Ok(())
}

#[tokio::test]
async fn terminate_all_twice_is_harmless() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor(dir.path());

    with_timeout(sup.start(4, "sleep 30 # {id}", WARMUP)).await;

    let first = with_timeout(sup.terminate_all()).await;
    assert_eq!(first, 4);
    assert_eq!(sup.live_workers().await, 0);
    assert!(
        sup.statuses()
            .await
            .iter()
            .all(|(_, s)| *s == ProcessState::Terminated)
    );

    let second = with_timeout(sup.terminate_all()).await;
    assert_eq!(second, 0);
    assert_eq!(sup.live_workers().await, 0);
    Ok(())
}

#[tokio::test]
async fn terminate_all_with_nothing_started() {
    init_tracing();
    let sup = ProcessSupervisor::new("unused-log-dir", GRACE, Shutdown::new());

    assert_eq!(sup.terminate_all().await, 0);
    assert_eq!(sup.terminate_all().await, 0);
    assert!(sup.stop_client().await.expect("stop_client").is_none());
}

#[tokio::test]
async fn single_worker_terminate_is_idempotent() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor(dir.path());

    with_timeout(sup.start(2, "sleep 30 # {id}", WARMUP)).await;

    assert_eq!(sup.terminate(1).await?, Some(StopOutcome::Graceful));
    assert_eq!(sup.terminate(1).await?, Some(StopOutcome::AlreadyExited));
    assert_eq!(sup.terminate(9).await?, None);
    assert_eq!(sup.live_workers().await, 1);

    assert_eq!(with_timeout(sup.terminate_all()).await, 1);
    Ok(())
}

#[tokio::test]
async fn restart_keeps_earlier_workers_under_cleanup() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor(dir.path());

    with_timeout(sup.start(2, "sleep 30 # first {id}", WARMUP)).await;
    let second = with_timeout(sup.start(2, "sleep 30 # second {id}", WARMUP)).await;
    assert!(second.healthy());
    assert_eq!(sup.live_workers().await, 2);

    // Two current workers plus two retired ones.
    assert_eq!(with_timeout(sup.terminate_all()).await, 4);
    Ok(())
}

#[tokio::test]
async fn shutdown_during_warmup_stops_launching() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let shutdown = Shutdown::new();
    let sup = ProcessSupervisor::new(dir.path(), GRACE, shutdown.clone());

    shutdown.trigger();
    let report = with_timeout(sup.start(3, "sleep 30 # {id}", Duration::from_secs(10))).await;

    assert!(!report.healthy());
    assert_eq!(report.healthy_count(), 0);
    assert_eq!(sup.terminate_all().await, 0);
    Ok(())
}

#[tokio::test]
async fn load_generator_runs_one_client_at_a_time() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let shutdown = Shutdown::new();
    let sup = std::sync::Arc::new(ProcessSupervisor::new(dir.path(), GRACE, shutdown.clone()));
    let log = dir.path().join("client.log");
    let load = LoadGenerator::new(
        sup.clone(),
        shutdown,
        "echo target {endpoint}; sleep 30",
        &log,
    );

    let outcome = with_timeout(load.run("127.0.0.1:1244", Duration::from_millis(200))).await?;
    assert_eq!(outcome, Some(StopOutcome::Graceful));
    assert!(!sup.client_active().await);
    assert!(std::fs::read_to_string(&log)?.contains("target 127.0.0.1:1244"));

    // A client left running is replaced, never duplicated.
    sup.launch_client("sleep 30", log.clone()).await?;
    sup.launch_client("sleep 30", log.clone()).await?;
    assert!(sup.client_active().await);
    assert_eq!(with_timeout(sup.terminate_all()).await, 1);

    assert_eq!(load.stop().await?, Some(StopOutcome::AlreadyExited));
    Ok(())
}

#[tokio::test]
async fn interrupt_cleanup_is_repeatable() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let shutdown = Shutdown::new();
    let sup = ProcessSupervisor::new(dir.path(), GRACE, shutdown.clone());

    with_timeout(sup.start(4, "sleep 30 # {id}", WARMUP)).await;
    sup.launch_client("sleep 30", dir.path().join("client.log")).await?;

    with_timeout(on_interrupt(&sup, &shutdown)).await;
    assert!(shutdown.is_triggered());
    assert_eq!(sup.live_workers().await, 0);
    assert!(!sup.client_active().await);

    with_timeout(on_interrupt(&sup, &shutdown)).await;
    with_timeout(shutdown_cluster(&sup)).await;
    assert_eq!(sup.live_workers().await, 0);
    Ok(())
}

#[tokio::test]
async fn terminate_all_counts_graceful_and_forced_stops() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let sup = supervisor(dir.path());

    // Worker 2 ignores SIGTERM and has to be killed.
    let started = with_timeout(sup.start(
        3,
        "if [ {id} -eq 2 ]; then trap '' TERM; fi; sleep 30",
        WARMUP,
    ))
    .await;
    assert!(started.healthy());

    assert_eq!(with_timeout(sup.terminate_all()).await, 3);
    assert_eq!(sup.live_workers().await, 0);
    assert!(
        sup.statuses()
            .await
            .iter()
            .all(|(_, s)| *s == ProcessState::Terminated)
    );
    assert_eq!(with_timeout(sup.terminate_all()).await, 0);
    Ok(())
}
