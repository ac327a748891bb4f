// tests/orchestrator.rs
#![cfg(unix)]

use std::error::Error;
use std::time::Duration;

use clusterherd::errors::HerdError;
use clusterherd::orchestrator::{Orchestrator, RunOutcome, RunState};
use clusterherd::signal::on_interrupt;
use clusterherd_test_utils::builders::HarnessConfigBuilder;
use clusterherd_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn state_machine_transitions() {
    use RunState::*;

    let happy = [
        Init,
        Building,
        Cleaning,
        Starting,
        VerifyingPorts,
        Loading,
        Monitoring,
        Reporting,
        Done,
    ];
    for pair in happy.windows(2) {
        assert!(pair[0].allows(pair[1]), "{} -> {}", pair[0], pair[1]);
    }

    assert!(Building.allows(Aborted));
    assert!(Starting.allows(Aborted));
    assert!(!VerifyingPorts.allows(Aborted));
    assert!(!Loading.allows(Aborted));
    assert!(Monitoring.allows(Interrupted));
    assert!(!Done.allows(Interrupted));
    assert!(!Init.allows(Starting));
    assert!(Aborted.is_terminal() && Done.is_terminal() && Interrupted.is_terminal());
}

#[tokio::test]
async fn failed_build_aborts_before_anything_starts() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = HarnessConfigBuilder::new(dir.path())
        .build_cmd("echo compile error >&2; exit 101")
        .build();

    let mut orch = Orchestrator::new(cfg);
    let outcome = with_timeout(orch.run()).await;

    assert!(matches!(
        outcome,
        RunOutcome::Aborted(HerdError::BuildFailure { code: 101 })
    ));
    assert!(!outcome.is_success());
    assert_eq!(
        orch.history(),
        &[RunState::Init, RunState::Building, RunState::Aborted]
    );
    assert!(orch.supervisor().statuses().await.is_empty());
    assert!(!dir.path().join("node1.log").exists());
    Ok(())
}

#[tokio::test]
async fn failed_start_aborts_and_leaves_partial_state() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = HarnessConfigBuilder::new(dir.path())
        .worker_cmd("if [ {id} -eq 3 ]; then exit 1; fi; sleep 30")
        .build();

    let mut orch = Orchestrator::new(cfg);
    let outcome = with_timeout(orch.run()).await;

    assert!(matches!(
        outcome,
        RunOutcome::Aborted(HerdError::ProcessStartFailure {
            requested: 4,
            failed: 1
        })
    ));
    assert_eq!(orch.state(), RunState::Aborted);
    assert!(!orch.history().contains(&RunState::VerifyingPorts));
    assert!(!dir.path().join("client.log").exists());

    let sup = orch.supervisor();
    assert_eq!(sup.live_workers().await, 3);

    // The caller is responsible for cleaning up after an abort.
    with_timeout(sup.terminate_all()).await;
    assert_eq!(sup.live_workers().await, 0);
    Ok(())
}

#[tokio::test]
async fn unbound_ports_only_warn_and_the_run_completes() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = HarnessConfigBuilder::new(dir.path())
        .worker_cmd("echo 'Vertex committed by {id}'; echo 'DAG has reached round 1'; sleep 30")
        .build();
    let configured_ports = cfg.ports.clone();
    let report_path = cfg.report_path();

    let mut orch = Orchestrator::new(cfg);
    let outcome = with_timeout(orch.run()).await;

    assert_eq!(
        orch.history(),
        &[
            RunState::Init,
            RunState::Building,
            RunState::Cleaning,
            RunState::Starting,
            RunState::VerifyingPorts,
            RunState::Loading,
            RunState::Monitoring,
            RunState::Reporting,
            RunState::Done,
        ]
    );

    let report = match &outcome {
        RunOutcome::Completed(r) => r.clone(),
        other => panic!("expected Completed, got {other:?}"),
    };
    assert!(outcome.is_success());

    let mut keys: Vec<u16> = report.ports_status.keys().copied().collect();
    let mut expected = configured_ports.clone();
    keys.sort_unstable();
    expected.sort_unstable();
    assert_eq!(keys, expected);
    assert!(report.ports_status.values().all(|listening| !listening));

    assert_eq!(report.nodes_started, 4);
    // Four distinct "Vertex committed by N" lines plus one shared round line.
    assert_eq!(report.consensus_events, 5);
    let wall = (report.end_time - report.start_time).num_milliseconds() as f64 / 1000.0;
    assert!((report.duration - wall).abs() < 0.01);

    assert!(report_path.exists());
    let client_log = std::fs::read_to_string(dir.path().join("client.log"))?;
    assert!(client_log.contains("client 127.0.0.1:1244"));

    // Workers are deliberately left running after a completed run.
    let sup = orch.supervisor();
    assert_eq!(sup.live_workers().await, 4);
    assert!(!sup.client_active().await);
    with_timeout(sup.terminate_all()).await;
    Ok(())
}

#[tokio::test]
async fn failing_client_launch_still_reports() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = HarnessConfigBuilder::new(dir.path()).build();
    // A directory where the client log should go makes the launch fail.
    std::fs::create_dir_all(cfg.client_log_path())?;
    let report_path = cfg.report_path();

    let mut orch = Orchestrator::new(cfg);
    let outcome = with_timeout(orch.run()).await;

    match &outcome {
        RunOutcome::Failed { report, errors } => {
            assert!(report.is_some());
            assert_eq!(errors.len(), 1);
            assert!(errors[0].starts_with("load generation"));
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(orch.state(), RunState::Done);
    assert!(report_path.exists());

    with_timeout(orch.supervisor().terminate_all()).await;
    Ok(())
}

#[tokio::test]
async fn interrupt_during_monitoring_stops_everything() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = HarnessConfigBuilder::new(dir.path())
        .monitor("30s", "100ms")
        .build();
    let report_path = cfg.report_path();

    let mut orch = Orchestrator::new(cfg);
    let sup = orch.supervisor();
    let shutdown = orch.shutdown();

    let run = tokio::spawn(async move {
        let outcome = orch.run().await;
        (outcome, orch)
    });

    // Warm-up (200ms) + client (100ms) + client stop, then monitoring.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(sup.live_workers().await, 4);

    with_timeout(on_interrupt(&sup, &shutdown)).await;
    assert_eq!(sup.live_workers().await, 0);
    assert!(!sup.client_active().await);

    // A second interrupt right after finds nothing left to stop.
    with_timeout(on_interrupt(&sup, &shutdown)).await;

    let (outcome, orch) = with_timeout(run).await?;
    assert!(matches!(outcome, RunOutcome::Interrupted));
    assert!(outcome.is_success());
    assert!(orch.history().contains(&RunState::Monitoring));
    assert_eq!(orch.state(), RunState::Interrupted);
    assert!(!report_path.exists());
    assert_eq!(sup.terminate_all().await, 0);
    Ok(())
}

#[tokio::test]
async fn interrupt_before_start_never_launches_workers() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = HarnessConfigBuilder::new(dir.path()).build();

    let mut orch = Orchestrator::new(cfg);
    let sup = orch.supervisor();
    on_interrupt(&sup, &orch.shutdown()).await;

    let outcome = with_timeout(orch.run()).await;
    assert!(matches!(outcome, RunOutcome::Interrupted));
    assert_eq!(
        orch.history(),
        &[RunState::Init, RunState::Building, RunState::Interrupted]
    );
    assert!(sup.statuses().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn interrupt_cuts_a_slow_build_short() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = HarnessConfigBuilder::new(dir.path())
        .build_cmd("sleep 5")
        .build();

    let mut orch = Orchestrator::new(cfg);
    let sup = orch.supervisor();
    let shutdown = orch.shutdown();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        on_interrupt(&sup, &shutdown).await;
    });

    let started = std::time::Instant::now();
    let outcome = with_timeout(orch.run()).await;

    assert!(started.elapsed() < Duration::from_secs(3), "{:?}", started.elapsed());
    assert!(matches!(outcome, RunOutcome::Interrupted));
    assert_eq!(
        orch.history(),
        &[RunState::Init, RunState::Building, RunState::Interrupted]
    );
    assert!(orch.supervisor().statuses().await.is_empty());
    Ok(())
}
