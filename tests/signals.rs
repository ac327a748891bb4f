// tests/signals.rs
#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{Signal, raise};

use clusterherd::signal::{Shutdown, install};
use clusterherd::supervisor::ProcessSupervisor;
use clusterherd_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

async fn wait_until_no_workers(sup: &ProcessSupervisor) {
    while sup.live_workers().await > 0 {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn sigterm_raises_the_flag_and_stops_the_cluster() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let shutdown = Shutdown::new();
    let sup = Arc::new(ProcessSupervisor::new(
        dir.path(),
        Duration::from_millis(500),
        shutdown.clone(),
    ));

    let started = with_timeout(sup.start(2, "sleep 30 # {id}", Duration::from_millis(200))).await;
    assert!(started.healthy());
    sup.launch_client("sleep 30", dir.path().join("client.log")).await?;

    let listener = install(Arc::clone(&sup), shutdown.clone());
    // Let the task register its handlers before anything is delivered.
    tokio::time::sleep(Duration::from_millis(300)).await;

    raise(Signal::SIGTERM)?;
    with_timeout(shutdown.triggered()).await;
    with_timeout(wait_until_no_workers(&sup)).await;
    assert!(!sup.client_active().await);

    // The listener stays up; a second signal repeats the cleanup harmlessly.
    raise(Signal::SIGTERM)?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!listener.is_finished());
    assert_eq!(sup.terminate_all().await, 0);

    listener.abort();
    Ok(())
}
