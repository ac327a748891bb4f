// src/orchestrator/cleanup.rs

//! Cleanup routines.
//!
//! [`shutdown_cluster`] stops what this run launched; it is the single routine
//! behind both the interrupt path and the failure path. The pattern-based
//! helpers deal with processes this invocation does not own (leftovers from
//! earlier runs, or a cluster started by another `clusterherd run`).

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::exec::run_program;
use crate::supervisor::ProcessSupervisor;

/// Stop the client (if active), then every worker. Idempotent.
pub async fn shutdown_cluster(supervisor: &ProcessSupervisor) {
    match supervisor.stop_client().await {
        Ok(Some(outcome)) => debug!(?outcome, "client stop"),
        Ok(None) => debug!("no client was launched"),
        Err(e) => warn!(error = %e, "failed to stop client"),
    }

    let stopped = supervisor.terminate_all().await;
    info!(stopped, "cleanup complete");
}

/// Best-effort `pkill -f <pattern>`. Never fails.
///
/// Returns `true` if at least one process matched.
pub async fn sweep_stale(pattern: &str) -> bool {
    info!(pattern, "cleaning up stale processes");
    match run_program("pkill", &["-f", pattern]).await {
        Ok(out) => {
            // pkill: 0 = matched, 1 = nothing matched, other = error.
            if out.code > 1 {
                debug!(exit_code = out.code, stderr = %out.stderr.trim(), "pkill reported an error");
            }
            out.code == 0
        }
        Err(e) => {
            debug!(error = %e, "stale process sweep unavailable");
            false
        }
    }
}

/// Graceful-then-forced stop of every process matching `pattern`.
///
/// Safe to run whether or not anything is running.
pub async fn stop_by_pattern(pattern: &str, grace: Duration) -> bool {
    let matched = match run_program("pkill", &["-TERM", "-f", pattern]).await {
        Ok(out) => out.code == 0,
        Err(e) => {
            warn!(error = %e, "could not signal processes");
            return false;
        }
    };

    if !matched {
        info!(pattern, "no matching processes running");
        return false;
    }

    info!(pattern, grace_ms = grace.as_millis() as u64, "sent SIGTERM; waiting before forcing");
    tokio::time::sleep(grace).await;

    if let Ok(out) = run_program("pkill", &["-KILL", "-f", pattern]).await {
        if out.code == 0 {
            warn!(pattern, "some processes had to be killed");
        }
    }
    true
}

/// `pgrep -af <pattern>` lines: "<pid> <command line>".
pub async fn list_by_pattern(pattern: &str) -> Vec<String> {
    match run_program("pgrep", &["-af", pattern]).await {
        Ok(out) => out
            .stdout
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(e) => {
            debug!(error = %e, "process listing unavailable");
            Vec::new()
        }
    }
}
