// src/exec/handle.rs

//! Owned handle to a detached external process.
//!
//! Every operation here is individually idempotent: polling an exited process
//! keeps returning "not running", signalling or killing it again is a no-op.
//! Callers (the supervisor, the signal path) never have to remember what was
//! already done to a handle.

use std::process::ExitStatus;
use std::time::Duration;

use tokio::process::Child;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::errors::Result;

/// How a [`ProcessHandle::terminate`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process had already exited; nothing was sent.
    AlreadyExited,
    /// It exited within the grace period after the stop signal.
    Graceful,
    /// It had to be killed.
    Forced,
}

#[derive(Debug)]
pub struct ProcessHandle {
    label: String,
    pid: Option<u32>,
    child: Child,
    exit: Option<ExitStatus>,
}

impl ProcessHandle {
    pub fn new(label: String, child: Child) -> Self {
        let pid = child.id();
        Self {
            label,
            pid,
            child,
            exit: None,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// OS process id captured at spawn time.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Exit code once the process is known to have exited.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit.map(|s| s.code().unwrap_or(-1))
    }

    /// Non-blocking liveness check.
    pub fn is_running(&mut self) -> bool {
        if self.exit.is_some() {
            return false;
        }

        match self.child.try_wait() {
            Ok(Some(status)) => {
                debug!(process = %self.label, ?status, "process has exited");
                self.exit = Some(status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                // Cannot query it any more; treat it as gone.
                warn!(process = %self.label, error = %e, "liveness poll failed");
                false
            }
        }
    }

    /// Ask the process (group) to stop. No-op if it already exited.
    pub fn signal_graceful(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::errno::Errno;
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            if let Some(pid) = self.pid {
                match killpg(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    Ok(()) | Err(Errno::ESRCH) => {}
                    Err(e) => {
                        return Err(anyhow::anyhow!(
                            "sending SIGTERM to process group of '{}' (pid {pid}): {e}",
                            self.label
                        )
                        .into());
                    }
                }
            }
        }

        #[cfg(not(unix))]
        {
            self.child.start_kill()?;
        }

        Ok(())
    }

    /// Kill the process (group) and reap it. No-op if it already exited.
    pub async fn force_kill(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{Signal, killpg};
            use nix::unistd::Pid;

            if let Some(pid) = self.pid {
                // ESRCH just means the group is already gone.
                let _ = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL);
            }
        }

        // Covers the direct child even if the group signal missed it.
        if let Err(e) = self.child.start_kill() {
            debug!(process = %self.label, error = %e, "start_kill after group kill");
        }

        let status = self.child.wait().await?;
        self.exit = Some(status);
        Ok(())
    }

    /// Wait up to `limit` for the process to exit. Returns `true` if it did.
    pub async fn wait_for_exit(&mut self, limit: Duration) -> bool {
        if self.exit.is_some() {
            return true;
        }

        match timeout(limit, self.child.wait()).await {
            Ok(Ok(status)) => {
                self.exit = Some(status);
                true
            }
            Ok(Err(e)) => {
                warn!(process = %self.label, error = %e, "waiting for process failed");
                false
            }
            Err(_) => false,
        }
    }

    /// Graceful-then-forced stop.
    ///
    /// Sends the stop signal, waits up to `grace`, then kills the process if
    /// it is still alive.
    pub async fn terminate(&mut self, grace: Duration) -> Result<StopOutcome> {
        if !self.is_running() {
            return Ok(StopOutcome::AlreadyExited);
        }

        info!(process = %self.label, pid = ?self.pid, "stopping process");
        self.signal_graceful()?;

        if self.wait_for_exit(grace).await {
            return Ok(StopOutcome::Graceful);
        }

        warn!(
            process = %self.label,
            pid = ?self.pid,
            grace_ms = grace.as_millis() as u64,
            "process ignored stop signal; killing"
        );
        self.force_kill().await?;
        Ok(StopOutcome::Forced)
    }
}
