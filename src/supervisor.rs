// src/supervisor.rs

//! Lifecycle owner for every external process of one run.
//!
//! The supervisor tracks the worker processes (ids `1..=n`) and the single
//! load-generator slot. It is shared as `Arc<ProcessSupervisor>` between the
//! main sequence and the signal task; the process table sits behind one async
//! mutex, so two racing cleanups serialize on the same handles, and since
//! every handle operation is idempotent the second one finds nothing to do.

use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::model::node_log_path;
use crate::config::validate::ID_PLACEHOLDER;
use crate::errors::Result;
use crate::exec::{OutputTarget, ProcessHandle, StopOutcome, spawn_detached};
use crate::signal::Shutdown;
use crate::types::ProcessState;

/// Id reserved for the load generator in logs and the process table.
pub const CLIENT_ID: u32 = 0;

/// One supervised process.
#[derive(Debug)]
pub struct ManagedProcess {
    pub id: u32,
    pub command: String,
    pub log_path: Option<PathBuf>,
    pub state: ProcessState,
    handle: ProcessHandle,
}

impl ManagedProcess {
    fn new(id: u32, command: String, log_path: Option<PathBuf>, handle: ProcessHandle) -> Self {
        Self {
            id,
            command,
            log_path,
            state: ProcessState::Starting,
            handle,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.handle.pid()
    }

    /// Refresh `state` from a non-blocking liveness poll.
    fn poll(&mut self) -> ProcessState {
        if self.state.is_final() {
            return self.state;
        }
        self.state = if self.handle.is_running() {
            ProcessState::Running
        } else {
            ProcessState::Exited
        };
        self.state
    }

    async fn terminate(&mut self, grace: Duration) -> Result<StopOutcome> {
        let outcome = self.handle.terminate(grace).await?;
        self.mark_stopped(outcome);
        Ok(outcome)
    }

    fn mark_stopped(&mut self, outcome: StopOutcome) {
        self.state = match outcome {
            StopOutcome::AlreadyExited if self.state != ProcessState::Terminated => {
                ProcessState::Exited
            }
            StopOutcome::AlreadyExited => ProcessState::Terminated,
            StopOutcome::Graceful | StopOutcome::Forced => ProcessState::Terminated,
        };
    }
}

/// Result of [`ProcessSupervisor::start`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub requested: usize,
    /// Per-worker state after the warm-up poll, in id order.
    pub statuses: Vec<(u32, ProcessState)>,
}

impl StartReport {
    /// True iff every requested worker is still running.
    pub fn healthy(&self) -> bool {
        self.statuses.len() == self.requested && self.failed_ids().is_empty()
    }

    pub fn healthy_count(&self) -> usize {
        self.statuses
            .iter()
            .filter(|(_, s)| *s == ProcessState::Running)
            .count()
    }

    pub fn failed_ids(&self) -> Vec<u32> {
        self.statuses
            .iter()
            .filter(|(_, s)| *s != ProcessState::Running)
            .map(|(id, _)| *id)
            .collect()
    }
}

#[derive(Debug, Default)]
struct ProcessTable {
    workers: Vec<ManagedProcess>,
    /// Workers from an earlier `start` call; still covered by `terminate_all`.
    retired: Vec<ManagedProcess>,
    client: Option<ManagedProcess>,
}

#[derive(Debug)]
pub struct ProcessSupervisor {
    log_dir: PathBuf,
    grace_period: Duration,
    shutdown: Shutdown,
    table: Mutex<ProcessTable>,
}

/// Substitute the worker id into a launch template.
pub fn worker_command(template: &str, id: u32) -> String {
    template.replace(ID_PLACEHOLDER, &id.to_string())
}

impl ProcessSupervisor {
    pub fn new(log_dir: impl Into<PathBuf>, grace_period: Duration, shutdown: Shutdown) -> Self {
        Self {
            log_dir: log_dir.into(),
            grace_period,
            shutdown,
            table: Mutex::new(ProcessTable::default()),
        }
    }

    /// Launch workers `1..=n`, wait `warmup`, then poll each one.
    ///
    /// A worker that fails to spawn is reported as `Exited`. The warm-up wait
    /// ends early on shutdown; the poll still runs so the report reflects
    /// reality.
    pub async fn start(&self, n: usize, command_template: &str, warmup: Duration) -> StartReport {
        let mut statuses: Vec<(u32, ProcessState)> = Vec::with_capacity(n);

        {
            let mut table = self.table.lock().await;
            let previous = std::mem::take(&mut table.workers);
            if !previous.is_empty() {
                debug!(count = previous.len(), "retiring workers from an earlier start");
                table.retired.extend(previous);
            }

            for id in 1..=n as u32 {
                if self.shutdown.is_triggered() {
                    warn!(node = id, "shutdown requested; not launching remaining workers");
                    statuses.push((id, ProcessState::Exited));
                    continue;
                }

                let cmd = worker_command(command_template, id);
                let log_path = node_log_path(&self.log_dir, id);
                match spawn_detached(
                    format!("node{id}"),
                    &cmd,
                    OutputTarget::File(log_path.clone()),
                ) {
                    Ok(handle) => {
                        info!(node = id, pid = ?handle.pid(), log = %log_path.display(), "worker launched");
                        table
                            .workers
                            .push(ManagedProcess::new(id, cmd, Some(log_path), handle));
                    }
                    Err(e) => {
                        error!(node = id, error = %e, "failed to launch worker");
                        statuses.push((id, ProcessState::Exited));
                    }
                }
            }
        }

        info!(warmup_ms = warmup.as_millis() as u64, "waiting for workers to initialise");
        if !self.shutdown.sleep(warmup).await {
            warn!("warm-up interrupted by shutdown request");
        }

        {
            let mut table = self.table.lock().await;
            for proc in table.workers.iter_mut() {
                let state = proc.poll();
                if state == ProcessState::Running {
                    info!(node = proc.id, "worker running");
                } else {
                    error!(
                        node = proc.id,
                        exit_code = ?proc.handle.exit_code(),
                        state = %state,
                        "worker failed to start"
                    );
                }
                statuses.push((proc.id, state));
            }
        }

        statuses.sort_by_key(|(id, _)| *id);
        StartReport {
            requested: n,
            statuses,
        }
    }

    /// Current state of every tracked worker (not including retired ones).
    pub async fn statuses(&self) -> Vec<(u32, ProcessState)> {
        let mut table = self.table.lock().await;
        table
            .workers
            .iter_mut()
            .map(|p| (p.id, p.poll()))
            .collect()
    }

    /// Number of workers alive right now.
    pub async fn live_workers(&self) -> usize {
        self.statuses()
            .await
            .into_iter()
            .filter(|(_, s)| *s == ProcessState::Running)
            .count()
    }

    /// Stop one tracked worker by id. Unknown ids and exited workers are no-ops.
    pub async fn terminate(&self, id: u32) -> Result<Option<StopOutcome>> {
        let mut table = self.table.lock().await;
        match table.workers.iter_mut().find(|p| p.id == id) {
            Some(proc) => Ok(Some(proc.terminate(self.grace_period).await?)),
            None => Ok(None),
        }
    }

    /// Stop the client, every worker, and any retired worker.
    ///
    /// All live processes get the stop signal first, then share one grace
    /// period, then the stragglers are killed. Returns how many processes were
    /// actually stopped by this call (zero on a repeat call).
    pub async fn terminate_all(&self) -> usize {
        let mut table = self.table.lock().await;
        let ProcessTable {
            workers,
            retired,
            client,
        } = &mut *table;

        let mut live: Vec<&mut ManagedProcess> = client
            .iter_mut()
            .chain(workers.iter_mut())
            .chain(retired.iter_mut())
            .filter_map(|p| (p.poll() == ProcessState::Running).then_some(p))
            .collect();

        if live.is_empty() {
            debug!("terminate_all: nothing running");
            return 0;
        }

        for proc in live.iter_mut() {
            info!(id = proc.id, pid = ?proc.pid(), "sending stop signal");
            if let Err(e) = proc.handle.signal_graceful() {
                warn!(id = proc.id, error = %e, "graceful stop failed");
            }
        }

        let deadline = Instant::now() + self.grace_period;
        let mut stopped = 0;
        for proc in live.iter_mut() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = if proc.handle.wait_for_exit(remaining).await {
                StopOutcome::Graceful
            } else {
                warn!(id = proc.id, pid = ?proc.pid(), "process ignored stop signal; killing");
                if let Err(e) = proc.handle.force_kill().await {
                    error!(id = proc.id, error = %e, "failed to kill process");
                    continue;
                }
                StopOutcome::Forced
            };
            proc.mark_stopped(outcome);
            stopped += 1;
        }

        info!(stopped, "managed processes stopped");
        stopped
    }

    /// Launch the load generator, stopping any previous instance first.
    pub async fn launch_client(&self, command: &str, log_path: PathBuf) -> Result<()> {
        let mut table = self.table.lock().await;

        if let Some(previous) = table.client.as_mut() {
            if previous.poll() == ProcessState::Running {
                info!("stopping previous client before launching a new one");
                previous.terminate(self.grace_period).await?;
            }
        }

        let handle = spawn_detached("client", command, OutputTarget::File(log_path.clone()))?;
        let mut proc = ManagedProcess::new(CLIENT_ID, command.to_string(), Some(log_path), handle);
        proc.state = ProcessState::Running;
        table.client = Some(proc);
        Ok(())
    }

    /// Gracefully stop the client, if any. Idempotent.
    pub async fn stop_client(&self) -> Result<Option<StopOutcome>> {
        let mut table = self.table.lock().await;
        match table.client.as_mut() {
            Some(proc) => Ok(Some(proc.terminate(self.grace_period).await?)),
            None => Ok(None),
        }
    }

    pub async fn client_active(&self) -> bool {
        let mut table = self.table.lock().await;
        table
            .client
            .as_mut()
            .is_some_and(|p| p.poll() == ProcessState::Running)
    }
}
