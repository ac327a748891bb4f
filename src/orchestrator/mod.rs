// src/orchestrator/mod.rs

//! The run sequence.
//!
//! [`Orchestrator::run`] walks the [`RunState`] machine one step at a time:
//! build, sweep stale processes, start the workers, check ports, drive load,
//! monitor the logs, report. Build and start failures abort; port problems
//! only warn; load/monitor problems are logged and the run still reports.
//! The shared [`Shutdown`] flag is checked between every step.

pub mod cleanup;
pub mod state;

use std::sync::Arc;

use chrono::Local;
use tracing::{error, info, warn};

use crate::config::HarnessConfig;
use crate::errors::HerdError;
use crate::exec::run_sync;
use crate::load::LoadGenerator;
use crate::monitor::EventMonitor;
use crate::ports;
use crate::report;
use crate::signal::Shutdown;
use crate::supervisor::ProcessSupervisor;

pub use state::{RunOutcome, RunState};

#[derive(Debug)]
pub struct Orchestrator {
    config: HarnessConfig,
    supervisor: Arc<ProcessSupervisor>,
    shutdown: Shutdown,
    history: Vec<RunState>,
}

impl Orchestrator {
    pub fn new(config: HarnessConfig) -> Self {
        let shutdown = Shutdown::new();
        let supervisor = Arc::new(ProcessSupervisor::new(
            config.log_dir.clone(),
            config.cluster.grace_period,
            shutdown.clone(),
        ));
        Self {
            config,
            supervisor,
            shutdown,
            history: vec![RunState::Init],
        }
    }

    /// The run's process owner, for the signal task and callers' cleanup.
    pub fn supervisor(&self) -> Arc<ProcessSupervisor> {
        Arc::clone(&self.supervisor)
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Every state entered so far, starting with `Init`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn state(&self) -> RunState {
        *self.history.last().unwrap_or(&RunState::Init)
    }

    fn enter(&mut self, next: RunState) {
        let current = self.state();
        debug_assert!(current.allows(next), "illegal transition {current} -> {next}");
        info!(from = %current, to = %next, "run state");
        self.history.push(next);
    }

    /// Check the shutdown flag; on request, finish in `Interrupted`.
    async fn interrupted(&mut self) -> Option<RunOutcome> {
        if !self.shutdown.is_triggered() {
            return None;
        }
        warn!(state = %self.state(), "run interrupted");
        self.enter(RunState::Interrupted);
        cleanup::shutdown_cluster(&self.supervisor).await;
        Some(RunOutcome::Interrupted)
    }

    fn abort(&mut self, err: HerdError) -> RunOutcome {
        error!(error = %err, state = %self.state(), "run aborted");
        self.enter(RunState::Aborted);
        RunOutcome::Aborted(err)
    }

    /// Execute the whole sequence once.
    ///
    /// On success the workers are deliberately left running.
    pub async fn run(&mut self) -> RunOutcome {
        let start_time = Local::now();
        let cfg = self.config.clone();
        let mut errors: Vec<String> = Vec::new();

        info!(nodes = cfg.cluster.nodes, "starting cluster run");

        // Building
        self.enter(RunState::Building);
        info!(cmd = %cfg.build_cmd, "building");
        let built = tokio::select! {
            res = run_sync(&cfg.build_cmd) => Some(res),
            _ = self.shutdown.triggered() => None,
        };
        match built {
            Some(Ok(out)) if out.success() => info!("build succeeded"),
            Some(Ok(out)) => {
                error!(exit_code = out.code, stderr = %out.stderr.trim(), "build failed");
                return self.abort(HerdError::BuildFailure { code: out.code });
            }
            Some(Err(e)) => return self.abort(e),
            // Dropping the build future kills the build process.
            None => warn!("build cancelled by shutdown request"),
        }
        if let Some(outcome) = self.interrupted().await {
            return outcome;
        }

        // Cleaning
        self.enter(RunState::Cleaning);
        cleanup::sweep_stale(&cfg.cluster.stale_pattern).await;
        self.shutdown.sleep(cfg.cluster.settle).await;
        if let Some(outcome) = self.interrupted().await {
            return outcome;
        }

        // Starting
        self.enter(RunState::Starting);
        let started = self
            .supervisor
            .start(cfg.cluster.nodes, &cfg.cluster.worker_cmd, cfg.cluster.warmup)
            .await;
        if let Some(outcome) = self.interrupted().await {
            return outcome;
        }
        if !started.healthy() {
            let failed = started.failed_ids();
            error!(
                healthy = started.healthy_count(),
                failed = failed.len(),
                failed_ids = ?failed,
                "workers failed to start"
            );
            return self.abort(HerdError::ProcessStartFailure {
                requested: started.requested,
                failed: failed.len(),
            });
        }
        info!(healthy = started.healthy_count(), "all workers running");

        // VerifyingPorts
        self.enter(RunState::VerifyingPorts);
        let port_statuses = ports::check(&cfg.ports).await;
        if !ports::all_listening(&port_statuses) {
            warn!("some ports are not listening; continuing anyway");
        }
        if let Some(outcome) = self.interrupted().await {
            return outcome;
        }

        // Loading
        self.enter(RunState::Loading);
        let load = LoadGenerator::new(
            self.supervisor(),
            self.shutdown.clone(),
            cfg.client.cmd.clone(),
            cfg.client_log_path(),
        );
        if let Err(e) = load.run(&cfg.client.endpoint, cfg.client.duration).await {
            error!(error = %e, "load generation failed");
            errors.push(format!("load generation: {e}"));
        }
        if let Some(outcome) = self.interrupted().await {
            return outcome;
        }

        // Monitoring
        self.enter(RunState::Monitoring);
        let monitor = EventMonitor::new(cfg.monitor.milestones.clone(), cfg.monitor.tail_lines);
        let events = monitor
            .observe(
                &cfg.node_log_paths(),
                cfg.monitor.duration,
                cfg.monitor.poll_interval,
                &self.shutdown,
            )
            .await;
        if let Some(outcome) = self.interrupted().await {
            return outcome;
        }

        // Reporting
        self.enter(RunState::Reporting);
        let live = self.supervisor.live_workers().await;
        let final_ports = ports::check(&cfg.ports).await;
        let run_report = report::build(start_time, Local::now(), live, &final_ports, &events);
        let report_path = cfg.report_path();

        let persisted = match report::persist(&run_report, &report_path) {
            Ok(()) => {
                report::log_summary(&run_report, cfg.cluster.nodes, &report_path);
                true
            }
            Err(e) => {
                error!(error = %e, path = %report_path.display(), "failed to write report");
                errors.push(format!("report: {e}"));
                false
            }
        };

        self.enter(RunState::Done);
        self.log_hints();

        if errors.is_empty() {
            RunOutcome::Completed(run_report)
        } else {
            RunOutcome::Failed {
                report: persisted.then_some(run_report),
                errors,
            }
        }
    }

    fn log_hints(&self) {
        info!("run complete; the cluster keeps running");
        info!(
            "  follow a node: tail -f {}",
            self.config.node_log_path(1).display()
        );
        info!("  stop the cluster: clusterherd stop");
        info!("  check on it: clusterherd status");
    }
}
