// src/load.rs

//! Bounded-duration load generation.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::config::validate::ENDPOINT_PLACEHOLDER;
use crate::errors::Result;
use crate::exec::StopOutcome;
use crate::signal::Shutdown;
use crate::supervisor::ProcessSupervisor;

/// Substitute the endpoint into the client launch template.
pub fn client_command(template: &str, endpoint: &str) -> String {
    template.replace(ENDPOINT_PLACEHOLDER, endpoint)
}

/// Runs the client through the supervisor's single client slot, so there is
/// never more than one instance alive.
#[derive(Debug, Clone)]
pub struct LoadGenerator {
    supervisor: Arc<ProcessSupervisor>,
    shutdown: Shutdown,
    command_template: String,
    log_path: PathBuf,
}

impl LoadGenerator {
    pub fn new(
        supervisor: Arc<ProcessSupervisor>,
        shutdown: Shutdown,
        command_template: impl Into<String>,
        log_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            supervisor,
            shutdown,
            command_template: command_template.into(),
            log_path: log_path.into(),
        }
    }

    /// Launch the client against `endpoint`, let it run for `duration`, then
    /// stop it and wait (bounded by the supervisor's grace period).
    ///
    /// Any previous client is stopped before the new one starts. A shutdown
    /// request cuts the run short; the client is still stopped.
    pub async fn run(&self, endpoint: &str, duration: Duration) -> Result<Option<StopOutcome>> {
        let cmd = client_command(&self.command_template, endpoint);
        info!(
            endpoint,
            duration_ms = duration.as_millis() as u64,
            "starting load generator"
        );

        self.supervisor
            .launch_client(&cmd, self.log_path.clone())
            .await?;

        if !self.shutdown.sleep(duration).await {
            info!("load generation interrupted by shutdown request");
        }

        let outcome = self.stop().await?;
        info!(?outcome, "load generation finished");
        Ok(outcome)
    }

    /// Stop the active client, if any. Idempotent.
    pub async fn stop(&self) -> Result<Option<StopOutcome>> {
        self.supervisor.stop_client().await
    }
}
