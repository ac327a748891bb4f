// src/signal.rs

//! Interrupt handling and cooperative cancellation.
//!
//! [`Shutdown`] is the shared cancellation flag. The orchestrator checks it
//! between steps and races every fixed sleep against it; the signal task flips
//! it and then runs the same idempotent cleanup routine used on the failure
//! path ([`crate::orchestrator::cleanup::shutdown_cluster`]).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::orchestrator::cleanup::shutdown_cluster;
use crate::supervisor::ProcessSupervisor;

/// Shared, clonable "please stop" flag.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Raise the flag. Raising it again is harmless.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolve once the flag is raised.
    pub async fn triggered(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|raised| *raised).await;
    }

    /// Sleep for `duration` unless shutdown is requested first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if interrupted.
    pub async fn sleep(&self, duration: Duration) -> bool {
        if self.is_triggered() {
            return false;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.triggered() => false,
        }
    }
}

/// Handle an interrupt: raise the flag, stop the client, stop every worker.
///
/// Safe with nothing started and safe to call repeatedly.
pub async fn on_interrupt(supervisor: &ProcessSupervisor, shutdown: &Shutdown) {
    info!("interrupt received; cleaning up managed processes");
    shutdown.trigger();
    shutdown_cluster(supervisor).await;
}

/// Spawn the background task that reacts to Ctrl-C and SIGTERM.
///
/// Every received signal runs [`on_interrupt`]; the task keeps listening so a
/// second Ctrl-C simply repeats the (idempotent) cleanup.
pub fn install(supervisor: Arc<ProcessSupervisor>, shutdown: Shutdown) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        let mut term = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM; only Ctrl-C will be handled");
                None
            }
        };

        loop {
            #[cfg(unix)]
            let received = {
                let sigterm = async {
                    match term.as_mut() {
                        Some(s) => {
                            s.recv().await;
                        }
                        None => std::future::pending::<()>().await,
                    }
                };
                tokio::select! {
                    res = tokio::signal::ctrl_c() => res.map(|_| "SIGINT"),
                    _ = sigterm => Ok("SIGTERM"),
                }
            };

            #[cfg(not(unix))]
            let received = tokio::signal::ctrl_c().await.map(|_| "Ctrl-C");

            match received {
                Ok(name) => {
                    info!(signal = name, "termination requested");
                    on_interrupt(&supervisor, &shutdown).await;
                }
                Err(e) => {
                    error!(error = %e, "failed to listen for Ctrl+C");
                    return;
                }
            }
        }
    })
}
