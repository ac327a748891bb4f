// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod load;
pub mod logging;
pub mod monitor;
pub mod orchestrator;
pub mod ports;
pub mod report;
pub mod signal;
pub mod supervisor;
pub mod types;

use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::{error, info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{HarnessConfig, load_and_validate};
use crate::exec::run_sync;
use crate::orchestrator::cleanup::{list_by_pattern, shutdown_cluster, stop_by_pattern, sweep_stale};
use crate::orchestrator::{Orchestrator, RunOutcome};

/// High-level entry point used by `main.rs`.
///
/// Loads the config and dispatches the selected subcommand. Returns an error
/// for any outcome that should produce a non-zero exit status.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    match args.command {
        Command::Build => build(&cfg).await,
        Command::Cleanup => {
            sweep_stale(&cfg.cluster.stale_pattern).await;
            Ok(())
        }
        Command::Run { dry_run: true } => {
            print_dry_run(&cfg);
            Ok(())
        }
        Command::Run { dry_run: false } => run_cluster(cfg).await,
        Command::Stop => {
            stop_by_pattern(&cfg.cluster.stale_pattern, cfg.cluster.grace_period).await;
            Ok(())
        }
        Command::Status => {
            print_status(&cfg).await;
            Ok(())
        }
    }
}

async fn build(cfg: &HarnessConfig) -> Result<()> {
    let out = run_sync(&cfg.build_cmd).await?;
    if out.success() {
        info!("build succeeded");
        Ok(())
    } else {
        eprint!("{}", out.stderr);
        bail!("build failed with exit code {}", out.code)
    }
}

/// Full orchestration run with signal handling.
///
/// - Completed: processes keep running, exit 0.
/// - Interrupted: the signal path already cleaned up, exit 0.
/// - Aborted (build/start): clean up what was launched, then exit 1.
/// - Failed (load/monitor/report): leave everything for inspection, exit 1.
async fn run_cluster(cfg: HarnessConfig) -> Result<()> {
    let mut orchestrator = Orchestrator::new(cfg);
    let supervisor = orchestrator.supervisor();
    let signals = signal::install(supervisor.clone(), orchestrator.shutdown());

    let outcome = orchestrator.run().await;
    signals.abort();

    match outcome {
        RunOutcome::Completed(_) => Ok(()),
        RunOutcome::Interrupted => {
            info!("run interrupted; managed processes stopped");
            Ok(())
        }
        RunOutcome::Aborted(err) => {
            warn!("cleaning up after aborted run");
            shutdown_cluster(&supervisor).await;
            Err(err.into())
        }
        RunOutcome::Failed { errors, .. } => {
            for e in &errors {
                error!("{e}");
            }
            bail!(
                "run finished with {} error(s); processes left running for inspection",
                errors.len()
            )
        }
    }
}

/// Dry-run output: print the resolved plan.
fn print_dry_run(cfg: &HarnessConfig) {
    println!("clusterherd dry-run");
    println!("  build: {}", cfg.build_cmd);
    println!("  stale pattern: {}", cfg.cluster.stale_pattern);
    println!();

    println!(
        "workers ({}), warm-up {:?}, grace {:?}:",
        cfg.cluster.nodes, cfg.cluster.warmup, cfg.cluster.grace_period
    );
    for id in 1..=cfg.cluster.nodes as u32 {
        println!(
            "  - node{id}: {} > {}",
            supervisor::worker_command(&cfg.cluster.worker_cmd, id),
            cfg.node_log_path(id).display()
        );
    }
    println!();

    println!("ports: {:?}", cfg.ports);
    println!(
        "client: {} for {:?} > {}",
        load::client_command(&cfg.client.cmd, &cfg.client.endpoint),
        cfg.client.duration,
        cfg.client_log_path().display()
    );
    println!(
        "monitor: {:?} every {:?}, last {} lines",
        cfg.monitor.duration, cfg.monitor.poll_interval, cfg.monitor.tail_lines
    );
    for m in cfg.monitor.milestones.entries() {
        println!("  - {:?} => {}", m.phrase, m.kind);
    }
    println!("report: {}", cfg.report_path().display());
}

async fn print_status(cfg: &HarnessConfig) {
    let procs = list_by_pattern(&cfg.cluster.stale_pattern).await;
    println!("processes matching {:?}: {}", cfg.cluster.stale_pattern, procs.len());
    for p in &procs {
        println!("  {p}");
    }

    println!("ports:");
    for status in ports::check(&cfg.ports).await {
        let mark = if status.listening { "listening" } else { "not listening" };
        println!("  {}: {mark}", status.port);
    }

    let path = cfg.report_path();
    match report::load(&path) {
        Ok(r) => {
            println!("last report ({}):", path.display());
            println!("  finished: {}", r.end_time);
            println!("  duration: {:.1}s", r.duration);
            println!("  live nodes: {}/{}", r.nodes_started, cfg.cluster.nodes);
            println!("  consensus events: {}", r.consensus_events);
        }
        Err(_) => println!("no report at {}", path.display()),
    }
}
