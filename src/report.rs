// src/report.rs

//! The end-of-run report.
//!
//! [`build`] is pure aggregation; [`persist`] is the only step that touches
//! the filesystem and is called once per run.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::Result;
use crate::monitor::ConsensusEvent;
use crate::ports::PortStatus;

/// Summary of one orchestration run. Serialized as JSON:
///
/// ```json
/// {
///   "start_time": "2024-05-01T10:00:00.000+02:00",
///   "end_time": "2024-05-01T10:00:45.120+02:00",
///   "duration": 45.12,
///   "nodes_started": 4,
///   "consensus_events": 17,
///   "ports_status": { "1234": true, "1235": true, "1236": false, "1237": true }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub start_time: DateTime<Local>,
    pub end_time: DateTime<Local>,
    /// Seconds between `start_time` and `end_time`.
    pub duration: f64,
    /// Workers still alive when the report was built.
    pub nodes_started: usize,
    /// Distinct milestone lines seen during monitoring.
    pub consensus_events: usize,
    pub ports_status: BTreeMap<u16, bool>,
}

/// Aggregate a run's observations into a [`Report`].
pub fn build(
    start_time: DateTime<Local>,
    end_time: DateTime<Local>,
    live_workers: usize,
    ports: &[PortStatus],
    events: &[ConsensusEvent],
) -> Report {
    let elapsed = end_time.signed_duration_since(start_time);
    let duration = elapsed
        .to_std()
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0);

    Report {
        start_time,
        end_time,
        duration,
        nodes_started: live_workers,
        consensus_events: events.len(),
        ports_status: crate::ports::to_map(ports),
    }
}

/// Write the report as pretty JSON, replacing any previous file.
pub fn persist(report: &Report, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json).with_context(|| format!("writing report to {:?}", path))?;
    Ok(())
}

/// Read a previously persisted report.
pub fn load(path: &Path) -> Result<Report> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Operator-facing summary lines.
pub fn log_summary(report: &Report, requested_nodes: usize, path: &Path) {
    info!("run report summary:");
    info!("  duration: {:.1}s", report.duration);
    info!("  live nodes: {}/{}", report.nodes_started, requested_nodes);
    info!("  consensus events: {}", report.consensus_events);
    info!("  report file: {}", path.display());
}
