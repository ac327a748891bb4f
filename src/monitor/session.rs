// src/monitor/session.rs

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use crate::monitor::milestones::MilestoneTable;
use crate::monitor::tail::read_tail;
use crate::signal::Shutdown;
use crate::types::MilestoneKind;

/// A log line taken as evidence of protocol progress.
///
/// Identity is the trimmed `line`; `kind` and `source` are informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusEvent {
    pub line: String,
    pub kind: MilestoneKind,
    pub source: PathBuf,
}

/// One monitoring session over a fixed set of log files.
///
/// Keeps the events in first-seen order and never records the same trimmed
/// line twice, no matter how many polls still see it in the tail window or
/// how many files contain it.
#[derive(Debug)]
pub struct EventMonitor {
    milestones: MilestoneTable,
    tail_lines: usize,
    seen: HashSet<String>,
    events: Vec<ConsensusEvent>,
}

impl EventMonitor {
    pub fn new(milestones: MilestoneTable, tail_lines: usize) -> Self {
        Self {
            milestones,
            tail_lines,
            seen: HashSet::new(),
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[ConsensusEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ConsensusEvent> {
        self.events
    }

    /// Record milestone lines from `lines`; returns how many were new.
    pub fn ingest(&mut self, source: &Path, lines: &[String]) -> usize {
        let mut added = 0;
        for raw in lines {
            let Some(kind) = self.milestones.classify(raw) else {
                continue;
            };

            let line = raw.trim();
            if self.seen.contains(line) {
                continue;
            }

            self.seen.insert(line.to_string());
            info!(source = %source.display(), kind = %kind, "consensus event: {}", line);
            self.events.push(ConsensusEvent {
                line: line.to_string(),
                kind,
                source: source.to_path_buf(),
            });
            added += 1;
        }
        added
    }

    /// Scan the tail of every log once.
    ///
    /// A file that cannot be read right now (not created yet, rotated,
    /// locked) just contributes nothing to this poll.
    pub async fn poll_once(&mut self, log_paths: &[PathBuf]) -> usize {
        let mut added = 0;
        for path in log_paths {
            match read_tail(path, self.tail_lines).await {
                Ok(lines) => added += self.ingest(path, &lines),
                Err(e) => {
                    debug!(log = %path.display(), error = %e, "skipping unreadable log this poll");
                }
            }
        }
        added
    }

    /// Poll every `poll_interval` until `session` has elapsed or shutdown is
    /// requested, then return the collected events.
    pub async fn observe(
        mut self,
        log_paths: &[PathBuf],
        session: Duration,
        poll_interval: Duration,
        shutdown: &Shutdown,
    ) -> Vec<ConsensusEvent> {
        info!(
            logs = log_paths.len(),
            session_ms = session.as_millis() as u64,
            "monitoring consensus progress"
        );

        let deadline = Instant::now() + session;
        let mut polls = 0u32;

        while Instant::now() < deadline && !shutdown.is_triggered() {
            self.poll_once(log_paths).await;
            polls += 1;

            let remaining = deadline.saturating_duration_since(Instant::now());
            if !shutdown.sleep(poll_interval.min(remaining)).await {
                info!("monitoring interrupted by shutdown request");
                break;
            }
        }

        info!(polls, events = self.events.len(), "monitoring session finished");
        self.into_events()
    }
}
