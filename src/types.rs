use std::fmt;
use std::time::Duration;

use serde::Deserialize;

/// Lifecycle state of a process tracked by the supervisor.
///
/// - `Starting`: spawned, liveness not yet confirmed.
/// - `Running`: observed alive by the last poll.
/// - `Exited`: exited on its own (or before we got to stop it).
/// - `Terminated`: stopped by us (graceful or forced).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    Starting,
    Running,
    Exited,
    Terminated,
}

impl ProcessState {
    /// True for the two states from which no further transition happens.
    pub fn is_final(self) -> bool {
        matches!(self, ProcessState::Exited | ProcessState::Terminated)
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::Starting => "starting",
            ProcessState::Running => "running",
            ProcessState::Exited => "exited",
            ProcessState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Kind of protocol progress a milestone phrase is taken as evidence of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    VertexCommitted,
    RoundReached,
    WaveFinished,
    LeaderSelected,
    Other,
}

impl Default for MilestoneKind {
    fn default() -> Self {
        MilestoneKind::Other
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MilestoneKind::VertexCommitted => "vertex_committed",
            MilestoneKind::RoundReached => "round_reached",
            MilestoneKind::WaveFinished => "wave_finished",
            MilestoneKind::LeaderSelected => "leader_selected",
            MilestoneKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Parse a simple duration string like `"3s"`, `"250ms"`, `"1m"`, `"2h"`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let scaled = |factor: u64| {
        value
            .checked_mul(factor)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{}' is too large", s))
    };

    match unit.as_str() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "m" => scaled(60),
        "h" => scaled(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{}'; expected ms, s, m, or h",
            unit
        )),
    }
}
