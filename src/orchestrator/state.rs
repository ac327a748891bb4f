// src/orchestrator/state.rs

use std::fmt;

use crate::errors::HerdError;
use crate::report::Report;

/// Steps of one orchestration run.
///
/// Happy path: `Init → Building → Cleaning → Starting → VerifyingPorts →
/// Loading → Monitoring → Reporting → Done`. `Aborted` is reachable from
/// `Building` and `Starting`; `Interrupted` from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Building,
    Cleaning,
    Starting,
    VerifyingPorts,
    Loading,
    Monitoring,
    Reporting,
    Done,
    Aborted,
    Interrupted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Aborted | RunState::Interrupted)
    }

    /// Whether `next` may follow `self`.
    pub fn allows(self, next: RunState) -> bool {
        use RunState::*;

        if self.is_terminal() {
            return false;
        }
        if next == Interrupted {
            return true;
        }

        matches!(
            (self, next),
            (Init, Building)
                | (Building, Cleaning)
                | (Building, Aborted)
                | (Cleaning, Starting)
                | (Starting, VerifyingPorts)
                | (Starting, Aborted)
                | (VerifyingPorts, Loading)
                | (Loading, Monitoring)
                | (Monitoring, Reporting)
                | (Reporting, Done)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every step ran; processes are left running.
    Completed(Report),
    /// Build or start failed. Nothing after the failing step ran.
    Aborted(HerdError),
    /// A shutdown request ended the run; managed processes were stopped.
    Interrupted,
    /// The sequence reached the end but a load/monitor/report step failed.
    /// `report` is present when it could still be built and persisted.
    Failed {
        report: Option<Report>,
        errors: Vec<String>,
    },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Completed(_) | RunOutcome::Interrupted)
    }

    pub fn report(&self) -> Option<&Report> {
        match self {
            RunOutcome::Completed(r) => Some(r),
            RunOutcome::Failed { report, .. } => report.as_ref(),
            _ => None,
        }
    }
}
