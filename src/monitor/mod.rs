// src/monitor/mod.rs

//! Log-tail event monitoring.
//!
//! - [`milestones`] holds the phrase → kind table used to recognise progress.
//! - [`tail`] reads the last few lines of a log file.
//! - [`session`] runs a deduplicating polling session over the worker logs.

pub mod milestones;
pub mod session;
pub mod tail;

pub use milestones::{Milestone, MilestoneTable};
pub use session::{ConsensusEvent, EventMonitor};
