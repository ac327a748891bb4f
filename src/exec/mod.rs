// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running external commands, using
//! `tokio::process::Command` through the platform shell.
//!
//! - [`command`] runs commands synchronously (build, sweeps) or spawns them
//!   detached with output redirected (workers, client).
//! - [`handle`] provides [`ProcessHandle`], the owned handle to a detached
//!   process with idempotent poll / stop / kill operations.

pub mod command;
pub mod handle;

pub use command::{
    CommandOutput, OutputTarget, run_program, run_sync, shell_command, spawn_detached,
};
pub use handle::{ProcessHandle, StopOutcome};
