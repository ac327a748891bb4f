// src/exec/command.rs

//! Running external commands through the platform shell.
//!
//! Two flavours:
//! - [`run_sync`] blocks (asynchronously) until the command finishes and hands
//!   back its exit code and captured output. A non-zero exit is *data*.
//! - [`spawn_detached`] starts a long-running process with its output going to
//!   a log file (or nowhere) and returns a [`ProcessHandle`] right away.

use std::fs::{self, File};
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info};

use crate::errors::{HerdError, Result};
use crate::exec::handle::ProcessHandle;

/// Captured result of a synchronous command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the process was killed by a signal.
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Where a detached process writes its stdout and stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Truncate/create this file and send both streams to it.
    File(PathBuf),
    Discard,
}

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmdline: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmdline);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmdline);
        c
    }
}

/// Run `cmdline` to completion, capturing stdout/stderr.
///
/// Only a failure to spawn is an error; the exit code is returned as-is.
/// Dropping the returned future kills the command.
pub async fn run_sync(cmdline: &str) -> Result<CommandOutput> {
    debug!(cmd = %cmdline, "running command");
    capture(shell_command(cmdline), cmdline).await
}

/// Like [`run_sync`] but without a shell in between.
///
/// Used for pattern-based process sweeps, where a wrapping `sh -c` would carry
/// the pattern in its own command line and match itself.
pub async fn run_program(program: &str, args: &[&str]) -> Result<CommandOutput> {
    let shown = format!("{program} {}", args.join(" "));
    debug!(cmd = %shown, "running program");

    let mut cmd = Command::new(program);
    cmd.args(args);
    capture(cmd, &shown).await
}

async fn capture(mut cmd: Command, shown: &str) -> Result<CommandOutput> {
    let output = cmd
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| HerdError::Spawn {
            cmd: shown.to_string(),
            source,
        })?;

    let result = CommandOutput {
        code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };

    debug!(cmd = %shown, exit_code = result.code, "command finished");
    Ok(result)
}

/// Spawn `cmdline` without waiting for it.
///
/// The child is started in its own process group (Unix) so that a stop signal
/// reaches everything the shell started. It is *not* killed when the handle is
/// dropped: processes outlive the harness unless explicitly terminated.
pub fn spawn_detached(
    label: impl Into<String>,
    cmdline: &str,
    target: OutputTarget,
) -> Result<ProcessHandle> {
    let label = label.into();
    let mut cmd = shell_command(cmdline);
    cmd.stdin(Stdio::null()).kill_on_drop(false);

    match &target {
        OutputTarget::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            let file = File::create(path)?;
            cmd.stdout(Stdio::from(file.try_clone()?))
                .stderr(Stdio::from(file));
        }
        OutputTarget::Discard => {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
    }

    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|source| HerdError::Spawn {
        cmd: cmdline.to_string(),
        source,
    })?;

    let handle = ProcessHandle::new(label, child);
    info!(
        process = %handle.label(),
        pid = ?handle.pid(),
        cmd = %cmdline,
        "spawned detached process"
    );
    Ok(handle)
}
