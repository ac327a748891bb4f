// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `clusterherd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "clusterherd",
    version,
    about = "Build, launch, load and watch a local consensus cluster.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Clusterherd.toml` in the current working directory. If that
    /// file does not exist the built-in four-node defaults are used.
    #[arg(long, global = true, value_name = "PATH", default_value = "Clusterherd.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CLUSTERHERD_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the build command only.
    Build,
    /// Kill leftover worker processes matching the stale pattern.
    Cleanup,
    /// Build, start the cluster, drive load, monitor it and write a report.
    Run {
        /// Print the resolved plan without executing anything.
        #[arg(long)]
        dry_run: bool,
    },
    /// Stop every running worker and client (safe if nothing is running).
    Stop,
    /// Show matching processes, port state and the last report.
    Status,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
