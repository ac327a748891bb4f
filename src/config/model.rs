// src/config/model.rs

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::monitor::MilestoneTable;
use crate::types::MilestoneKind;

/// Raw configuration as read from a TOML file.
///
/// ```toml
/// ports = [1234, 1235, 1236, 1237]
///
/// [build]
/// cmd = "cargo build --quiet"
///
/// [cluster]
/// nodes = 4
/// worker_cmd = "cargo run --package node --bin node -- run --id {id}"
/// warmup = "5s"
///
/// [client]
/// cmd = "cargo run --package node --bin client -- {endpoint}"
/// endpoint = "127.0.0.1:1244"
/// duration = "8s"
///
/// [monitor]
/// duration = "30s"
/// poll_interval = "2s"
///
/// [[monitor.milestone]]
/// phrase = "Vertex committed"
/// kind = "vertex_committed"
/// ```
///
/// Every section is optional; the defaults describe the reference four-node
/// deployment. Durations stay as strings here and are parsed during
/// validation (see [`HarnessConfig`]).
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub build: BuildSection,

    #[serde(default)]
    pub cluster: ClusterSection,

    /// TCP ports expected to be listening once the cluster is up.
    #[serde(default = "default_ports")]
    pub ports: Vec<u16>,

    #[serde(default)]
    pub client: ClientSection,

    #[serde(default)]
    pub monitor: MonitorSection,

    #[serde(default)]
    pub output: OutputSection,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            build: BuildSection::default(),
            cluster: ClusterSection::default(),
            ports: default_ports(),
            client: ClientSection::default(),
            monitor: MonitorSection::default(),
            output: OutputSection::default(),
        }
    }
}

fn default_ports() -> Vec<u16> {
    vec![1234, 1235, 1236, 1237]
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildSection {
    #[serde(default = "default_build_cmd")]
    pub cmd: String,
}

fn default_build_cmd() -> String {
    "cargo build --quiet".to_string()
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            cmd: default_build_cmd(),
        }
    }
}

/// `[cluster]` section: how workers are launched and supervised.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterSection {
    #[serde(default = "default_nodes")]
    pub nodes: usize,

    /// Launch command; every `{id}` is replaced with the worker id (1..=nodes).
    #[serde(default = "default_worker_cmd")]
    pub worker_cmd: String,

    /// `pkill -f` pattern matching workers left over from earlier runs.
    #[serde(default = "default_stale_pattern")]
    pub stale_pattern: String,

    #[serde(default = "default_warmup")]
    pub warmup: String,

    /// How long a SIGTERM'd process gets before it is killed.
    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    /// Pause after the stale-process sweep.
    #[serde(default = "default_settle")]
    pub settle: String,
}

fn default_nodes() -> usize {
    4
}

fn default_worker_cmd() -> String {
    "cargo run --package node --bin node -- run --id {id}".to_string()
}

fn default_stale_pattern() -> String {
    "cargo run --package node".to_string()
}

fn default_warmup() -> String {
    "5s".to_string()
}

fn default_grace_period() -> String {
    "2s".to_string()
}

fn default_settle() -> String {
    "2s".to_string()
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            worker_cmd: default_worker_cmd(),
            stale_pattern: default_stale_pattern(),
            warmup: default_warmup(),
            grace_period: default_grace_period(),
            settle: default_settle(),
        }
    }
}

/// `[client]` section: the load generator.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSection {
    /// Launch command; `{endpoint}` is replaced with [`ClientSection::endpoint`].
    #[serde(default = "default_client_cmd")]
    pub cmd: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_client_duration")]
    pub duration: String,
}

fn default_client_cmd() -> String {
    "cargo run --package node --bin client -- {endpoint}".to_string()
}

fn default_endpoint() -> String {
    "127.0.0.1:1244".to_string()
}

fn default_client_duration() -> String {
    "8s".to_string()
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            cmd: default_client_cmd(),
            endpoint: default_endpoint(),
            duration: default_client_duration(),
        }
    }
}

/// `[monitor]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSection {
    #[serde(default = "default_monitor_duration")]
    pub duration: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Number of trailing lines inspected per log file on each poll.
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,

    /// `[[monitor.milestone]]` entries. Empty means "use the built-in table".
    #[serde(default, rename = "milestone")]
    pub milestones: Vec<MilestoneSpec>,
}

fn default_monitor_duration() -> String {
    "30s".to_string()
}

fn default_poll_interval() -> String {
    "2s".to_string()
}

fn default_tail_lines() -> usize {
    10
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            duration: default_monitor_duration(),
            poll_interval: default_poll_interval(),
            tail_lines: default_tail_lines(),
            milestones: Vec::new(),
        }
    }
}

/// One `[[monitor.milestone]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneSpec {
    pub phrase: String,
    #[serde(default)]
    pub kind: MilestoneKind,
}

/// `[output]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// File name of the run report, relative to `log_dir`.
    #[serde(default = "default_report_file")]
    pub report_file: String,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_report_file() -> String {
    "demo_report.json".to_string()
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            report_file: default_report_file(),
        }
    }
}

/// Validated, fully-resolved harness configuration.
///
/// Built from a [`RawConfigFile`] via `TryFrom` (see `validate.rs`), so any
/// value of this type has parsed durations, well-formed templates and a
/// non-empty milestone table.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    pub build_cmd: String,
    pub cluster: ClusterConfig,
    pub ports: Vec<u16>,
    pub client: ClientConfig,
    pub monitor: MonitorConfig,
    pub log_dir: PathBuf,
    pub report_file: String,
}

#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub nodes: usize,
    pub worker_cmd: String,
    pub stale_pattern: String,
    pub warmup: Duration,
    pub grace_period: Duration,
    pub settle: Duration,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub cmd: String,
    pub endpoint: String,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub duration: Duration,
    pub poll_interval: Duration,
    pub tail_lines: usize,
    pub milestones: MilestoneTable,
}

impl HarnessConfig {
    /// Log file for worker `id`.
    pub fn node_log_path(&self, id: u32) -> PathBuf {
        node_log_path(&self.log_dir, id)
    }

    pub fn client_log_path(&self) -> PathBuf {
        self.log_dir.join("client.log")
    }

    pub fn report_path(&self) -> PathBuf {
        self.log_dir.join(&self.report_file)
    }

    /// Log paths of every configured worker, in id order.
    pub fn node_log_paths(&self) -> Vec<PathBuf> {
        (1..=self.cluster.nodes as u32)
            .map(|id| self.node_log_path(id))
            .collect()
    }
}

/// `<log_dir>/node<id>.log`
pub fn node_log_path(log_dir: &Path, id: u32) -> PathBuf {
    log_dir.join(format!("node{id}.log"))
}
