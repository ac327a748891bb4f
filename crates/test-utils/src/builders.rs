#![allow(dead_code)]

use std::path::Path;

use clusterherd::config::{HarnessConfig, MilestoneSpec, RawConfigFile};
use clusterherd::types::MilestoneKind;

use crate::unused_ports;

/// Builder for `HarnessConfig` with test-friendly defaults.
///
/// Starts from short timings and harmless `sh` commands instead of the cargo
/// based reference deployment:
/// - build: `true`
/// - workers: print a line, then `sleep 30`
/// - client: print its endpoint, then `sleep 30`
/// - ports: four loopback ports nothing listens on
/// - stale pattern: a marker no real process carries
pub struct HarnessConfigBuilder {
    config: RawConfigFile,
}

impl HarnessConfigBuilder {
    pub fn new(log_dir: impl AsRef<Path>) -> Self {
        let mut config = RawConfigFile::default();

        config.build.cmd = "true".to_string();

        config.cluster.nodes = 4;
        config.cluster.worker_cmd = "echo node {id} started; sleep 30".to_string();
        config.cluster.stale_pattern = "clusterherd-test-no-such-process".to_string();
        config.cluster.warmup = "200ms".to_string();
        config.cluster.grace_period = "500ms".to_string();
        config.cluster.settle = "0ms".to_string();

        config.ports = unused_ports(4);

        config.client.cmd = "echo client {endpoint}; sleep 30".to_string();
        config.client.endpoint = "127.0.0.1:1244".to_string();
        config.client.duration = "100ms".to_string();

        config.monitor.duration = "300ms".to_string();
        config.monitor.poll_interval = "100ms".to_string();

        config.output.log_dir = log_dir.as_ref().to_path_buf();

        Self { config }
    }

    pub fn build_cmd(mut self, cmd: &str) -> Self {
        self.config.build.cmd = cmd.to_string();
        self
    }

    pub fn nodes(mut self, n: usize) -> Self {
        self.config.cluster.nodes = n;
        self
    }

    pub fn worker_cmd(mut self, cmd: &str) -> Self {
        self.config.cluster.worker_cmd = cmd.to_string();
        self
    }

    pub fn warmup(mut self, duration: &str) -> Self {
        self.config.cluster.warmup = duration.to_string();
        self
    }

    pub fn grace_period(mut self, duration: &str) -> Self {
        self.config.cluster.grace_period = duration.to_string();
        self
    }

    pub fn ports(mut self, ports: Vec<u16>) -> Self {
        self.config.ports = ports;
        self
    }

    pub fn client_cmd(mut self, cmd: &str) -> Self {
        self.config.client.cmd = cmd.to_string();
        self
    }

    pub fn client_duration(mut self, duration: &str) -> Self {
        self.config.client.duration = duration.to_string();
        self
    }

    pub fn monitor(mut self, duration: &str, poll_interval: &str) -> Self {
        self.config.monitor.duration = duration.to_string();
        self.config.monitor.poll_interval = poll_interval.to_string();
        self
    }

    pub fn tail_lines(mut self, n: usize) -> Self {
        self.config.monitor.tail_lines = n;
        self
    }

    pub fn milestone(mut self, phrase: &str, kind: MilestoneKind) -> Self {
        self.config.monitor.milestones.push(MilestoneSpec {
            phrase: phrase.to_string(),
            kind,
        });
        self
    }

    pub fn report_file(mut self, name: &str) -> Self {
        self.config.output.report_file = name.to_string();
        self
    }

    /// The raw, unvalidated config (for validation tests).
    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> HarnessConfig {
        HarnessConfig::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
