// src/config/validate.rs

use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::model::{
    ClientConfig, ClusterConfig, HarnessConfig, MonitorConfig, RawConfigFile,
};
use crate::errors::{HerdError, Result};
use crate::monitor::{Milestone, MilestoneTable};
use crate::types::parse_duration;

pub const ID_PLACEHOLDER: &str = "{id}";
pub const ENDPOINT_PLACEHOLDER: &str = "{endpoint}";

impl TryFrom<RawConfigFile> for HarnessConfig {
    type Error = HerdError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;

        let milestones = if raw.monitor.milestones.is_empty() {
            MilestoneTable::default()
        } else {
            MilestoneTable::new(
                raw.monitor
                    .milestones
                    .iter()
                    .map(|m| Milestone::new(m.phrase.clone(), m.kind))
                    .collect(),
            )
        };

        Ok(HarnessConfig {
            build_cmd: raw.build.cmd,
            cluster: ClusterConfig {
                nodes: raw.cluster.nodes,
                worker_cmd: raw.cluster.worker_cmd,
                stale_pattern: raw.cluster.stale_pattern,
                warmup: duration_field("cluster.warmup", &raw.cluster.warmup)?,
                grace_period: duration_field("cluster.grace_period", &raw.cluster.grace_period)?,
                settle: duration_field("cluster.settle", &raw.cluster.settle)?,
            },
            ports: raw.ports,
            client: ClientConfig {
                cmd: raw.client.cmd,
                endpoint: raw.client.endpoint,
                duration: duration_field("client.duration", &raw.client.duration)?,
            },
            monitor: MonitorConfig {
                duration: duration_field("monitor.duration", &raw.monitor.duration)?,
                poll_interval: duration_field("monitor.poll_interval", &raw.monitor.poll_interval)?,
                tail_lines: raw.monitor.tail_lines,
                milestones,
            },
            log_dir: raw.output.log_dir,
            report_file: raw.output.report_file,
        })
    }
}

/// Run every semantic check against a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_cluster(cfg)?;
    validate_ports(cfg)?;
    validate_client(cfg)?;
    validate_monitor(cfg)?;
    validate_output(cfg)?;
    Ok(())
}

fn duration_field(name: &str, value: &str) -> Result<Duration> {
    parse_duration(value)
        .map_err(|e| HerdError::ConfigError(format!("[{name}] = {value:?}: {e}")))
}

fn validate_cluster(cfg: &RawConfigFile) -> Result<()> {
    if cfg.cluster.nodes == 0 {
        return Err(HerdError::ConfigError(
            "[cluster].nodes must be >= 1 (got 0)".to_string(),
        ));
    }
    if !cfg.cluster.worker_cmd.contains(ID_PLACEHOLDER) {
        return Err(HerdError::ConfigError(format!(
            "[cluster].worker_cmd must contain the {ID_PLACEHOLDER} placeholder"
        )));
    }
    if cfg.cluster.stale_pattern.trim().is_empty() {
        return Err(HerdError::ConfigError(
            "[cluster].stale_pattern must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_ports(cfg: &RawConfigFile) -> Result<()> {
    if cfg.ports.is_empty() {
        return Err(HerdError::ConfigError(
            "ports must list at least one TCP port".to_string(),
        ));
    }

    let mut seen = BTreeSet::new();
    for port in &cfg.ports {
        if *port == 0 {
            return Err(HerdError::ConfigError("port 0 is not checkable".to_string()));
        }
        if !seen.insert(*port) {
            return Err(HerdError::ConfigError(format!(
                "port {port} is listed more than once"
            )));
        }
    }
    Ok(())
}

fn validate_client(cfg: &RawConfigFile) -> Result<()> {
    if !cfg.client.cmd.contains(ENDPOINT_PLACEHOLDER) {
        return Err(HerdError::ConfigError(format!(
            "[client].cmd must contain the {ENDPOINT_PLACEHOLDER} placeholder"
        )));
    }
    if cfg.client.endpoint.trim().is_empty() {
        return Err(HerdError::ConfigError(
            "[client].endpoint must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_monitor(cfg: &RawConfigFile) -> Result<()> {
    if cfg.monitor.tail_lines == 0 {
        return Err(HerdError::ConfigError(
            "[monitor].tail_lines must be >= 1 (got 0)".to_string(),
        ));
    }

    let poll = duration_field("monitor.poll_interval", &cfg.monitor.poll_interval)?;
    if poll.is_zero() {
        return Err(HerdError::ConfigError(
            "[monitor].poll_interval must be greater than zero".to_string(),
        ));
    }

    for m in &cfg.monitor.milestones {
        if m.phrase.trim().is_empty() {
            return Err(HerdError::ConfigError(
                "[[monitor.milestone]] phrase must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}

fn validate_output(cfg: &RawConfigFile) -> Result<()> {
    if cfg.output.report_file.trim().is_empty() {
        return Err(HerdError::ConfigError(
            "[output].report_file must not be empty".to_string(),
        ));
    }
    Ok(())
}
