// src/ports.rs

//! Advisory port readiness.
//!
//! A port counts as "listening" when a TCP connect to the loopback address
//! succeeds within a short timeout. The result is a snapshot; nothing is
//! cached between calls.

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortStatus {
    pub port: u16,
    pub listening: bool,
}

/// Is anything accepting connections on `127.0.0.1:<port>`?
pub async fn is_listening(port: u16) -> bool {
    let addr = SocketAddr::from((Ipv4Addr::LOCALHOST, port));
    matches!(timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await, Ok(Ok(_)))
}

/// Check every port, logging one line per port.
pub async fn check(ports: &[u16]) -> Vec<PortStatus> {
    let mut statuses = Vec::with_capacity(ports.len());
    for &port in ports {
        let listening = is_listening(port).await;
        if listening {
            info!(port, "port is listening");
        } else {
            warn!(port, "port is not listening");
        }
        statuses.push(PortStatus { port, listening });
    }
    statuses
}

/// True iff every status in the snapshot is listening.
pub fn all_listening(statuses: &[PortStatus]) -> bool {
    statuses.iter().all(|s| s.listening)
}

/// Port snapshot keyed by port number, as recorded in the report.
pub fn to_map(statuses: &[PortStatus]) -> BTreeMap<u16, bool> {
    statuses.iter().map(|s| (s.port, s.listening)).collect()
}
