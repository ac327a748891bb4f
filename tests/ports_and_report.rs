// tests/ports_and_report.rs
use std::error::Error;
use std::path::PathBuf;

use chrono::{Duration as ChronoDuration, Local};

use clusterherd::monitor::ConsensusEvent;
use clusterherd::ports::{self, PortStatus};
use clusterherd::report;
use clusterherd::types::MilestoneKind;
use clusterherd_test_utils::{init_tracing, unused_ports};

type TestResult = Result<(), Box<dyn Error>>;

fn event(line: &str) -> ConsensusEvent {
    ConsensusEvent {
        line: line.to_string(),
        kind: MilestoneKind::VertexCommitted,
        source: PathBuf::from("logs/node1.log"),
    }
}

#[tokio::test]
async fn bound_port_reads_as_listening() -> TestResult {
    init_tracing();
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let bound = listener.local_addr()?.port();
    let free = unused_ports(1)[0];

    let statuses = ports::check(&[bound, free]).await;
    assert_eq!(
        statuses,
        vec![
            PortStatus { port: bound, listening: true },
            PortStatus { port: free, listening: false },
        ]
    );
    assert!(!ports::all_listening(&statuses));
    assert!(ports::all_listening(&statuses[..1]));
    Ok(())
}

#[tokio::test]
async fn every_configured_port_unbound() {
    init_tracing();
    let configured = unused_ports(4);

    let statuses = ports::check(&configured).await;
    assert_eq!(statuses.len(), 4);
    assert!(statuses.iter().all(|s| !s.listening));
    assert_eq!(
        ports::to_map(&statuses).keys().copied().collect::<Vec<_>>(),
        {
            let mut sorted = configured.clone();
            sorted.sort_unstable();
            sorted
        }
    );
}

#[test]
fn build_aggregates_observations() {
    let start = Local::now();
    let end = start + ChronoDuration::milliseconds(2_500);
    let ports = [
        PortStatus { port: 1236, listening: false },
        PortStatus { port: 1234, listening: true },
    ];
    let events = [event("Vertex committed 1"), event("Vertex committed 2")];

    let r = report::build(start, end, 3, &ports, &events);

    assert_eq!(r.start_time, start);
    assert_eq!(r.end_time, end);
    assert!((r.duration - 2.5).abs() < 1e-6);
    assert_eq!(r.nodes_started, 3);
    assert_eq!(r.consensus_events, 2);
    assert_eq!(r.ports_status.len(), 2);
    assert_eq!(r.ports_status.get(&1234), Some(&true));
    assert_eq!(r.ports_status.get(&1236), Some(&false));
}

#[test]
fn clock_going_backwards_gives_zero_duration() {
    let start = Local::now();
    let end = start - ChronoDuration::seconds(1);
    let r = report::build(start, end, 0, &[], &[]);
    assert_eq!(r.duration, 0.0);
}

#[test]
fn persisted_report_has_exactly_the_documented_fields() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("out/demo_report.json");
    let start = Local::now();
    let ports = [PortStatus { port: 1234, listening: true }];
    let r = report::build(start, start + ChronoDuration::seconds(45), 4, &ports, &[event("x")]);

    report::persist(&r, &path)?;

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let obj = json.as_object().expect("report is a JSON object");
    let mut keys: Vec<_> = obj.keys().cloned().collect();
    keys.sort();
    assert_eq!(
        keys,
        vec![
            "consensus_events",
            "duration",
            "end_time",
            "nodes_started",
            "ports_status",
            "start_time"
        ]
    );
    assert_eq!(obj["nodes_started"], 4);
    assert_eq!(obj["consensus_events"], 1);
    assert_eq!(obj["duration"].as_f64(), Some(45.0));
    assert_eq!(obj["ports_status"]["1234"], true);

    assert_eq!(report::load(&path)?, r);
    Ok(())
}

#[test]
fn persist_overwrites_a_previous_report() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("demo_report.json");
    let start = Local::now();

    report::persist(&report::build(start, start, 1, &[], &[]), &path)?;
    let second = report::build(start, start, 2, &[], &[]);
    report::persist(&second, &path)?;

    assert_eq!(report::load(&path)?.nodes_started, 2);
    Ok(())
}
