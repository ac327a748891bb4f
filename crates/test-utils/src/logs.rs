#![allow(dead_code)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// Create (or truncate) a log file with the given lines.
pub fn write_log(path: &Path, lines: &[&str]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create log dir");
    }
    let mut body = lines.join("\n");
    body.push('\n');
    fs::write(path, body).expect("write log file");
}

/// Append lines to a log file, creating it if needed.
pub fn append_log(path: &Path, lines: &[&str]) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("open log file for append");
    for line in lines {
        writeln!(file, "{line}").expect("append log line");
    }
}
