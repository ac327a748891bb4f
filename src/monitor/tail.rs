// src/monitor/tail.rs

use std::io::SeekFrom;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Bytes read from the end of a log per attempt; doubled while the window
/// holds fewer than the requested number of lines.
const TAIL_WINDOW: u64 = 64 * 1024;

/// Read the last `n` lines of a file.
///
/// Only a window at the end of the file is read, so the cost does not grow
/// with the log. Workers may be mid-write, so invalid UTF-8 is replaced rather
/// than treated as an error. A trailing partial line is returned like any
/// other.
pub async fn read_tail(path: &Path, n: usize) -> Result<Vec<String>> {
    let mut file = File::open(path)
        .await
        .with_context(|| format!("opening log file {:?}", path))?;
    let len = file
        .metadata()
        .await
        .with_context(|| format!("reading metadata of {:?}", path))?
        .len();

    let mut window = TAIL_WINDOW.min(len);
    loop {
        let start = len - window;
        file.seek(SeekFrom::Start(start)).await?;

        let mut buf = Vec::with_capacity(window as usize);
        (&mut file)
            .take(window)
            .read_to_end(&mut buf)
            .await
            .with_context(|| format!("reading log file {:?}", path))?;

        let text = String::from_utf8_lossy(&buf);
        // Mid-file, the first line of the window is probably cut.
        let body: &str = if start > 0 {
            text.find('\n').map_or("", |i| &text[i + 1..])
        } else {
            &text
        };

        let lines = last_lines(body, n);
        if lines.len() >= n || start == 0 {
            return Ok(lines);
        }
        window = window.saturating_mul(2).min(len);
    }
}

/// The last `n` lines of `text`, oldest first.
pub fn last_lines(text: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}
