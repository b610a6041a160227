//! Visit loader - reads visit events from a JSONL file
//!
//! One `{"visitor_id": "...", "timestamp": ...}` object per line. Timestamps
//! are integer seconds or RFC 3339 strings. Blank lines are skipped.

use crate::domain::types::VisitEvent;
use anyhow::Context;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

/// Parse visit events from JSONL read from `reader`
pub fn read_visits<R: BufRead>(reader: R) -> anyhow::Result<Vec<VisitEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.with_context(|| format!("Failed to read line {line_no}"))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let event: VisitEvent = serde_json::from_str(trimmed)
            .with_context(|| format!("Invalid visit event on line {line_no}"))?;
        events.push(event);
    }
    Ok(events)
}

/// Load visit events from a JSONL file
pub fn load_visits<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<VisitEvent>> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open visits file {}", path.display()))?;
    let events = read_visits(BufReader::new(file))
        .with_context(|| format!("Failed to parse visits file {}", path.display()))?;

    info!(file = %path.display(), events = events.len(), "visits_loaded");
    Ok(events)
}
