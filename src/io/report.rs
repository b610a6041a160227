//! Run report egress - appends analysis results to a file
//!
//! Reports are written in JSONL format (one JSON object per line) to the
//! file specified in config.

use crate::domain::summary::{Session, VisitSummary};
use crate::domain::types::Point;
use chrono::Utc;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Result carried by a report line
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportBody<'a> {
    HitPath {
        point: Point,
        path: &'a [String],
    },
    Sessions {
        deadline_secs: i64,
        summary: VisitSummary,
        #[serde(skip_serializing_if = "Option::is_none")]
        spans: Option<&'a [Session]>,
    },
}

impl ReportBody<'_> {
    fn kind(&self) -> &'static str {
        match self {
            ReportBody::HitPath { .. } => "hit_path",
            ReportBody::Sessions { .. } => "sessions",
        }
    }
}

/// One report line
#[derive(Debug, Serialize)]
pub struct ReportRecord<'a> {
    /// UUIDv7 record id (time-sortable)
    pub rid: String,
    /// Write time (RFC 3339)
    pub ts: String,
    pub site: &'a str,
    pub result: ReportBody<'a>,
}

impl<'a> ReportRecord<'a> {
    pub fn new(site: &'a str, result: ReportBody<'a>) -> Self {
        Self { rid: Uuid::now_v7().to_string(), ts: Utc::now().to_rfc3339(), site, result }
    }
}

/// Egress writer for run reports
pub struct ReportWriter {
    file_path: String,
}

impl ReportWriter {
    pub fn new(file_path: &str) -> Self {
        info!(file_path = %file_path, "report_writer_initialized");
        Self { file_path: file_path.to_string() }
    }

    /// Write a report record to the report file
    /// Returns true if successful, false otherwise
    pub fn write_record(&self, record: &ReportRecord<'_>) -> bool {
        let result = serde_json::to_string(record)
            .map_err(std::io::Error::from)
            .and_then(|json| self.append_line(&json));

        match result {
            Ok(()) => {
                info!(rid = %record.rid, kind = %record.result.kind(), "report_written");
                true
            }
            Err(e) => {
                error!(rid = %record.rid, error = %e, "report_write_failed");
                false
            }
        }
    }

    /// Append a line to the report file
    fn append_line(&self, line: &str) -> std::io::Result<()> {
        let path = Path::new(&self.file_path);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;

        writeln!(file, "{}", line)?;
        debug!(file = %self.file_path, bytes = %line.len(), "report_appended");

        Ok(())
    }
}
