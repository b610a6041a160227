//! IO modules - file edges around the analyzers
//!
//! - `scene` - Region tree loading (JSON)
//! - `visits` - Visit event loading (JSONL)
//! - `report` - Run report egress (JSONL)
//! - `prometheus` - Prometheus text exposition dump

pub mod prometheus;
pub mod report;
pub mod scene;
pub mod visits;

// Re-export commonly used types
pub use prometheus::write_prometheus_file;
pub use report::{ReportBody, ReportRecord, ReportWriter};
pub use scene::load_scene;
pub use visits::load_visits;
