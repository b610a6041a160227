//! Prometheus text exposition of analyzer metrics
//!
//! Renders a `MetricsSummary` in Prometheus text format and writes it to a
//! file (for node_exporter's textfile collector or manual scraping).

use crate::infra::metrics::{
    MetricsSummary, METRICS_BUCKET_BOUNDS, METRICS_DEPTH_BOUNDS, METRICS_NUM_BUCKETS,
};
use anyhow::Context;
use std::fmt::Write;
use std::fs;
use std::path::Path;
use tracing::info;

/// Prometheus metric type
enum MetricType {
    Counter,
    Gauge,
}

impl MetricType {
    fn as_str(&self) -> &'static str {
        match self {
            MetricType::Counter => "counter",
            MetricType::Gauge => "gauge",
        }
    }
}

/// Write a simple metric (counter or gauge) with site label
fn write_metric(
    output: &mut String,
    name: &str,
    help: &str,
    typ: MetricType,
    site: &str,
    val: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} {}", typ.as_str());
    let _ = writeln!(output, "{name}{{site=\"{site}\"}} {val}");
}

/// Write a histogram metric with buckets, sum, and count
fn write_histogram(
    output: &mut String,
    name: &str,
    help: &str,
    site: &str,
    buckets: &[u64; METRICS_NUM_BUCKETS],
    bounds: &[u64; 10],
    sum: u64,
) {
    let _ = writeln!(output, "# HELP {name} {help}");
    let _ = writeln!(output, "# TYPE {name} histogram");

    let mut cumulative = 0u64;
    for (i, &bound) in bounds.iter().enumerate() {
        cumulative += buckets[i];
        let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"{bound}\"}} {cumulative}");
    }
    cumulative += buckets[METRICS_NUM_BUCKETS - 1];
    let _ = writeln!(output, "{name}_bucket{{site=\"{site}\",le=\"+Inf\"}} {cumulative}");

    let count: u64 = buckets.iter().sum();
    let _ = writeln!(output, "{name}_sum{{site=\"{site}\"}} {sum}");
    let _ = writeln!(output, "{name}_count{{site=\"{site}\"}} {count}");
}

/// Format a metrics snapshot in Prometheus text exposition format
pub fn format_prometheus_metrics(summary: &MetricsSummary, site: &str) -> String {
    let mut output = String::with_capacity(4096);

    write_hit_path_metrics(&mut output, site, summary);
    write_session_metrics(&mut output, site, summary);
    write_latency_metrics(&mut output, site, summary);

    output
}

fn write_hit_path_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "viewstats_paths_resolved_total",
        "Hit path queries that landed inside the root",
        MetricType::Counter,
        site,
        summary.paths_resolved_total,
    );
    write_metric(
        output,
        "viewstats_paths_missed_total",
        "Hit path queries outside the root frame",
        MetricType::Counter,
        site,
        summary.paths_missed_total,
    );
    write_histogram(
        output,
        "viewstats_path_depth",
        "Number of ids in resolved hit paths",
        site,
        &summary.path_depth_buckets,
        &METRICS_DEPTH_BOUNDS,
        summary.path_depth_sum,
    );
    write_metric(
        output,
        "viewstats_path_depth_max",
        "Deepest resolved hit path",
        MetricType::Gauge,
        site,
        summary.path_depth_max,
    );
}

fn write_session_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_metric(
        output,
        "viewstats_summaries_total",
        "Visit summaries computed",
        MetricType::Counter,
        site,
        summary.summaries_total,
    );
    write_metric(
        output,
        "viewstats_visits_total",
        "Visit events summarized",
        MetricType::Counter,
        site,
        summary.visits_total,
    );
    write_metric(
        output,
        "viewstats_sessions_total",
        "Sessions counted",
        MetricType::Counter,
        site,
        summary.sessions_total,
    );
}

fn write_latency_metrics(output: &mut String, site: &str, summary: &MetricsSummary) {
    write_histogram(
        output,
        "viewstats_op_latency_us",
        "Operation latency in microseconds",
        site,
        &summary.lat_buckets,
        &METRICS_BUCKET_BOUNDS,
        summary.latency_sum_us,
    );
    write_metric(
        output,
        "viewstats_op_latency_p99_us",
        "99th percentile operation latency",
        MetricType::Gauge,
        site,
        summary.lat_p99_us,
    );
}

/// Render `summary` and write it to `path`, replacing any previous dump
pub fn write_prometheus_file<P: AsRef<Path>>(
    path: P,
    summary: &MetricsSummary,
    site: &str,
) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    let text = format_prometheus_metrics(summary, site);
    fs::write(path, &text)
        .with_context(|| format!("Failed to write metrics file {}", path.display()))?;

    info!(file = %path.display(), bytes = text.len(), "prometheus_metrics_written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::metrics::Metrics;
    use tempfile::tempdir;

    #[test]
    fn test_format_prometheus_metrics() {
        let metrics = Metrics::new();
        metrics.record_path_resolved(3, 120);
        metrics.record_path_resolved(0, 80);
        metrics.record_summary(10, 4, 300);

        let output = format_prometheus_metrics(&metrics.report(), "test");

        assert!(output.contains("# TYPE viewstats_paths_resolved_total counter"));
        assert!(output.contains("viewstats_paths_resolved_total{site=\"test\"} 1"));
        assert!(output.contains("viewstats_paths_missed_total{site=\"test\"} 1"));
        assert!(output.contains("viewstats_path_depth_bucket{site=\"test\",le=\"3\"} 1"));
        assert!(output.contains("viewstats_path_depth_bucket{site=\"test\",le=\"+Inf\"} 1"));
        assert!(output.contains("viewstats_sessions_total{site=\"test\"} 4"));
        assert!(output.contains("viewstats_op_latency_us_count{site=\"test\"} 3"));
    }

    #[test]
    fn test_histogram_buckets_are_cumulative() {
        let mut output = String::new();
        let mut buckets = [0u64; METRICS_NUM_BUCKETS];
        buckets[0] = 2;
        buckets[2] = 1;
        buckets[10] = 1;
        write_histogram(&mut output, "h", "help", "s", &buckets, &METRICS_DEPTH_BOUNDS, 20);

        assert!(output.contains("h_bucket{site=\"s\",le=\"1\"} 2"));
        assert!(output.contains("h_bucket{site=\"s\",le=\"3\"} 3"));
        assert!(output.contains("h_bucket{site=\"s\",le=\"32\"} 3"));
        assert!(output.contains("h_bucket{site=\"s\",le=\"+Inf\"} 4"));
        assert!(output.contains("h_sum{site=\"s\"} 20"));
    }

    #[test]
    fn test_histogram_sum_is_exact() {
        let metrics = Metrics::new();
        metrics.record_path_resolved(1, 10);
        metrics.record_path_resolved(2, 15);

        let output = format_prometheus_metrics(&metrics.report(), "s");

        assert!(output.contains("viewstats_path_depth_sum{site=\"s\"} 3"));
        assert!(output.contains("viewstats_path_depth_count{site=\"s\"} 2"));
        assert!(output.contains("viewstats_op_latency_us_sum{site=\"s\"} 25"));
    }

    #[test]
    fn test_write_prometheus_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("metrics/viewstats.prom");

        write_prometheus_file(&path, &Metrics::new().report(), "test").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("viewstats_summaries_total{site=\"test\"} 0"));
    }
}
