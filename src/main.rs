//! viewstats - hit path and visit session analysis CLI
//!
//! Module structure:
//! - `domain/` - Region trees, visit events, summaries
//! - `services/` - HitPathResolver, VisitSessionAnalyzer
//! - `io/` - Scene/visit loaders, report egress, Prometheus dump
//! - `infra/` - Config, Metrics

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use viewstats::domain::Point;
use viewstats::infra::{Config, Metrics};
use viewstats::io::{
    load_scene, load_visits, write_prometheus_file, ReportBody, ReportRecord, ReportWriter,
};
use viewstats::services::{is_chronological, HitPathResolver, VisitSessionAnalyzer};

/// viewstats - hit paths through region trees and visit session counts
#[derive(Parser, Debug)]
#[command(name = "viewstats", version, about)]
struct Args {
    /// Path to TOML configuration file [default: $CONFIG_FILE or config/dev.toml]
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    /// Report file override (enables reporting)
    #[arg(long, global = true)]
    report: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the id path to the topmost region drawn at a point
    Path {
        /// Scene tree JSON file
        #[arg(short, long)]
        scene: String,

        #[arg(short, allow_negative_numbers = true)]
        x: f64,

        #[arg(short, allow_negative_numbers = true)]
        y: f64,
    },
    /// Count visits, unique visitors and sessions
    Sessions {
        /// Visit events JSONL file (sorted by timestamp)
        #[arg(short, long)]
        visits: String,

        /// Also list every session span
        #[arg(long)]
        spans: bool,

        /// Session deadline override in seconds (non-negative)
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..))]
        deadline_secs: Option<i64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_logging(format: LogFormat) {
    // Default: INFO, use RUST_LOG=debug for per-operation events
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_format);

    info!(version = env!("CARGO_PKG_VERSION"), git_hash = env!("GIT_HASH"), "viewstats_starting");

    let config_path = Config::resolve_config_path(args.config.as_deref());
    let mut config = Config::load_from_path(&config_path);
    if let Some(report) = &args.report {
        config = config.with_report_file(report.as_str());
    }

    info!(
        config_file = %config.config_file(),
        site_id = %config.site_id(),
        session_deadline_secs = %config.session_deadline_secs(),
        report_enabled = %config.report_enabled(),
        report_file = %config.report_file(),
        prometheus_file = ?config.prometheus_file(),
        "config_loaded"
    );

    let metrics = Arc::new(Metrics::new());
    let writer = config.report_enabled().then(|| ReportWriter::new(config.report_file()));

    match args.command {
        Command::Path { scene, x, y } => {
            let root = load_scene(&scene)?;
            let point = Point::new(x, y);
            let resolver = HitPathResolver::with_metrics(metrics.clone());

            let path = resolver.resolve_path(&root, point);
            let hit = resolver.hit(&root, point);
            info!(x = %x, y = %y, path = ?path, "hit_path");

            println!("{}", serde_json::to_string_pretty(&json!({ "path": path, "hit": hit }))?);

            if let Some(writer) = &writer {
                writer.write_record(&ReportRecord::new(
                    config.site_id(),
                    ReportBody::HitPath { point, path: &path },
                ));
            }
        }
        Command::Sessions { visits, spans, deadline_secs } => {
            let events = load_visits(&visits)?;
            if !is_chronological(&events) {
                warn!(file = %visits, "visits_not_chronological_session_count_unreliable");
            }

            let deadline_secs = deadline_secs.unwrap_or(config.session_deadline_secs());
            let analyzer =
                VisitSessionAnalyzer::with_metrics(metrics.clone()).with_deadline_secs(deadline_secs);

            let summary = analyzer.summarize(&events);
            let session_spans = spans.then(|| analyzer.sessions(&events));
            info!(
                total_visits = summary.total_visits,
                unique_visitors = summary.unique_visitors,
                sessions = summary.session_count,
                "visit_summary"
            );

            let mut output = json!({ "summary": summary });
            if let Some(session_spans) = &session_spans {
                output["sessions"] = json!(session_spans);
            }
            println!("{}", serde_json::to_string_pretty(&output)?);

            if let Some(writer) = &writer {
                writer.write_record(&ReportRecord::new(
                    config.site_id(),
                    ReportBody::Sessions {
                        deadline_secs,
                        summary,
                        spans: session_spans.as_deref(),
                    },
                ));
            }
        }
    }

    let summary = metrics.report();
    summary.log();
    if let Some(prometheus_file) = config.prometheus_file() {
        write_prometheus_file(prometheus_file, &summary, config.site_id())?;
    }

    info!("viewstats_done");
    Ok(())
}
