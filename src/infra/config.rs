//! Configuration loading from TOML files
//!
//! Config file is selected via:
//! 1. --config <path> command line argument
//! 2. CONFIG_FILE environment variable
//! 3. Default: config/dev.toml

use crate::services::SESSION_DEADLINE_SECS;
use anyhow::{ensure, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;
use tracing::warn;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SiteConfig {
    /// Site identifier included in reports and metrics labels
    #[serde(default = "default_site_id")]
    pub id: String,
}

fn default_site_id() -> String {
    "viewstats".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionsConfig {
    /// Inactivity gap in seconds; a strictly larger gap starts a new session
    #[serde(default = "default_deadline_secs")]
    pub deadline_secs: i64,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self { deadline_secs: default_deadline_secs() }
    }
}

fn default_deadline_secs() -> i64 {
    SESSION_DEADLINE_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Append a JSON line per run
    #[serde(default = "default_report_enabled")]
    pub enabled: bool,
    /// File path for run reports (JSONL format)
    #[serde(default = "default_report_file")]
    pub file: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { enabled: default_report_enabled(), file: default_report_file() }
    }
}

fn default_report_enabled() -> bool {
    true
}

fn default_report_file() -> String {
    "reports/viewstats.jsonl".to_string()
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MetricsConfig {
    /// Prometheus text exposition output file (empty to disable)
    #[serde(default)]
    pub prometheus_file: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub site: SiteConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    site_id: String,
    session_deadline_secs: i64,
    report_enabled: bool,
    report_file: String,
    prometheus_file: Option<String>,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_id: default_site_id(),
            session_deadline_secs: SESSION_DEADLINE_SECS,
            report_enabled: true,
            report_file: default_report_file(),
            prometheus_file: None,
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Determine config file path from the `--config` flag or environment
    pub fn resolve_config_path(flag: Option<&str>) -> String {
        if let Some(path) = flag {
            return path.to_string();
        }

        if let Ok(path) = env::var("CONFIG_FILE") {
            return path;
        }

        "config/dev.toml".to_string()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        ensure!(
            toml_config.sessions.deadline_secs >= 0,
            "sessions.deadline_secs must be non-negative in {} (got {})",
            path.display(),
            toml_config.sessions.deadline_secs
        );

        let prometheus_file = Some(toml_config.metrics.prometheus_file).filter(|f| !f.is_empty());

        Ok(Self {
            site_id: toml_config.site.id,
            session_deadline_secs: toml_config.sessions.deadline_secs,
            report_enabled: toml_config.report.enabled,
            report_file: toml_config.report.file,
            prometheus_file,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration from `path`, falling back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "config_load_failed_using_defaults");
                Self::default()
            }
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn session_deadline_secs(&self) -> i64 {
        self.session_deadline_secs
    }

    pub fn report_enabled(&self) -> bool {
        self.report_enabled
    }

    pub fn report_file(&self) -> &str {
        &self.report_file
    }

    pub fn prometheus_file(&self) -> Option<&str> {
        self.prometheus_file.as_deref()
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method to override the report file (CLI flag)
    pub fn with_report_file(mut self, file: impl Into<String>) -> Self {
        self.report_file = file.into();
        self.report_enabled = true;
        self
    }

    /// Builder method for tests to set the session deadline
    #[cfg(test)]
    pub fn with_session_deadline_secs(mut self, secs: i64) -> Self {
        self.session_deadline_secs = secs;
        self
    }
}
