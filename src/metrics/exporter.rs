use crate::metrics::collector::Metrics;
use crate::metrics::stats::CheckStats;
use crate::{CheckError, Result};
use std::fmt::Write;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Prometheus,
    Json,
}

impl FromStr for ExportFormat {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "prometheus" | "prom" => Ok(ExportFormat::Prometheus),
            "json" => Ok(ExportFormat::Json),
            other => Err(CheckError::ConfigError(format!(
                "Unsupported export format: {}",
                other
            ))),
        }
    }
}

/// Renders one collected cycle for consumers outside the host agent.
pub struct Exporter {
    stats: Option<CheckStats>,
}

impl Exporter {
    pub fn new() -> Self {
        Self { stats: None }
    }

    pub fn with_stats(stats: CheckStats) -> Self {
        Self { stats: Some(stats) }
    }

    pub fn export(&self, metrics: &Metrics, format: ExportFormat) -> Result<String> {
        match format {
            ExportFormat::Prometheus => self.format_prometheus(metrics),
            ExportFormat::Json => serde_json::to_string_pretty(metrics)
                .map_err(|e| CheckError::MetricsError(format!("Failed to encode JSON: {}", e))),
        }
    }

    /// Gauges and service checks as text exposition. Events have no
    /// Prometheus representation and are left out.
    pub fn format_prometheus(&self, metrics: &Metrics) -> Result<String> {
        let mut out = String::new();

        let mut gauge_names: Vec<&str> =
            metrics.gauges.iter().map(|g| g.name.as_str()).collect();
        gauge_names.sort_unstable();
        gauge_names.dedup();

        for name in gauge_names {
            let metric = sanitize(name);
            let _ = writeln!(out, "# TYPE {} gauge", metric);
            for gauge in metrics.gauges.iter().filter(|g| g.name == name) {
                let _ = writeln!(out, "{}{} {}", metric, labels(&gauge.tags), gauge.value);
            }
        }

        let mut check_names: Vec<&str> = metrics
            .service_checks
            .iter()
            .map(|sc| sc.name.as_str())
            .collect();
        check_names.sort_unstable();
        check_names.dedup();

        for name in check_names {
            let metric = format!("{}_status", sanitize(name));
            let _ = writeln!(
                out,
                "# HELP {} Service check status (0=OK, 1=WARNING, 2=CRITICAL)",
                metric
            );
            let _ = writeln!(out, "# TYPE {} gauge", metric);
            for check in metrics.service_checks.iter().filter(|sc| sc.name == name) {
                let _ = writeln!(
                    out,
                    "{}{} {}",
                    metric,
                    labels(&check.tags),
                    check.status.code()
                );
            }
        }

        if let Some(stats) = &self.stats {
            out.push_str(&stats.encode()?);
        }

        Ok(out)
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new()
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// `key:value` tags become labels; bare tags land under `tag`.
fn labels(tags: &[String]) -> String {
    if tags.is_empty() {
        return String::new();
    }

    let pairs: Vec<String> = tags
        .iter()
        .map(|tag| {
            let (key, value) = tag.split_once(':').unwrap_or(("tag", tag.as_str()));
            format!("{}=\"{}\"", sanitize(key), escape(value))
        })
        .collect();

    format!("{{{}}}", pairs.join(","))
}

fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}
