use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized service-check severity, ordered from healthy to failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceCheckStatus {
    Ok,
    Warning,
    Critical,
}

impl ServiceCheckStatus {
    /// Numeric status code used by agent transports
    pub fn code(self) -> u8 {
        match self {
            ServiceCheckStatus::Ok => 0,
            ServiceCheckStatus::Warning => 1,
            ServiceCheckStatus::Critical => 2,
        }
    }
}

impl fmt::Display for ServiceCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceCheckStatus::Ok => "OK",
            ServiceCheckStatus::Warning => "WARNING",
            ServiceCheckStatus::Critical => "CRITICAL",
        };
        f.write_str(name)
    }
}

/// Structured lifecycle event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub aggregation_key: String,
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
}

/// Destination for everything a check run produces.
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn gauge(&self, name: &str, value: f64, tags: &[String]);

    async fn service_check(&self, name: &str, status: ServiceCheckStatus, tags: &[String]);

    async fn event(&self, event: Event);
}
