use crate::metrics::sink::{Event, MetricSink, ServiceCheckStatus};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaugeSample {
    pub name: String,
    pub value: f64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCheckSample {
    pub name: String,
    pub status: ServiceCheckStatus,
    pub tags: Vec<String>,
}

/// Everything emitted since the last drain, in emission order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub gauges: Vec<GaugeSample>,
    pub service_checks: Vec<ServiceCheckSample>,
    pub events: Vec<Event>,
}

impl Metrics {
    /// Last gauge emitted under `name` carrying exactly `tags`
    pub fn gauge(&self, name: &str, tags: &[&str]) -> Option<f64> {
        self.gauges
            .iter()
            .rev()
            .find(|g| g.name == name && same_tags(&g.tags, tags))
            .map(|g| g.value)
    }

    pub fn service_checks_named(&self, name: &str) -> Vec<&ServiceCheckSample> {
        self.service_checks
            .iter()
            .filter(|sc| sc.name == name)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty() && self.service_checks.is_empty() && self.events.is_empty()
    }
}

fn same_tags(actual: &[String], expected: &[&str]) -> bool {
    let mut actual: Vec<&str> = actual.iter().map(String::as_str).collect();
    let mut expected = expected.to_vec();
    actual.sort_unstable();
    expected.sort_unstable();
    actual == expected
}

/// Sink that records every emission in memory.
#[derive(Clone)]
pub struct MetricsCollector {
    metrics: Arc<RwLock<Metrics>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(RwLock::new(Metrics::default())),
        }
    }

    pub async fn get_metrics(&self) -> Metrics {
        self.metrics.read().await.clone()
    }

    /// Drain everything collected so far
    pub async fn take_metrics(&self) -> Metrics {
        std::mem::take(&mut *self.metrics.write().await)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricSink for MetricsCollector {
    async fn gauge(&self, name: &str, value: f64, tags: &[String]) {
        self.metrics.write().await.gauges.push(GaugeSample {
            name: name.to_string(),
            value,
            tags: tags.to_vec(),
        });
    }

    async fn service_check(&self, name: &str, status: ServiceCheckStatus, tags: &[String]) {
        self.metrics
            .write()
            .await
            .service_checks
            .push(ServiceCheckSample {
                name: name.to_string(),
                status,
                tags: tags.to_vec(),
            });
    }

    async fn event(&self, event: Event) {
        self.metrics.write().await.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collector_records_and_drains() {
        let collector = MetricsCollector::new();

        collector
            .gauge("consul.catalog.nodes_up", 3.0, &["consul_datacenter:dc1".to_string()])
            .await;
        collector
            .service_check("consul.up", ServiceCheckStatus::Ok, &[])
            .await;

        let metrics = collector.get_metrics().await;
        assert_eq!(
            metrics.gauge("consul.catalog.nodes_up", &["consul_datacenter:dc1"]),
            Some(3.0)
        );
        assert_eq!(metrics.gauge("consul.catalog.nodes_up", &[]), None);
        assert_eq!(metrics.service_checks_named("consul.up").len(), 1);

        let drained = collector.take_metrics().await;
        assert!(!drained.is_empty());
        assert!(collector.get_metrics().await.is_empty());
    }

    #[test]
    fn test_tag_match_ignores_order() {
        let tags = vec!["b:2".to_string(), "a:1".to_string()];
        assert!(same_tags(&tags, &["a:1", "b:2"]));
        assert!(!same_tags(&tags, &["a:1"]));
    }
}
