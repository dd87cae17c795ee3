//! Health aggregation
//!
//! Fetches every active health check, maps each textual status to a
//! [`ServiceCheckStatus`] and reduces the batch to one representative
//! `consul.check` emission. The whole fetch-and-reduce runs inside a failure
//! boundary that decides the `consul.up` reachability status.

use crate::config::Instance;
use crate::consul::types::HealthCheck;
use crate::consul::{api, ControlPlane};
use crate::metrics::{MetricSink, ServiceCheckStatus};
use serde::Deserialize;
use tracing::{debug, warn};

pub const CONSUL_CHECK: &str = "consul.up";
pub const HEALTH_CHECK: &str = "consul.check";

/// How a batch of health records collapses into one status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthReduction {
    /// Highest severity wins; among equals the later record wins.
    #[default]
    Worst,
    /// The last recognized record wins regardless of severity.
    Last,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthSummary {
    pub status: ServiceCheckStatus,
    pub tags: Vec<String>,
}

/// Map a control-plane status string to a severity. Anything else is `None`.
pub fn normalize(status: &str) -> Option<ServiceCheckStatus> {
    match status {
        "passing" => Some(ServiceCheckStatus::Ok),
        "warning" => Some(ServiceCheckStatus::Warning),
        "critical" => Some(ServiceCheckStatus::Critical),
        _ => None,
    }
}

pub fn check_tags(check: &HealthCheck) -> Vec<String> {
    let mut tags = vec![format!("check:{}", check.check_id)];
    if let Some(name) = check.service_name() {
        tags.push(format!("service:{}", name));
    }
    if let Some(id) = check.service_id() {
        tags.push(format!("service-id:{}", id));
    }
    tags
}

/// Reduce a batch to one summary. Records with an unrecognized status are
/// skipped; `None` when no record was recognized.
pub fn reduce(checks: &[HealthCheck], reduction: HealthReduction) -> Option<HealthSummary> {
    let mut summary: Option<HealthSummary> = None;

    for check in checks {
        let Some(status) = normalize(&check.status) else {
            debug!(
                check_id = %check.check_id,
                status = %check.status,
                "Skipping unknown health status"
            );
            continue;
        };

        let replace = match (&summary, reduction) {
            (None, _) | (_, HealthReduction::Last) => true,
            (Some(current), HealthReduction::Worst) => status >= current.status,
        };

        if replace {
            summary = Some(HealthSummary {
                status,
                tags: check_tags(check),
            });
        }
    }

    summary
}

/// Run the health aggregate for one poll and report it.
///
/// Emits `consul.check` with the reduced status (when any record was
/// recognized) and `consul.up` OK; any failure instead yields a single
/// `consul.up` CRITICAL. Returns whether the cluster was reachable.
pub async fn report(
    client: &dyn ControlPlane,
    sink: &dyn MetricSink,
    instance: &Instance,
) -> bool {
    let service_check_tags = vec![format!("consul_url:{}", instance.url)];

    match api::health_state_any(client, instance).await {
        Ok(checks) => {
            match reduce(&checks, instance.health_reduction) {
                Some(summary) => {
                    sink.service_check(HEALTH_CHECK, summary.status, &summary.tags)
                        .await;
                }
                None => debug!(url = %instance.url, "No recognized health checks"),
            }
            sink.service_check(CONSUL_CHECK, ServiceCheckStatus::Ok, &service_check_tags)
                .await;
            true
        }
        Err(e) => {
            warn!(url = %instance.url, error = %e, "Consul health check failed");
            sink.service_check(
                CONSUL_CHECK,
                ServiceCheckStatus::Critical,
                &service_check_tags,
            )
            .await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consul::api::HEALTH_STATE_ANY;
    use crate::consul::MockControlPlane;
    use crate::metrics::MetricsCollector;
    use serde_json::json;

    const URL: &str = "http://localhost:8500";

    fn record(id: &str, status: &str) -> HealthCheck {
        HealthCheck {
            check_id: id.to_string(),
            status: status.to_string(),
            node: Some("node-1".to_string()),
            service_name: None,
            service_id: None,
        }
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("passing"), Some(ServiceCheckStatus::Ok));
        assert_eq!(normalize("warning"), Some(ServiceCheckStatus::Warning));
        assert_eq!(normalize("critical"), Some(ServiceCheckStatus::Critical));
        assert_eq!(normalize("maintenance"), None);
        assert_eq!(normalize("PASSING"), None);
    }

    #[test]
    fn test_tags_include_service_when_present() {
        let mut check = record("service:web-1", "passing");
        check.service_name = Some("web".to_string());
        check.service_id = Some("web-1".to_string());

        assert_eq!(
            check_tags(&check),
            vec!["check:service:web-1", "service:web", "service-id:web-1"]
        );
        assert_eq!(check_tags(&record("serfHealth", "passing")), vec!["check:serfHealth"]);
    }

    #[test]
    fn test_unknown_status_is_skipped() {
        let checks = vec![record("mystery", "bogus"), record("serfHealth", "passing")];

        for reduction in [HealthReduction::Worst, HealthReduction::Last] {
            let summary = reduce(&checks, reduction).expect("one recognized record");
            assert_eq!(summary.status, ServiceCheckStatus::Ok);
            assert_eq!(summary.tags, vec!["check:serfHealth"]);
        }
    }

    #[test]
    fn test_nothing_recognized_reduces_to_none() {
        assert!(reduce(&[record("a", "unknown")], HealthReduction::Worst).is_none());
        assert!(reduce(&[], HealthReduction::Last).is_none());
    }

    #[test]
    fn test_worst_keeps_critical_behind_late_passing() {
        let checks = vec![
            record("a", "passing"),
            record("b", "critical"),
            record("c", "warning"),
            record("d", "passing"),
        ];

        let worst = reduce(&checks, HealthReduction::Worst).expect("summary");
        assert_eq!(worst.status, ServiceCheckStatus::Critical);
        assert_eq!(worst.tags, vec!["check:b"]);

        let last = reduce(&checks, HealthReduction::Last).expect("summary");
        assert_eq!(last.status, ServiceCheckStatus::Ok);
        assert_eq!(last.tags, vec!["check:d"]);
    }

    #[test]
    fn test_worst_ties_go_to_later_record() {
        let checks = vec![record("a", "critical"), record("b", "critical")];
        let summary = reduce(&checks, HealthReduction::Worst).expect("summary");
        assert_eq!(summary.tags, vec!["check:b"]);
    }

    #[tokio::test]
    async fn test_report_success_emits_check_and_up() {
        let mock = MockControlPlane::new().with_json(
            URL,
            HEALTH_STATE_ANY,
            json!([
                { "Node": "node-1", "CheckID": "serfHealth", "Status": "passing", "ServiceName": "", "ServiceID": "" },
                { "Node": "node-1", "CheckID": "service:redis", "Status": "warning", "ServiceName": "redis", "ServiceID": "redis" }
            ]),
        );
        let sink = MetricsCollector::new();
        let instance = Instance::new(URL);

        assert!(report(&mock, &sink, &instance).await);

        let metrics = sink.get_metrics().await;
        let health = metrics.service_checks_named(HEALTH_CHECK);
        assert_eq!(health.len(), 1);
        assert_eq!(health[0].status, ServiceCheckStatus::Warning);
        assert_eq!(
            health[0].tags,
            vec!["check:service:redis", "service:redis", "service-id:redis"]
        );

        let up = metrics.service_checks_named(CONSUL_CHECK);
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].status, ServiceCheckStatus::Ok);
        assert_eq!(up[0].tags, vec!["consul_url:http://localhost:8500"]);
    }

    #[tokio::test]
    async fn test_report_failure_is_critical() {
        let mock = MockControlPlane::new().with_status(URL, HEALTH_STATE_ANY, 500);
        let sink = MetricsCollector::new();
        let instance = Instance::new(URL);

        assert!(!report(&mock, &sink, &instance).await);

        let metrics = sink.get_metrics().await;
        assert!(metrics.service_checks_named(HEALTH_CHECK).is_empty());
        let up = metrics.service_checks_named(CONSUL_CHECK);
        assert_eq!(up.len(), 1);
        assert_eq!(up[0].status, ServiceCheckStatus::Critical);
        assert_eq!(up[0].tags, vec!["consul_url:http://localhost:8500"]);
    }

    #[tokio::test]
    async fn test_report_malformed_body_is_critical() {
        let mock =
            MockControlPlane::new().with_json(URL, HEALTH_STATE_ANY, json!({ "oops": 1 }));
        let sink = MetricsCollector::new();

        assert!(!report(&mock, &sink, &Instance::new(URL)).await);
        let metrics = sink.get_metrics().await;
        assert_eq!(
            metrics.service_checks_named(CONSUL_CHECK)[0].status,
            ServiceCheckStatus::Critical
        );
    }

    #[test]
    fn test_reduction_parses_from_yaml() {
        let parsed: HealthReduction = serde_yaml::from_str("last").expect("reduction");
        assert_eq!(parsed, HealthReduction::Last);
        assert_eq!(HealthReduction::default(), HealthReduction::Worst);
    }
}
