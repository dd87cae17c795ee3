//! Counters describing the check's own runs, kept in a Prometheus registry.

use crate::Result;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Skipped,
    Failed,
}

impl RunOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Skipped => "skipped",
            RunOutcome::Failed => "failed",
        }
    }
}

#[derive(Clone)]
pub struct CheckStats {
    registry: Registry,
    runs: IntCounterVec,
}

impl CheckStats {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let runs = IntCounterVec::new(
            Opts::new(
                "consul_check_runs_total",
                "Check runs per instance, by outcome",
            ),
            &["instance", "outcome"],
        )?;
        registry.register(Box::new(runs.clone()))?;

        Ok(Self { registry, runs })
    }

    pub fn record(&self, instance_url: &str, outcome: RunOutcome) {
        self.runs
            .with_label_values(&[instance_url, outcome.as_str()])
            .inc();
    }

    pub fn runs(&self, instance_url: &str, outcome: RunOutcome) -> u64 {
        self.runs
            .with_label_values(&[instance_url, outcome.as_str()])
            .get()
    }

    /// Text exposition of the registry
    pub fn encode(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_are_counted_per_outcome() {
        let stats = CheckStats::new().expect("registry");

        stats.record("http://a:8500", RunOutcome::Completed);
        stats.record("http://a:8500", RunOutcome::Completed);
        stats.record("http://a:8500", RunOutcome::Skipped);

        assert_eq!(stats.runs("http://a:8500", RunOutcome::Completed), 2);
        assert_eq!(stats.runs("http://a:8500", RunOutcome::Skipped), 1);
        assert_eq!(stats.runs("http://a:8500", RunOutcome::Failed), 0);

        let text = stats.encode().expect("encode");
        assert!(text.contains("consul_check_runs_total"));
        assert!(text.contains("outcome=\"skipped\""));
    }
}
