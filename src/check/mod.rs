//! The Consul check
//!
//! One [`ConsulCheck`] serves every configured instance. Each poll:
//! 1. asks the [`LeadershipTracker`] whether this agent leads the cluster,
//!    and stops if it does not;
//! 2. runs the health aggregate (`consul.check` / `consul.up`);
//! 3. crawls the catalog when the instance enables catalog checks.
//!
//! Leadership and health failures are absorbed where they happen. Catalog
//! failures are returned to the caller after whatever was already emitted.

pub mod catalog;
pub mod health;
pub mod identity;
pub mod leader;

pub use catalog::{CatalogSummary, FanOut};
pub use health::{HealthReduction, HealthSummary};
pub use identity::{AgentIdentity, IdentityCache};
pub use leader::{LeaderChange, Leadership, LeadershipTracker};

use crate::config::Instance;
use crate::consul::ControlPlane;
use crate::metrics::{CheckStats, MetricSink, RunOutcome};
use crate::Result;
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// This agent is not the leader, or leadership could not be resolved
    Skipped,
    Completed {
        healthy: bool,
        catalog: Option<CatalogSummary>,
    },
}

pub struct ConsulCheck {
    client: Arc<dyn ControlPlane>,
    sink: Arc<dyn MetricSink>,
    identities: IdentityCache,
    leadership: LeadershipTracker,
}

impl ConsulCheck {
    pub fn new(client: Arc<dyn ControlPlane>, sink: Arc<dyn MetricSink>) -> Self {
        Self {
            client,
            sink,
            identities: IdentityCache::new(),
            leadership: LeadershipTracker::new(),
        }
    }

    pub async fn run(&self, instance: &Instance) -> Result<PollOutcome> {
        let client = self.client.as_ref();
        let sink = self.sink.as_ref();

        if !self
            .leadership
            .should_poll(client, &self.identities, sink, instance)
            .await
        {
            debug!(url = %instance.url, "Skipping check for this instance");
            return Ok(PollOutcome::Skipped);
        }

        let healthy = health::report(client, sink, instance).await;

        let catalog = if instance.perform_catalog_checks {
            Some(catalog::crawl(client, &self.identities, sink, instance).await?)
        } else {
            None
        };

        Ok(PollOutcome::Completed { healthy, catalog })
    }

    /// Poll every instance in turn. A failing instance is logged and
    /// counted; it never stops the remaining instances.
    pub async fn run_all(&self, instances: &[Instance], stats: &CheckStats) {
        for instance in instances {
            let outcome = match self.run(instance).await {
                Ok(PollOutcome::Skipped) => RunOutcome::Skipped,
                Ok(PollOutcome::Completed { .. }) => RunOutcome::Completed,
                Err(e) => {
                    error!(url = %instance.url, error = %e, "Consul check failed");
                    RunOutcome::Failed
                }
            };
            stats.record(&instance.url, outcome);
        }
    }

    pub fn identities(&self) -> &IdentityCache {
        &self.identities
    }

    pub fn leadership(&self) -> &LeadershipTracker {
        &self.leadership
    }
}
