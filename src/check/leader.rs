//! Leadership tracking
//!
//! Decides whether this poll should proceed by comparing the target's own
//! advertised `host:port` with the leader the control plane reports, and
//! emits a `consul.new_leader` event once per observed leader transition.

use crate::check::identity::IdentityCache;
use crate::config::Instance;
use crate::consul::{api, ControlPlane};
use crate::metrics::{Event, MetricSink};
use crate::Result;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const NEW_LEADER_EVENT: &str = "consul.new_leader";

/// Where the polled agent stands relative to the cluster leader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Leadership {
    /// The polled agent is the leader
    Leader,
    /// Another member leads the cluster
    Follower { leader: String },
    /// The control plane reports no leader
    Leaderless,
}

impl Leadership {
    pub fn is_leader(&self) -> bool {
        matches!(self, Leadership::Leader)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderChange {
    pub previous: String,
    pub current: String,
}

impl LeaderChange {
    pub fn to_event(&self, datacenter: Option<&str>) -> Event {
        let dc = datacenter.unwrap_or("unknown");

        let mut tags = vec![
            format!("prev_consul_leader:{}", self.previous),
            format!("curr_consul_leader:{}", self.current),
        ];
        if let Some(dc) = datacenter {
            tags.push(format!("consul_datacenter:{}", dc));
        }

        Event {
            timestamp: Utc::now(),
            event_type: NEW_LEADER_EVENT.to_string(),
            aggregation_key: NEW_LEADER_EVENT.to_string(),
            title: format!("New Consul Leader Elected in {}", dc),
            text: format!(
                "The Node at {} is the new leader of the consul cluster {}",
                self.current, dc
            ),
            tags,
        }
    }
}

/// Last known leader per instance URL
#[derive(Clone, Default)]
pub struct LeadershipTracker {
    last_known: Arc<DashMap<String, String>>,
}

impl LeadershipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `leader` as the last known leader for `url`.
    ///
    /// Returns the transition when a previous leader was recorded and
    /// differs; the first observation never reports a change.
    pub fn observe(&self, url: &str, leader: &str) -> Option<LeaderChange> {
        let previous = self.last_known.insert(url.to_string(), leader.to_string())?;

        (previous != leader).then(|| LeaderChange {
            previous,
            current: leader.to_string(),
        })
    }

    pub fn last_known(&self, url: &str) -> Option<String> {
        self.last_known.get(url).map(|leader| leader.value().clone())
    }

    /// Resolve leadership for this poll, emitting a change event if the
    /// leader moved since the previous poll.
    pub async fn check(
        &self,
        client: &dyn ControlPlane,
        identities: &IdentityCache,
        sink: &dyn MetricSink,
        instance: &Instance,
    ) -> Result<Leadership> {
        let identity = identities.resolve(client, instance).await?;
        let leader = api::status_leader(client, instance).await?;

        // Recorded unconditionally, so losing and regaining a leader are
        // two transitions
        if let Some(change) = self.observe(&instance.url, &leader) {
            info!(
                url = %instance.url,
                previous = %change.previous,
                current = %change.current,
                "Consul leader changed"
            );
            sink.event(change.to_event(identity.datacenter.as_deref()))
                .await;
        }

        if leader.is_empty() {
            debug!(url = %instance.url, "Cluster reports no leader");
            return Ok(Leadership::Leaderless);
        }

        if identity.agent_url().as_deref() == Some(leader.as_str()) {
            Ok(Leadership::Leader)
        } else {
            Ok(Leadership::Follower { leader })
        }
    }

    /// Whether cluster-wide work should run this poll. Any failure while
    /// resolving leadership means "skip".
    pub async fn should_poll(
        &self,
        client: &dyn ControlPlane,
        identities: &IdentityCache,
        sink: &dyn MetricSink,
        instance: &Instance,
    ) -> bool {
        match self.check(client, identities, sink, instance).await {
            Ok(leadership) => leadership.is_leader(),
            Err(e) => {
                warn!(url = %instance.url, error = %e, "Leadership check failed");
                false
            }
        }
    }
}
