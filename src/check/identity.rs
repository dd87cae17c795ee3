//! Agent identity cache
//!
//! Resolves the polling target's own advertised address, server port and
//! datacenter from `/v1/agent/self`. The lookup happens at most once per
//! instance URL for the lifetime of the cache; concurrent first lookups for
//! the same URL share a single request.

use crate::config::Instance;
use crate::consul::types::AgentSelf;
use crate::consul::{api, ControlPlane};
use crate::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::debug;

/// The polling target's own advertised identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    pub advertise_addr: Option<String>,
    pub server_port: Option<u16>,
    pub datacenter: Option<String>,
}

impl AgentIdentity {
    /// `host:port` as the control plane reports leaders; `None` when either
    /// half is missing from the self-description.
    pub fn agent_url(&self) -> Option<String> {
        match (&self.advertise_addr, self.server_port) {
            (Some(addr), Some(port)) if !addr.is_empty() => {
                Some(format!("{}:{}", addr, port))
            }
            _ => None,
        }
    }
}

impl From<AgentSelf> for AgentIdentity {
    fn from(agent: AgentSelf) -> Self {
        Self {
            advertise_addr: agent.config.advertise_addr,
            server_port: agent.config.ports.server,
            datacenter: agent.config.datacenter.filter(|dc| !dc.is_empty()),
        }
    }
}

/// Write-once identity cache keyed by instance URL
#[derive(Clone, Default)]
pub struct IdentityCache {
    inner: Arc<DashMap<String, Arc<OnceCell<AgentIdentity>>>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached identity for `instance`, fetching it on first use.
    ///
    /// A failed fetch leaves the entry unset so a later poll retries.
    pub async fn resolve(
        &self,
        client: &dyn ControlPlane,
        instance: &Instance,
    ) -> Result<AgentIdentity> {
        let cell = Arc::clone(
            self.inner
                .entry(instance.url.clone())
                .or_default()
                .value(),
        );

        let identity = cell
            .get_or_try_init(|| async move {
                debug!(url = %instance.url, "Resolving agent identity");
                api::agent_self(client, instance)
                    .await
                    .map(AgentIdentity::from)
            })
            .await?;

        Ok(identity.clone())
    }

    pub async fn agent_url(
        &self,
        client: &dyn ControlPlane,
        instance: &Instance,
    ) -> Result<Option<String>> {
        Ok(self.resolve(client, instance).await?.agent_url())
    }

    pub async fn datacenter(
        &self,
        client: &dyn ControlPlane,
        instance: &Instance,
    ) -> Result<Option<String>> {
        Ok(self.resolve(client, instance).await?.datacenter)
    }

    /// Identity already resolved for `url`, without any network call
    pub fn get(&self, url: &str) -> Option<AgentIdentity> {
        self.inner.get(url).and_then(|cell| cell.value().get().cloned())
    }

    pub fn len(&self) -> usize {
        self.inner.iter().filter(|entry| entry.value().initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consul::api::AGENT_SELF;
    use crate::consul::MockControlPlane;
    use serde_json::json;

    const URL_A: &str = "http://consul-a:8500";
    const URL_B: &str = "http://consul-b:8500";

    fn agent_self(addr: &str, dc: &str) -> serde_json::Value {
        json!({
            "Config": {
                "AdvertiseAddr": addr,
                "Datacenter": dc,
                "Ports": { "Server": 8300 }
            }
        })
    }

    #[tokio::test]
    async fn test_resolve_fetches_once() {
        let mock =
            MockControlPlane::new().with_json(URL_A, AGENT_SELF, agent_self("10.0.2.15", "dc1"));
        let cache = IdentityCache::new();
        let instance = Instance::new(URL_A);

        let first = cache.resolve(&mock, &instance).await.expect("first");
        let second = cache.resolve(&mock, &instance).await.expect("second");

        assert_eq!(first, second);
        assert_eq!(mock.request_count(URL_A, AGENT_SELF), 1);
        assert_eq!(first.agent_url().as_deref(), Some("10.0.2.15:8300"));
        assert_eq!(
            cache.datacenter(&mock, &instance).await.expect("dc").as_deref(),
            Some("dc1")
        );
        assert_eq!(mock.request_count(URL_A, AGENT_SELF), 1);
    }

    #[tokio::test]
    async fn test_instances_are_cached_separately() {
        let mock = MockControlPlane::new()
            .with_json(URL_A, AGENT_SELF, agent_self("10.0.2.15", "dc1"))
            .with_json(URL_B, AGENT_SELF, agent_self("10.0.3.15", "dc2"));
        let cache = IdentityCache::new();

        let a = cache.resolve(&mock, &Instance::new(URL_A)).await.expect("a");
        let b = cache.resolve(&mock, &Instance::new(URL_B)).await.expect("b");

        assert_eq!(a.datacenter.as_deref(), Some("dc1"));
        assert_eq!(b.datacenter.as_deref(), Some("dc2"));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(URL_A), Some(a));
    }

    #[tokio::test]
    async fn test_cached_value_survives_endpoint_change() {
        let mock =
            MockControlPlane::new().with_json(URL_A, AGENT_SELF, agent_self("10.0.2.15", "dc1"));
        let cache = IdentityCache::new();
        let instance = Instance::new(URL_A);

        cache.resolve(&mock, &instance).await.expect("first");
        mock.set_json(URL_A, AGENT_SELF, agent_self("10.9.9.9", "dc9"));

        let identity = cache.resolve(&mock, &instance).await.expect("cached");
        assert_eq!(identity.advertise_addr.as_deref(), Some("10.0.2.15"));
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let mock = MockControlPlane::new().with_status(URL_A, AGENT_SELF, 503);
        let cache = IdentityCache::new();
        let instance = Instance::new(URL_A);

        assert!(cache.resolve(&mock, &instance).await.is_err());
        assert!(cache.is_empty());

        mock.set_json(URL_A, AGENT_SELF, agent_self("10.0.2.15", "dc1"));
        assert!(cache.resolve(&mock, &instance).await.is_ok());
        assert_eq!(mock.request_count(URL_A, AGENT_SELF), 2);
    }

    #[test]
    fn test_agent_url_requires_address_and_port() {
        let identity = AgentIdentity {
            advertise_addr: Some("10.0.2.15".to_string()),
            server_port: None,
            datacenter: None,
        };
        assert!(identity.agent_url().is_none());
    }
}
