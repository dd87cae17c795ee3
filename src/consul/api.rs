//! Typed calls for the control-plane endpoints the check consumes.

use crate::config::Instance;
use crate::consul::client::{endpoint_url, ControlPlane};
use crate::consul::types::{
    AgentSelf, CatalogNode, CatalogNodeServices, CatalogServices, HealthCheck,
};
use crate::{CheckError, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;

pub const AGENT_SELF: &str = "/v1/agent/self";
pub const STATUS_LEADER: &str = "/v1/status/leader";
pub const HEALTH_STATE_ANY: &str = "/v1/health/state/any";
pub const CATALOG_SERVICES: &str = "/v1/catalog/services";
pub const CATALOG_NODES: &str = "/v1/catalog/nodes";

/// Everything but RFC 3986 unreserved characters is escaped in names and tags
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

async fn fetch<T: DeserializeOwned>(
    client: &dyn ControlPlane,
    instance: &Instance,
    endpoint: &str,
) -> Result<T> {
    let value = client.request(instance, endpoint).await?;
    serde_json::from_value(value).map_err(|source| CheckError::Decode {
        url: endpoint_url(instance, endpoint),
        source,
    })
}

pub async fn agent_self(client: &dyn ControlPlane, instance: &Instance) -> Result<AgentSelf> {
    fetch(client, instance, AGENT_SELF).await
}

/// Current leader as `host:port`; empty while the cluster has no leader.
pub async fn status_leader(client: &dyn ControlPlane, instance: &Instance) -> Result<String> {
    fetch(client, instance, STATUS_LEADER).await
}

pub async fn health_state_any(
    client: &dyn ControlPlane,
    instance: &Instance,
) -> Result<Vec<HealthCheck>> {
    fetch(client, instance, HEALTH_STATE_ANY).await
}

pub async fn catalog_services(
    client: &dyn ControlPlane,
    instance: &Instance,
) -> Result<CatalogServices> {
    fetch(client, instance, CATALOG_SERVICES).await
}

pub async fn catalog_nodes(
    client: &dyn ControlPlane,
    instance: &Instance,
) -> Result<Vec<CatalogNode>> {
    fetch(client, instance, CATALOG_NODES).await
}

pub fn catalog_service_endpoint(service: &str, tag: Option<&str>) -> String {
    let service = utf8_percent_encode(service, COMPONENT);
    match tag {
        Some(tag) => format!(
            "/v1/catalog/service/{}?tag={}",
            service,
            utf8_percent_encode(tag, COMPONENT)
        ),
        None => format!("/v1/catalog/service/{}", service),
    }
}

/// Nodes providing `service`, optionally narrowed to those carrying `tag`.
pub async fn catalog_service(
    client: &dyn ControlPlane,
    instance: &Instance,
    service: &str,
    tag: Option<&str>,
) -> Result<Vec<CatalogNode>> {
    fetch(client, instance, &catalog_service_endpoint(service, tag)).await
}

pub fn catalog_node_endpoint(node: &str) -> String {
    format!("/v1/catalog/node/{}", utf8_percent_encode(node, COMPONENT))
}

/// Services registered on `node`; `None` when the node is unknown.
pub async fn catalog_node(
    client: &dyn ControlPlane,
    instance: &Instance,
    node: &str,
) -> Result<Option<CatalogNodeServices>> {
    fetch(client, instance, &catalog_node_endpoint(node)).await
}
