//! Catalog crawler
//!
//! Counts the services and nodes in the catalog, then walks every
//! (whitelisted) service to count the nodes providing it while building a
//! node to services fan-out, and finally reports one gauge per node.
//!
//! Failures are not contained here: they propagate to the caller.

use crate::check::identity::IdentityCache;
use crate::config::Instance;
use crate::consul::types::CatalogNode;
use crate::consul::{api, ControlPlane};
use crate::metrics::MetricSink;
use crate::Result;
use std::collections::BTreeMap;
use tracing::debug;

pub const SERVICES_UP: &str = "consul.catalog.services_up";
pub const NODES_UP: &str = "consul.catalog.nodes_up";

/// Node identifier to the services seen on it, in crawl order.
pub type FanOut = BTreeMap<String, Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogSummary {
    pub services: usize,
    pub nodes: usize,
    pub fan_out: FanOut,
}

/// Append `service` to every identified node in `providers`. Entries with
/// no usable node identifier are skipped; repeats are kept.
pub fn record_providers(fan_out: &mut FanOut, service: &str, providers: &[CatalogNode]) {
    for provider in providers {
        let Some(node_id) = provider.node_id() else {
            continue;
        };

        fan_out
            .entry(node_id.to_string())
            .or_default()
            .push(service.to_string());
    }
}

pub async fn crawl(
    client: &dyn ControlPlane,
    identities: &IdentityCache,
    sink: &dyn MetricSink,
    instance: &Instance,
) -> Result<CatalogSummary> {
    let services = api::catalog_services(client, instance).await?;
    let nodes = api::catalog_nodes(client, instance).await?;

    let mut main_tags = Vec::new();
    if let Some(dc) = identities.datacenter(client, instance).await? {
        main_tags.push(format!("consul_datacenter:{}", dc));
    }

    sink.gauge(SERVICES_UP, services.len() as f64, &main_tags)
        .await;
    sink.gauge(NODES_UP, nodes.len() as f64, &main_tags).await;

    let mut fan_out = FanOut::new();

    for service in services.keys().filter(|s| instance.allows_service(s)) {
        let providers = api::catalog_service(client, instance, service, None).await?;
        let service_tags = vec![format!("consul_service_id:{}", service)];

        sink.gauge(NODES_UP, providers.len() as f64, &service_tags)
            .await;

        record_providers(&mut fan_out, service, &providers);
    }

    for (node, node_services) in &fan_out {
        let node_tags = vec![format!("consul_node_id:{}", node)];
        sink.gauge(SERVICES_UP, node_services.len() as f64, &node_tags)
            .await;
    }

    debug!(
        url = %instance.url,
        services = services.len(),
        nodes = nodes.len(),
        crawled_nodes = fan_out.len(),
        "Catalog crawl complete"
    );

    Ok(CatalogSummary {
        services: services.len(),
        nodes: nodes.len(),
        fan_out,
    })
}
