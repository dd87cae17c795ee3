use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Response of `/v1/agent/self`. Only the fields the check reads are modelled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentSelf {
    #[serde(default)]
    pub config: AgentConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentConfig {
    #[serde(default)]
    pub advertise_addr: Option<String>,
    #[serde(default)]
    pub datacenter: Option<String>,
    #[serde(default)]
    pub ports: AgentPorts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentPorts {
    #[serde(default)]
    pub server: Option<u16>,
}

/// One entry of `/v1/health/state/any`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    #[serde(default, rename = "CheckID")]
    pub check_id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default, rename = "ServiceID")]
    pub service_id: Option<String>,
}

impl HealthCheck {
    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref().filter(|s| !s.is_empty())
    }

    pub fn service_id(&self) -> Option<&str> {
        self.service_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// `/v1/catalog/services`: service name to its tags.
pub type CatalogServices = BTreeMap<String, Vec<String>>;

/// One entry of `/v1/catalog/nodes` or `/v1/catalog/service/<name>`.
///
/// Both endpoints share the node fields; the `Service*` fields are only
/// present in the per-service listing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogNode {
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default, rename = "ServiceID")]
    pub service_id: Option<String>,
    #[serde(default)]
    pub service_name: Option<String>,
    #[serde(default)]
    pub service_port: Option<u16>,
    #[serde(default)]
    pub service_tags: Option<Vec<String>>,
}

impl CatalogNode {
    /// Node identifier, if present and non-empty
    pub fn node_id(&self) -> Option<&str> {
        self.node.as_deref().filter(|n| !n.is_empty())
    }
}

/// Response of `/v1/catalog/node/<name>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogNodeServices {
    #[serde(default)]
    pub node: Option<CatalogNode>,
    #[serde(default)]
    pub services: BTreeMap<String, NodeService>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeService {
    #[serde(default, rename = "ID")]
    pub id: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_self_reads_nested_config() {
        let raw = json!({
            "Config": {
                "AdvertiseAddr": "10.0.2.15",
                "Datacenter": "dc1",
                "Ports": { "Server": 8300, "HTTP": 8500 }
            },
            "Member": { "Name": "node-1" }
        });

        let agent: AgentSelf = serde_json::from_value(raw).expect("agent self");
        assert_eq!(agent.config.advertise_addr.as_deref(), Some("10.0.2.15"));
        assert_eq!(agent.config.datacenter.as_deref(), Some("dc1"));
        assert_eq!(agent.config.ports.server, Some(8300));
    }

    #[test]
    fn test_agent_self_tolerates_missing_config() {
        let agent: AgentSelf = serde_json::from_value(json!({})).expect("agent self");
        assert!(agent.config.advertise_addr.is_none());
        assert!(agent.config.ports.server.is_none());
    }

    #[test]
    fn test_health_check_treats_empty_service_as_absent() {
        let check: HealthCheck = serde_json::from_value(json!({
            "Node": "node-1",
            "CheckID": "serfHealth",
            "Status": "passing",
            "ServiceName": "",
            "ServiceID": ""
        }))
        .expect("health check");

        assert_eq!(check.check_id, "serfHealth");
        assert!(check.service_name().is_none());
        assert!(check.service_id().is_none());
    }

    #[test]
    fn test_catalog_node_without_id() {
        let node: CatalogNode =
            serde_json::from_value(json!({ "Address": "10.0.2.15", "Node": "" }))
                .expect("catalog node");
        assert!(node.node_id().is_none());
    }
}
