//! Check configuration
//!
//! Parses the host-agent style YAML document (`init_config` plus a list of
//! `instances`) and resolves every entry into an immutable [`Instance`].
//! Instance-level values override the `init_config` defaults.

use crate::check::health::HealthReduction;
use crate::{CheckError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_COLLECTION_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InitConfig {
    pub service_whitelist: Option<Vec<String>>,
    pub perform_catalog_checks: Option<bool>,
    pub health_reduction: Option<HealthReduction>,
    /// HTTP timeout in seconds
    pub timeout: Option<u64>,
    /// Seconds between two polls of the same instance
    pub min_collection_interval: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceConfig {
    pub url: String,
    pub service_whitelist: Option<Vec<String>>,
    pub perform_catalog_checks: Option<bool>,
    pub health_reduction: Option<HealthReduction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub init_config: InitConfig,
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
}

impl CheckConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: CheckConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Resolve every configured instance against the `init_config` defaults.
    pub fn instances(&self) -> Result<Vec<Instance>> {
        if self.instances.is_empty() {
            return Err(CheckError::ConfigError(
                "at least one instance must be configured".to_string(),
            ));
        }

        self.instances
            .iter()
            .map(|raw| self.resolve(raw))
            .collect()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.init_config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(
            self.init_config
                .min_collection_interval
                .unwrap_or(DEFAULT_COLLECTION_INTERVAL_SECS),
        )
    }

    fn resolve(&self, raw: &InstanceConfig) -> Result<Instance> {
        let url = raw.url.trim().trim_end_matches('/');
        if url.is_empty() {
            return Err(CheckError::ConfigError(
                "instance is missing a url".to_string(),
            ));
        }

        let init = &self.init_config;

        Ok(Instance {
            url: url.to_string(),
            service_whitelist: raw
                .service_whitelist
                .clone()
                .or_else(|| init.service_whitelist.clone())
                .unwrap_or_default(),
            perform_catalog_checks: raw
                .perform_catalog_checks
                .or(init.perform_catalog_checks)
                .unwrap_or(false),
            health_reduction: raw
                .health_reduction
                .or(init.health_reduction)
                .unwrap_or_default(),
        })
    }
}

/// One configured cluster endpoint to poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub url: String,
    pub service_whitelist: Vec<String>,
    pub perform_catalog_checks: bool,
    pub health_reduction: HealthReduction,
}

impl Instance {
    pub fn new(url: impl Into<String>) -> Self {
        let url: String = url.into();
        Self {
            url: url.trim_end_matches('/').to_string(),
            service_whitelist: Vec::new(),
            perform_catalog_checks: false,
            health_reduction: HealthReduction::default(),
        }
    }

    pub fn with_catalog_checks(mut self, enabled: bool) -> Self {
        self.perform_catalog_checks = enabled;
        self
    }

    pub fn with_service_whitelist(mut self, services: Vec<String>) -> Self {
        self.service_whitelist = services;
        self
    }

    pub fn with_health_reduction(mut self, reduction: HealthReduction) -> Self {
        self.health_reduction = reduction;
        self
    }

    /// An empty whitelist admits every service.
    pub fn allows_service(&self, service: &str) -> bool {
        self.service_whitelist.is_empty() || self.service_whitelist.iter().any(|s| s == service)
    }
}
