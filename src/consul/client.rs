use crate::config::Instance;
use crate::{CheckError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

/// Issues GET requests against an instance's control-plane API.
///
/// Implementations build the full URL from the instance base URL and the
/// endpoint path and return the decoded JSON body. They never retry and
/// never cache.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn request(&self, instance: &Instance, endpoint: &str) -> Result<Value>;
}

pub fn endpoint_url(instance: &Instance, endpoint: &str) -> String {
    format!("{}{}", instance.url, endpoint)
}

/// reqwest-backed control-plane adapter.
pub struct HttpControlPlane {
    client: Client,
}

impl HttpControlPlane {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            CheckError::ConfigError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn request(&self, instance: &Instance, endpoint: &str) -> Result<Value> {
        let url = endpoint_url(instance, endpoint);
        debug!(url = %url, "Consul request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(&url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| transport_error(&url, e))?;

        serde_json::from_str(&body).map_err(|source| CheckError::Decode { url, source })
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> CheckError {
    if e.is_timeout() {
        error!(url = %url, "Consul request timed out");
        CheckError::Timeout {
            url: url.to_string(),
        }
    } else {
        CheckError::Transport {
            url: url.to_string(),
            source: e,
        }
    }
}
