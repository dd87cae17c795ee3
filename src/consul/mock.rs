//! In-memory control plane
//!
//! Serves canned responses keyed by full request URL and counts every
//! request it receives. A test double for the check; the runner always
//! talks to [`HttpControlPlane`](crate::consul::HttpControlPlane).

use crate::config::Instance;
use crate::consul::client::{endpoint_url, ControlPlane};
use crate::{CheckError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum MockResponse {
    Json(Value),
    Status(u16),
    Timeout,
}

#[derive(Clone, Default)]
pub struct MockControlPlane {
    responses: Arc<DashMap<String, MockResponse>>,
    requests: Arc<DashMap<String, usize>>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_json(self, base_url: &str, endpoint: &str, body: Value) -> Self {
        self.set_json(base_url, endpoint, body);
        self
    }

    pub fn with_status(self, base_url: &str, endpoint: &str, status: u16) -> Self {
        self.responses
            .insert(join(base_url, endpoint), MockResponse::Status(status));
        self
    }

    pub fn with_timeout(self, base_url: &str, endpoint: &str) -> Self {
        self.responses
            .insert(join(base_url, endpoint), MockResponse::Timeout);
        self
    }

    /// Replace the response for one endpoint, e.g. to simulate a leader change
    pub fn set_json(&self, base_url: &str, endpoint: &str, body: Value) {
        self.responses
            .insert(join(base_url, endpoint), MockResponse::Json(body));
    }

    /// Number of requests received for one endpoint
    pub fn request_count(&self, base_url: &str, endpoint: &str) -> usize {
        self.requests
            .get(&join(base_url, endpoint))
            .map(|count| *count)
            .unwrap_or(0)
    }

    pub fn total_requests(&self) -> usize {
        self.requests.iter().map(|entry| *entry.value()).sum()
    }
}

fn join(base_url: &str, endpoint: &str) -> String {
    endpoint_url(&Instance::new(base_url), endpoint)
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    async fn request(&self, instance: &Instance, endpoint: &str) -> Result<Value> {
        let url = endpoint_url(instance, endpoint);
        *self.requests.entry(url.clone()).or_insert(0) += 1;

        let response = self.responses.get(&url).map(|r| r.value().clone());
        match response {
            Some(MockResponse::Json(body)) => Ok(body),
            Some(MockResponse::Status(status)) => Err(CheckError::HttpStatus { url, status }),
            Some(MockResponse::Timeout) => Err(CheckError::Timeout { url }),
            None => Err(CheckError::HttpStatus { url, status: 404 }),
        }
    }
}
