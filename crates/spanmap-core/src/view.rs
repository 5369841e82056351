//! Rendered graph shapes sent to API and websocket clients.

use serde::{Deserialize, Serialize};

use crate::graph::ServiceStatus;

/// The externally consumed service graph, recomputed on every read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceMapResponse {
    pub services: Vec<ServiceView>,
    pub relationships: Vec<Relationship>,
}

impl ServiceMapResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn service(&self, name: &str) -> Option<&ServiceView> {
        self.services.iter().find(|s| s.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceView {
    pub name: String,
    pub status: ServiceStatus,
    pub last_activity: i64,
    pub endpoints: Vec<EndpointView>,
}

impl ServiceView {
    pub fn endpoint(&self, name: &str) -> Option<&EndpointView> {
        self.endpoints.iter().find(|e| e.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointView {
    pub name: String,
    pub availability: f64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub dependencies: Vec<DependencyView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyView {
    pub target_service: String,
    pub target_endpoint: String,
    pub availability: f64,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
}

/// A service and the services it calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub dependencies: Vec<String>,
}

/// Frame pushed to real-time subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum UpdateFrame {
    /// Full snapshot, sent once when a subscriber connects.
    Initial(ServiceMapResponse),
    /// Edges observed by one aggregation pass.
    Update(Vec<Relationship>),
}
