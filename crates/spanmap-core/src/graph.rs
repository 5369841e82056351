//! Persisted service graph state.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::view::Relationship;

/// Liveness of a service derived from its last observed activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// A span was attributed to the service within the inactivity threshold.
    Running,
    /// No recent activity, or the service was only ever seen as a target.
    Inactive,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Running => "running",
            ServiceStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "running" => ServiceStatus::Running,
            _ => ServiceStatus::Inactive,
        }
    }
}

/// Request counters for one endpoint of a service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointHealth {
    pub name: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    /// Unix timestamp (milliseconds) of the last increment.
    pub last_updated: i64,
}

impl EndpointHealth {
    pub fn availability(&self) -> f64 {
        crate::availability(self.successful_requests, self.total_requests)
    }
}

/// Request counters for calls from one endpoint to a target endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDependency {
    pub target_service: String,
    pub target_endpoint: String,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub last_updated: i64,
}

impl EndpointDependency {
    pub fn availability(&self) -> f64 {
        crate::availability(self.successful_requests, self.total_requests)
    }
}

/// One service as stored, keyed by `source`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceNode {
    pub source: String,
    pub dependencies: BTreeSet<String>,
    pub endpoints: BTreeMap<String, EndpointHealth>,
    pub endpoint_dependencies: BTreeMap<String, Vec<EndpointDependency>>,
    pub last_updated: i64,
    pub last_activity: i64,
    pub status: ServiceStatus,
}

impl ServiceNode {
    /// A node for a service only known as somebody's dependency.
    pub fn placeholder(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            dependencies: BTreeSet::new(),
            endpoints: BTreeMap::new(),
            endpoint_dependencies: BTreeMap::new(),
            last_updated: 0,
            last_activity: 0,
            status: ServiceStatus::Inactive,
        }
    }

    /// True when the node was active but has been idle longer than `threshold_ms`.
    pub fn is_stale(&self, now_ms: i64, threshold_ms: i64) -> bool {
        self.status == ServiceStatus::Running && now_ms - self.last_activity > threshold_ms
    }
}

/// Edges observed by one aggregation pass, `source -> {targets}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceMapDelta {
    edges: BTreeMap<String, BTreeSet<String>>,
}

impl ServiceMapDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) {
        self.edges.entry(source.into()).or_default().insert(target.into());
    }

    /// Unions another delta into this one.
    pub fn merge(&mut self, other: ServiceMapDelta) {
        for (source, targets) in other.edges {
            self.edges.entry(source).or_default().extend(targets);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn targets(&self, source: &str) -> Option<&BTreeSet<String>> {
        self.edges.get(source)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeSet<String>)> {
        self.edges.iter()
    }

    pub fn to_relationships(&self) -> Vec<Relationship> {
        self.edges
            .iter()
            .map(|(source, targets)| Relationship {
                source: source.clone(),
                dependencies: targets.iter().cloned().collect(),
            })
            .collect()
    }
}
