//! Renders the stored graph into the read model served to clients.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use spanmap_core::{
    DependencyView, EndpointHealth, EndpointView, Relationship, ServiceMapResponse, ServiceNode,
    ServiceStatus, ServiceView, SpanMapError,
};
use spanmap_store::{now_ms, ServiceMapStore};
use tracing::{info, warn};

use crate::EngineError;

pub struct Materializer {
    store: Arc<ServiceMapStore>,
    inactive_threshold: Duration,
}

impl Materializer {
    pub fn new(store: Arc<ServiceMapStore>, inactive_threshold: Duration) -> Self {
        Self { store, inactive_threshold }
    }

    pub fn inactive_threshold(&self) -> Duration {
        self.inactive_threshold
    }

    /// Renders the graph as of now on the blocking pool.
    pub async fn render_graph(&self) -> Result<ServiceMapResponse, EngineError> {
        let store = Arc::clone(&self.store);
        let threshold_ms = self.threshold_ms();
        tokio::task::spawn_blocking(move || render(&store, threshold_ms, now_ms())).await?
    }

    /// Renders the graph as of `now` (Unix milliseconds).
    ///
    /// Running nodes idle for longer than the inactivity threshold are
    /// persisted as inactive before rendering.
    pub fn render_graph_at(&self, now: i64) -> Result<ServiceMapResponse, EngineError> {
        render(&self.store, self.threshold_ms(), now)
    }

    fn threshold_ms(&self) -> i64 {
        i64::try_from(self.inactive_threshold.as_millis()).unwrap_or(i64::MAX)
    }
}

fn render(store: &ServiceMapStore, threshold_ms: i64, now: i64) -> Result<ServiceMapResponse, EngineError> {
    let mut nodes = store.load_service_nodes()?;

    for node in nodes.iter_mut().filter(|node| node.is_stale(now, threshold_ms)) {
        match store.mark_inactive_if_stale(&node.source, now.saturating_sub(threshold_ms)) {
            Ok(true) => {
                info!(service = %node.source, last_activity = node.last_activity, "Service marked inactive");
                node.status = ServiceStatus::Inactive;
            }
            // touched by a write since we loaded it
            Ok(false) => {}
            Err(e) => {
                warn!(service = %node.source, "Failed to persist inactive status: {}", e);
                node.status = ServiceStatus::Inactive;
            }
        }
    }

    let mut services: BTreeMap<String, ServiceView> = BTreeMap::new();
    let mut relationships = Vec::new();

    for node in &nodes {
        if let Err(e) = validate(node) {
            warn!("Skipping service node: {}", e);
            continue;
        }
        services.insert(node.source.clone(), service_view(node));
        relationships.push(Relationship {
            source: node.source.clone(),
            dependencies: node.dependencies.iter().cloned().collect(),
        });
    }

    let referenced: Vec<String> = relationships
        .iter()
        .flat_map(|rel| rel.dependencies.iter())
        .filter(|target| !services.contains_key(target.as_str()))
        .cloned()
        .collect();
    for target in referenced {
        services
            .entry(target.clone())
            .or_insert_with(|| service_view(&ServiceNode::placeholder(target)));
    }

    Ok(ServiceMapResponse { services: services.into_values().collect(), relationships })
}

fn validate(node: &ServiceNode) -> Result<(), SpanMapError> {
    if node.source.is_empty() {
        return Err(SpanMapError::invalid_record("", "empty source name"));
    }
    for endpoint in node.endpoints.values() {
        if !counts_consistent(endpoint.total_requests, endpoint.successful_requests, endpoint.failed_requests) {
            return Err(SpanMapError::invalid_record(
                &node.source,
                format!("inconsistent counters on endpoint '{}'", endpoint.name),
            ));
        }
    }
    for dependency in node.endpoint_dependencies.values().flatten() {
        if !counts_consistent(dependency.total_requests, dependency.successful_requests, dependency.failed_requests) {
            return Err(SpanMapError::invalid_record(
                &node.source,
                format!(
                    "inconsistent counters on dependency '{}/{}'",
                    dependency.target_service, dependency.target_endpoint
                ),
            ));
        }
    }
    Ok(())
}

fn counts_consistent(total: u64, successful: u64, failed: u64) -> bool {
    successful.checked_add(failed) == Some(total)
}

fn service_view(node: &ServiceNode) -> ServiceView {
    let endpoints = node
        .endpoints
        .values()
        .filter(|endpoint| {
            if endpoint.name.is_empty() {
                warn!(service = %node.source, "Skipping unnamed endpoint");
                return false;
            }
            true
        })
        .map(|endpoint| endpoint_view(node, endpoint))
        .collect();

    ServiceView {
        name: node.source.clone(),
        status: node.status,
        last_activity: node.last_activity,
        endpoints,
    }
}

fn endpoint_view(node: &ServiceNode, endpoint: &EndpointHealth) -> EndpointView {
    let dependencies = node
        .endpoint_dependencies
        .get(&endpoint.name)
        .into_iter()
        .flatten()
        .filter(|dep| !dep.target_service.is_empty() && !dep.target_endpoint.is_empty())
        .map(|dep| DependencyView {
            target_service: dep.target_service.clone(),
            target_endpoint: dep.target_endpoint.clone(),
            availability: dep.availability(),
            total_requests: dep.total_requests,
            successful_requests: dep.successful_requests,
            failed_requests: dep.failed_requests,
        })
        .collect();

    EndpointView {
        name: endpoint.name.clone(),
        availability: endpoint.availability(),
        total_requests: endpoint.total_requests,
        successful_requests: endpoint.successful_requests,
        failed_requests: endpoint.failed_requests,
        dependencies,
    }
}
