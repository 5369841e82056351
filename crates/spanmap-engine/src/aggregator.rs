//! Folds classified spans into the service graph.
//!
//! Each resource of an export request is applied independently on the
//! blocking pool; the adjacency upsert for a source runs once per batch after
//! all of its counter increments.

use std::sync::Arc;

use futures::future::join_all;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use spanmap_core::{NormalizedSpan, ServiceMapDelta, SpanMapError};
use spanmap_store::{now_ms, CounterDelta, ServiceMapStore};
use tracing::{debug, error, info, warn};

use crate::classifier::classify;
use crate::normalizer::normalize_resource_spans;
use crate::EngineError;

/// Receives the edges observed by each committed ingestion.
pub trait UpdateSink: Send + Sync {
    fn notify(&self, delta: &ServiceMapDelta);
}

/// Result of applying one resource's spans.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub applied: usize,
    pub skipped: usize,
    pub delta: ServiceMapDelta,
}

/// Result of a whole export request.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub resources: usize,
    /// Resources whose storage writes failed.
    pub failed_resources: usize,
    pub spans_applied: usize,
    pub spans_skipped: usize,
    pub delta: ServiceMapDelta,
}

impl IngestReport {
    /// True when the request had resources and none of them committed.
    pub fn all_failed(&self) -> bool {
        self.resources > 0 && self.failed_resources == self.resources
    }
}

pub struct Aggregator {
    store: Arc<ServiceMapStore>,
    sink: Option<Arc<dyn UpdateSink>>,
}

impl Aggregator {
    pub fn new(store: Arc<ServiceMapStore>) -> Self {
        Self { store, sink: None }
    }

    pub fn with_sink(mut self, sink: Arc<dyn UpdateSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn store(&self) -> &Arc<ServiceMapStore> {
        &self.store
    }

    /// Applies every resource of `request` and notifies the sink once with
    /// the union of their deltas.
    pub async fn ingest(&self, request: &ExportTraceServiceRequest) -> IngestReport {
        let resources: Vec<_> = request.resource_spans.iter().map(normalize_resource_spans).collect();
        let mut report = IngestReport { resources: resources.len(), ..Default::default() };

        let results = join_all(resources.into_iter().map(|resource| async move {
            let service = resource.service_name.clone();
            (service, self.apply_batch(resource.spans, resource.service_name).await)
        }))
        .await;

        for (service, result) in results {
            match result {
                Ok(outcome) => {
                    report.spans_applied += outcome.applied;
                    report.spans_skipped += outcome.skipped;
                    report.delta.merge(outcome.delta);
                }
                Err(e) => {
                    error!(service = %service, "Failed to apply span batch: {}", e);
                    report.failed_resources += 1;
                }
            }
        }

        if !report.delta.is_empty() {
            if let Some(sink) = &self.sink {
                sink.notify(&report.delta);
            }
        }

        info!(
            resources = report.resources,
            spans = report.spans_applied,
            skipped = report.spans_skipped,
            edges = report.delta.len(),
            "Ingested trace batch"
        );
        report
    }

    /// Applies the spans of one service on the blocking pool.
    pub async fn apply_batch(
        &self,
        spans: Vec<NormalizedSpan>,
        service_name: String,
    ) -> Result<BatchOutcome, EngineError> {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || apply_spans(&store, &spans, &service_name, now_ms())).await?
    }
}

/// Applies `spans` for `service_name` at time `now`.
///
/// Malformed spans are skipped; a storage failure aborts the remainder of the
/// batch and leaves earlier increments committed.
pub fn apply_spans(
    store: &ServiceMapStore,
    spans: &[NormalizedSpan],
    service_name: &str,
    now: i64,
) -> Result<BatchOutcome, EngineError> {
    let mut outcome = BatchOutcome::default();

    for span in spans {
        if let Err(e) = validate(span) {
            warn!(service = %service_name, "Skipping span: {}", e);
            outcome.skipped += 1;
            continue;
        }

        let delta = CounterDelta::single(span.status_is_error);
        store.increment_endpoint(service_name, &span.name, delta, now)?;

        if let Some(dependency) = classify(span) {
            store.increment_dependency(
                service_name,
                &span.name,
                &dependency.target_service,
                &dependency.target_endpoint,
                delta,
                now,
            )?;
            outcome.delta.insert(service_name, dependency.target_service);
        }
        outcome.applied += 1;
    }

    if outcome.applied > 0 {
        let targets = outcome.delta.targets(service_name).cloned().unwrap_or_default();
        store.upsert_adjacency(service_name, &targets, now)?;
    }

    debug!(
        service = %service_name,
        applied = outcome.applied,
        skipped = outcome.skipped,
        "Applied span batch"
    );
    Ok(outcome)
}

fn validate(span: &NormalizedSpan) -> Result<(), SpanMapError> {
    if span.name.is_empty() {
        return Err(SpanMapError::malformed_span(&span.span_id, "span has no name"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{failed_span, request, resource_spans, span, string_kv};
    use spanmap_core::ServiceStatus;
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        deltas: Mutex<Vec<ServiceMapDelta>>,
    }

    impl UpdateSink for RecordingSink {
        fn notify(&self, delta: &ServiceMapDelta) {
            self.deltas.lock().unwrap().push(delta.clone());
        }
    }

    fn store() -> Arc<ServiceMapStore> {
        Arc::new(ServiceMapStore::in_memory().unwrap())
    }

    #[test]
    fn test_apply_spans_counts_endpoints_and_dependencies() {
        let store = store();
        let spans = vec![
            NormalizedSpan::new("orders", "SELECT orders").with_attribute("db.system", "postgresql"),
            NormalizedSpan::new("orders", "SELECT orders")
                .with_attribute("db.system", "postgresql")
                .with_error(true),
            NormalizedSpan::new("orders", "render"),
        ];

        let outcome = apply_spans(&store, &spans, "orders", 1_000).unwrap();
        assert_eq!(outcome.applied, 3);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(
            outcome.delta.targets("orders"),
            Some(&BTreeSet::from(["postgresql".to_string()]))
        );

        let node = store.load_service_node("orders").unwrap().unwrap();
        let select = &node.endpoints["SELECT orders"];
        assert_eq!((select.total_requests, select.successful_requests, select.failed_requests), (2, 1, 1));
        assert_eq!(node.endpoints["render"].total_requests, 1);

        let deps = &node.endpoint_dependencies["SELECT orders"];
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].target_service, "postgresql");
        assert_eq!(deps[0].target_endpoint, "query");
        assert_eq!(deps[0].failed_requests, 1);

        assert_eq!(node.dependencies, BTreeSet::from(["postgresql".to_string()]));
        assert_eq!(node.status, ServiceStatus::Running);
        assert_eq!(node.last_activity, 1_000);
    }

    #[test]
    fn test_unnamed_span_is_skipped() {
        let store = store();
        let spans = vec![NormalizedSpan::new("orders", ""), NormalizedSpan::new("orders", "ok")];

        let outcome = apply_spans(&store, &spans, "orders", 1).unwrap();
        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.skipped, 1);

        let node = store.load_service_node("orders").unwrap().unwrap();
        assert_eq!(node.endpoints.len(), 1);
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let store = store();
        let outcome = apply_spans(&store, &[], "orders", 1).unwrap();
        assert!(outcome.delta.is_empty());
        assert!(store.load_service_node("orders").unwrap().is_none());
    }

    #[test]
    fn test_discarded_target_records_endpoint_only() {
        let store = store();
        let spans = vec![NormalizedSpan::new("web", "GET /").with_attribute("peer.service", "10.1.1.1:80")];

        let outcome = apply_spans(&store, &spans, "web", 5).unwrap();
        assert!(outcome.delta.is_empty());

        let node = store.load_service_node("web").unwrap().unwrap();
        assert_eq!(node.endpoints["GET /"].total_requests, 1);
        assert!(node.endpoint_dependencies.is_empty());
        assert!(node.dependencies.is_empty());
    }

    #[tokio::test]
    async fn test_ingest_gateway_to_users() {
        let store = store();
        let sink = Arc::new(RecordingSink::default());
        let aggregator = Aggregator::new(Arc::clone(&store)).with_sink(sink.clone());

        let req = request(vec![resource_spans(
            Some("gateway"),
            vec![span("GET /users", vec![string_kv("peer.service", "users-api")])],
        )]);
        let report = aggregator.ingest(&req).await;

        assert_eq!(report.resources, 1);
        assert_eq!(report.failed_resources, 0);
        assert_eq!(report.spans_applied, 1);

        let node = store.load_service_node("gateway").unwrap().unwrap();
        let endpoint = &node.endpoints["GET /users"];
        assert_eq!((endpoint.total_requests, endpoint.successful_requests, endpoint.failed_requests), (1, 1, 0));
        let dep = &node.endpoint_dependencies["GET /users"][0];
        assert_eq!((dep.target_service.as_str(), dep.target_endpoint.as_str()), ("users-api", "GET /users"));
        assert_eq!(node.dependencies, BTreeSet::from(["users-api".to_string()]));

        let deltas = sink.deltas.lock().unwrap();
        assert_eq!(deltas.len(), 1);
        let relationships = deltas[0].to_relationships();
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].source, "gateway");
        assert_eq!(relationships[0].dependencies, vec!["users-api"]);
    }

    #[tokio::test]
    async fn test_ingest_multiple_resources_merges_delta() {
        let store = store();
        let sink = Arc::new(RecordingSink::default());
        let aggregator = Aggregator::new(Arc::clone(&store)).with_sink(sink.clone());

        let req = request(vec![
            resource_spans(
                Some("web"),
                vec![span("GET /items", vec![string_kv("http.route", "/items"), string_kv("http.host", "catalog")])],
            ),
            resource_spans(Some("catalog"), vec![failed_span("query", vec![string_kv("db.system", "mysql")])]),
            resource_spans(None, vec![span("noop", vec![])]),
        ]);
        let report = aggregator.ingest(&req).await;
        assert_eq!(report.resources, 3);
        assert_eq!(report.spans_applied, 3);

        let deltas = sink.deltas.lock().unwrap();
        assert_eq!(deltas.len(), 1);
        let sources: Vec<_> = deltas[0].iter().map(|(source, _)| source.clone()).collect();
        assert_eq!(sources, vec!["catalog", "web"]);

        let catalog = store.load_service_node("catalog").unwrap().unwrap();
        assert_eq!(catalog.endpoints["query"].failed_requests, 1);
        assert!(store.load_service_node("unknown").unwrap().is_some());
    }

    #[tokio::test]
    async fn test_ingest_without_edges_does_not_notify() {
        let store = store();
        let sink = Arc::new(RecordingSink::default());
        let aggregator = Aggregator::new(store).with_sink(sink.clone());

        let req = request(vec![resource_spans(Some("worker"), vec![span("tick", vec![])])]);
        let report = aggregator.ingest(&req).await;

        assert!(report.delta.is_empty());
        assert!(!report.all_failed());
        assert!(sink.deltas.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ingest_empty_request() {
        let aggregator = Aggregator::new(store());
        let report = aggregator.ingest(&request(vec![])).await;
        assert_eq!(report.resources, 0);
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn test_concurrent_ingest_keeps_every_increment() {
        let store = store();
        let aggregator = Arc::new(Aggregator::new(Arc::clone(&store)));

        let tasks: Vec<_> = (0..10)
            .map(|_| {
                let aggregator = Arc::clone(&aggregator);
                tokio::spawn(async move {
                    let req = request(vec![resource_spans(
                        Some("gateway"),
                        vec![span("GET /users", vec![string_kv("peer.service", "users-api")]); 5],
                    )]);
                    aggregator.ingest(&req).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let node = store.load_service_node("gateway").unwrap().unwrap();
        let endpoint = &node.endpoints["GET /users"];
        assert_eq!(endpoint.total_requests, 50);
        assert_eq!(endpoint.total_requests, endpoint.successful_requests + endpoint.failed_requests);
        assert_eq!(node.endpoint_dependencies["GET /users"][0].total_requests, 50);
    }
}
