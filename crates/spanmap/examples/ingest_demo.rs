//! Ingests a synthetic trace export into an in-memory store and prints the
//! rendered service map.
//!
//! Run with: cargo run --example ingest_demo

use std::sync::Arc;
use std::time::Duration;

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use opentelemetry_proto::tonic::resource::v1::Resource;
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, ScopeSpans, Span, Status};
use spanmap::prelude::*;

fn attr(key: &str, value: &str) -> KeyValue {
    KeyValue {
        key: key.to_string(),
        value: Some(AnyValue { value: Some(any_value::Value::StringValue(value.to_string())) }),
    }
}

fn service(name: &str, spans: Vec<Span>) -> ResourceSpans {
    ResourceSpans {
        resource: Some(Resource { attributes: vec![attr("service.name", name)], ..Default::default() }),
        scope_spans: vec![ScopeSpans { spans, ..Default::default() }],
        ..Default::default()
    }
}

fn span(name: &str, attributes: Vec<KeyValue>, failed: bool) -> Span {
    Span {
        name: name.to_string(),
        attributes,
        status: failed.then(|| Status { code: 2, ..Default::default() }),
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let store = Arc::new(ServiceMapStore::in_memory()?);
    let aggregator = Aggregator::new(Arc::clone(&store));
    let materializer = Materializer::new(store, Duration::from_secs(300));

    let request = ExportTraceServiceRequest {
        resource_spans: vec![
            service(
                "gateway",
                vec![
                    span("GET /users", vec![attr("peer.service", "users-api")], false),
                    span("GET /users", vec![attr("peer.service", "users-api")], true),
                    span("HTTP POST", vec![attr("http.host", "billing"), attr("http.route", "/charge")], false),
                ],
            ),
            service(
                "users-api",
                vec![
                    span("SELECT users", vec![attr("db.system", "postgresql")], false),
                    span("cache lookup", vec![attr("cache.type", "redis")], false),
                ],
            ),
        ],
    };

    let report = aggregator.ingest(&request).await;
    println!(
        "Ingested {} spans from {} resources ({} edges)",
        report.spans_applied,
        report.resources,
        report.delta.len()
    );

    let graph = materializer.render_graph().await?;
    println!("{}", serde_json::to_string_pretty(&graph)?);
    Ok(())
}
