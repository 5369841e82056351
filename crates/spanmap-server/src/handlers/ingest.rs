//! OTLP/HTTP ingestion handlers.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use spanmap_engine::otlp::{self, PROTOBUF_CONTENT_TYPE};
use tracing::{debug, error};

use crate::error::AppError;
use crate::ServerState;

fn protobuf(body: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, PROTOBUF_CONTENT_TYPE)], body).into_response()
}

/// POST /v1/traces - Aggregates a trace export into the service map.
pub async fn traces(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    if body.is_empty() {
        debug!("Empty trace export");
        return Ok(protobuf(otlp::trace_ack()));
    }

    let request = otlp::decode_trace_request(&body).map_err(|e| {
        error!("Rejected trace export: {}", e);
        AppError::from(e)
    })?;

    let report = state.aggregator.ingest(&request).await;
    if report.all_failed() {
        return Err(AppError::Internal("failed to store trace export".into()));
    }
    Ok(protobuf(otlp::trace_ack()))
}

/// POST /v1/metrics - Archives a metrics export.
pub async fn metrics(
    State(state): State<Arc<ServerState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    state.metrics.accept(body.to_vec()).await.map_err(|e| {
        error!("Failed to accept metrics export: {}", e);
        AppError::from(e)
    })?;
    Ok(protobuf(otlp::metrics_ack()))
}
