//! HTTP surface of spanmap: OTLP ingestion, graph queries and live updates.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod services;
mod state;
mod ws;

pub use state::ServerState;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{Request, Response};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::decompression::RequestDecompressionLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest accepted (decompressed) export body.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

pub fn build_router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %req.method(),
                uri = %req.uri(),
                version = ?req.version(),
            )
        })
        .on_response(|res: &Response<Body>, latency: Duration, _span: &tracing::Span| {
            info!(
                latency = %format!("{} ms", latency.as_millis()),
                status = %res.status().as_u16(),
                "finished processing request"
            );
        });

    let ingest_routes = Router::new()
        .route("/v1/traces", post(handlers::ingest::traces))
        .route("/v1/metrics", post(handlers::ingest::metrics))
        .layer(RequestDecompressionLayer::new())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    let logged_routes = Router::new()
        .merge(ingest_routes)
        .route("/api/service-map", get(handlers::service_map::get))
        .route("/ws", get(ws::ws_handler))
        .layer(trace_layer);

    Router::new()
        .merge(logged_routes)
        .route("/health", get(handlers::health))
        .layer(cors)
        .with_state(state)
}
