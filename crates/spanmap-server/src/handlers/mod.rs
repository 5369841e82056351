//! HTTP route handlers for the spanmap server.

pub mod ingest;
pub mod service_map;

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}
