//! Service map query handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use spanmap_core::ServiceMapResponse;
use tracing::error;

use crate::dto::ServiceMapEnvelope;
use crate::ServerState;

/// GET /api/service-map - Renders the current graph.
///
/// Failures still return the response shape, empty, with a 500.
pub async fn get(State(state): State<Arc<ServerState>>) -> Response {
    match state.materializer.render_graph().await {
        Ok(data) => Json(ServiceMapEnvelope { data }).into_response(),
        Err(e) => {
            error!("Failed to render service map: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ServiceMapEnvelope { data: ServiceMapResponse::empty() }),
            )
                .into_response()
        }
    }
}
