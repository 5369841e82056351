use serde::{Deserialize, Serialize};
use spanmap_core::ServiceMapResponse;

// === HTTP DTOs ===

/// Body of `GET /api/service-map`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ServiceMapEnvelope {
    pub data: ServiceMapResponse,
}
