//! Archives OTLP metrics exports without interpreting them.

use std::sync::Arc;

use spanmap_store::{now_ms, ServiceMapStore};
use tracing::info;

use crate::otlp::decode_metrics_request;
use crate::EngineError;

pub struct MetricsArchive {
    store: Arc<ServiceMapStore>,
}

impl MetricsArchive {
    pub fn new(store: Arc<ServiceMapStore>) -> Self {
        Self { store }
    }

    /// Validates `payload` as a metrics export and stores the raw bytes.
    ///
    /// Returns the number of resources in the export.
    pub async fn accept(&self, payload: Vec<u8>) -> Result<usize, EngineError> {
        let resources = decode_metrics_request(&payload)?.resource_metrics.len();
        if resources == 0 {
            return Ok(0);
        }

        let store = Arc::clone(&self.store);
        let id = tokio::task::spawn_blocking(move || {
            store.insert_metrics_payload(&payload, resources, now_ms())
        })
        .await??;

        info!(id, resources, "Archived metrics export");
        Ok(resources)
    }
}
