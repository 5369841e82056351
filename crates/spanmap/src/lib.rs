//! Live service-dependency map built from OpenTelemetry traces.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use spanmap::prelude::*;
//!
//! # async fn run() -> Result<(), EngineError> {
//! let store = Arc::new(ServiceMapStore::in_memory()?);
//! let aggregator = Aggregator::new(Arc::clone(&store));
//! let materializer = Materializer::new(store, Duration::from_secs(300));
//!
//! aggregator.ingest(&Default::default()).await;
//! let graph = materializer.render_graph().await?;
//! assert!(graph.services.is_empty());
//! # Ok(())
//! # }
//! ```

pub use spanmap_config as config;
pub use spanmap_core as model;
pub use spanmap_engine as engine;
pub use spanmap_store as store;

pub mod prelude {
    pub use spanmap_config::{ConfigError, ServerConfig};
    pub use spanmap_core::{
        AttributeValue, NormalizedSpan, ServiceMapDelta, ServiceMapResponse, ServiceStatus,
        SpanMapError, UpdateFrame,
    };
    pub use spanmap_engine::{
        classify, normalize_resource_spans, Aggregator, Broadcaster, EngineError, IngestReport,
        Materializer, MetricsArchive, UpdateSink,
    };
    pub use spanmap_store::{ServiceMapStore, StoreError};
}
