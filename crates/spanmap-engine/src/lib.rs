//! Dependency extraction and aggregation engine for spanmap.
//!
//! The write path runs [`normalizer`] → [`classifier`] → [`Aggregator`] for
//! every resource of a trace batch; the read path is the [`Materializer`].
//! [`Broadcaster`] pushes snapshots and per-batch deltas to subscribers.

pub mod aggregator;
pub mod broadcaster;
pub mod classifier;
pub mod materializer;
pub mod metrics;
pub mod normalizer;
pub mod otlp;

#[cfg(test)]
pub(crate) mod test_support;

pub use aggregator::{Aggregator, BatchOutcome, IngestReport, UpdateSink};
pub use broadcaster::{Broadcaster, Subscription};
pub use classifier::{classify, ClassifiedDependency, DependencyRule};
pub use materializer::Materializer;
pub use metrics::MetricsArchive;
pub use normalizer::{normalize_resource_spans, normalize_span, NormalizedResource};

use spanmap_store::StoreError;
use thiserror::Error;

/// Errors from the ingestion and rendering paths.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Payload bytes are not a valid OTLP protobuf message.
    #[error("Failed to decode payload: {0}")]
    Decode(#[from] prost::DecodeError),

    /// A storage round-trip failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
