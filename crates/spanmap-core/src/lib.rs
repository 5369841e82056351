//! Core domain types and error definitions for spanmap.
//!
//! This crate provides the types shared across the spanmap workspace:
//!
//! - [`NormalizedSpan`] and [`AttributeValue`]: flattened trace spans
//! - [`ServiceNode`], [`EndpointHealth`], [`EndpointDependency`]: persisted graph state
//! - [`ServiceMapResponse`] and [`UpdateFrame`]: the rendered graph and real-time frames
//! - [`SpanMapError`]: domain validation errors
//!
//! # Example
//!
//! ```rust
//! use spanmap_core::{availability, ServiceStatus};
//!
//! assert_eq!(availability(0, 0), 100.0);
//! assert_eq!(availability(3, 4), 75.0);
//! assert_eq!(ServiceStatus::from_str("running"), ServiceStatus::Running);
//! ```

mod graph;
mod span;
mod view;

pub use graph::{EndpointDependency, EndpointHealth, ServiceMapDelta, ServiceNode, ServiceStatus};
pub use span::{AttributeValue, NormalizedSpan, UNKNOWN_SERVICE};
pub use view::{
    DependencyView, EndpointView, Relationship, ServiceMapResponse, ServiceView, UpdateFrame,
};

use thiserror::Error;

/// Errors raised when a span or a stored record fails domain validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpanMapError {
    /// A span cannot be aggregated.
    #[error("malformed span {span_id}: {reason}")]
    MalformedSpan { span_id: String, reason: String },

    /// A stored service record is inconsistent and cannot be rendered.
    #[error("invalid service record '{source_name}': {reason}")]
    InvalidRecord { source_name: String, reason: String },
}

impl SpanMapError {
    pub fn malformed_span(span_id: impl Into<String>, reason: impl Into<String>) -> Self {
        SpanMapError::MalformedSpan { span_id: span_id.into(), reason: reason.into() }
    }

    pub fn invalid_record(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        SpanMapError::InvalidRecord { source_name: source_name.into(), reason: reason.into() }
    }
}

/// Percentage of successful requests, `100.0` when nothing was observed.
pub fn availability(successful_requests: u64, total_requests: u64) -> f64 {
    if total_requests == 0 {
        return 100.0;
    }
    successful_requests as f64 / total_requests as f64 * 100.0
}
