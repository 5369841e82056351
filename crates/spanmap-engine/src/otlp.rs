//! OTLP/HTTP protobuf payload codecs.

use opentelemetry_proto::tonic::collector::metrics::v1::{
    ExportMetricsServiceRequest, ExportMetricsServiceResponse,
};
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use prost::Message;

use crate::EngineError;

/// Content type of OTLP/HTTP protobuf bodies.
pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-protobuf";

/// Decodes a trace export body. An empty body is an empty request.
pub fn decode_trace_request(body: &[u8]) -> Result<ExportTraceServiceRequest, EngineError> {
    Ok(ExportTraceServiceRequest::decode(body)?)
}

pub fn decode_metrics_request(body: &[u8]) -> Result<ExportMetricsServiceRequest, EngineError> {
    Ok(ExportMetricsServiceRequest::decode(body)?)
}

/// Encoded full-success acknowledgment for a trace export.
pub fn trace_ack() -> Vec<u8> {
    ExportTraceServiceResponse { partial_success: None }.encode_to_vec()
}

/// Encoded full-success acknowledgment for a metrics export.
pub fn metrics_ack() -> Vec<u8> {
    ExportMetricsServiceResponse { partial_success: None }.encode_to_vec()
}
