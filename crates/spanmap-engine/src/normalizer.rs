//! Flattens OTLP resource spans into [`NormalizedSpan`]s.

use std::collections::{BTreeMap, HashMap};

use opentelemetry_proto::tonic::common::v1::{any_value, AnyValue, KeyValue};
use opentelemetry_proto::tonic::trace::v1::{ResourceSpans, Span};
use spanmap_core::{AttributeValue, NormalizedSpan, UNKNOWN_SERVICE};

/// Resource attribute naming the emitting service.
pub const SERVICE_NAME_KEY: &str = "service.name";

/// OTLP `STATUS_CODE_ERROR`.
const STATUS_CODE_ERROR: i32 = 2;

/// All spans of one resource, attributed to its service.
#[derive(Debug, Clone)]
pub struct NormalizedResource {
    pub service_name: String,
    pub spans: Vec<NormalizedSpan>,
}

/// Normalizes every span of every scope under `resource_spans`.
///
/// A resource without a string `service.name` is attributed to `"unknown"`.
pub fn normalize_resource_spans(resource_spans: &ResourceSpans) -> NormalizedResource {
    let service_name = resource_spans
        .resource
        .as_ref()
        .and_then(|resource| string_attribute(&resource.attributes, SERVICE_NAME_KEY))
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_SERVICE)
        .to_string();

    let spans = resource_spans
        .scope_spans
        .iter()
        .flat_map(|scope| scope.spans.iter())
        .map(|span| normalize_span(span, &service_name))
        .collect();

    NormalizedResource { service_name, spans }
}

pub fn normalize_span(span: &Span, service_name: &str) -> NormalizedSpan {
    NormalizedSpan {
        trace_id: hex::encode(&span.trace_id),
        span_id: hex::encode(&span.span_id),
        parent_span_id: (!span.parent_span_id.is_empty()).then(|| hex::encode(&span.parent_span_id)),
        name: span.name.clone(),
        attributes: convert_attributes(&span.attributes),
        status_is_error: span.status.as_ref().is_some_and(|status| status.code == STATUS_CODE_ERROR),
        service_name: service_name.to_string(),
    }
}

fn string_attribute<'a>(attributes: &'a [KeyValue], key: &str) -> Option<&'a str> {
    // last occurrence wins, matching convert_attributes
    attributes
        .iter()
        .rev()
        .find(|kv| kv.key == key)
        .and_then(|kv| kv.value.as_ref())
        .and_then(|value| match &value.value {
            Some(any_value::Value::StringValue(s)) => Some(s.as_str()),
            _ => None,
        })
}

fn convert_attributes(attributes: &[KeyValue]) -> HashMap<String, AttributeValue> {
    attributes
        .iter()
        .map(|kv| (kv.key.clone(), convert_optional(kv.value.as_ref())))
        .collect()
}

fn convert_optional(value: Option<&AnyValue>) -> AttributeValue {
    value
        .map(convert_value)
        .unwrap_or_else(|| AttributeValue::String(String::new()))
}

fn convert_value(value: &AnyValue) -> AttributeValue {
    match &value.value {
        Some(any_value::Value::StringValue(s)) => AttributeValue::String(s.clone()),
        Some(any_value::Value::BoolValue(b)) => AttributeValue::Bool(*b),
        Some(any_value::Value::IntValue(i)) => AttributeValue::Int(*i),
        Some(any_value::Value::DoubleValue(d)) => AttributeValue::Double(*d),
        Some(any_value::Value::BytesValue(bytes)) => AttributeValue::Bytes(bytes.clone()),
        Some(any_value::Value::ArrayValue(array)) => {
            AttributeValue::Array(array.values.iter().map(convert_value).collect())
        }
        Some(any_value::Value::KvlistValue(list)) => AttributeValue::KeyValueList(
            list.values
                .iter()
                .map(|kv| (kv.key.clone(), convert_optional(kv.value.as_ref())))
                .collect::<BTreeMap<_, _>>(),
        ),
        None => AttributeValue::String(String::new()),
    }
}
