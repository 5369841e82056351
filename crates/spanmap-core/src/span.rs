//! Normalized span representation.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Service name used when a resource carries no `service.name`.
pub const UNKNOWN_SERVICE: &str = "unknown";

/// A typed span or resource attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    Bool(bool),
    Int(i64),
    Double(f64),
    Bytes(Vec<u8>),
    Array(Vec<AttributeValue>),
    KeyValueList(BTreeMap<String, AttributeValue>),
}

impl AttributeValue {
    /// Returns the string payload, if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::String(value)
    }
}

/// A span flattened out of its resource and scope grouping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSpan {
    /// Lowercase hex trace identifier.
    pub trace_id: String,
    /// Lowercase hex span identifier.
    pub span_id: String,
    /// Lowercase hex parent identifier, `None` for root spans.
    pub parent_span_id: Option<String>,
    pub name: String,
    pub attributes: HashMap<String, AttributeValue>,
    pub status_is_error: bool,
    /// Service name resolved from the owning resource.
    pub service_name: String,
}

impl NormalizedSpan {
    /// Creates a span with empty identifiers and no attributes.
    pub fn new(service_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            trace_id: String::new(),
            span_id: String::new(),
            parent_span_id: None,
            name: name.into(),
            attributes: HashMap::new(),
            status_is_error: false,
            service_name: service_name.into(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_error(mut self, status_is_error: bool) -> Self {
        self.status_is_error = status_is_error;
        self
    }

    /// True when the attribute key is present, whatever its type.
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// String value of an attribute; non-string values read as absent.
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(AttributeValue::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup() {
        let span = NormalizedSpan::new("svc", "GET /")
            .with_attribute("http.route", "/")
            .with_attribute("retries", AttributeValue::Int(3));

        assert_eq!(span.attribute_str("http.route"), Some("/"));
        assert!(span.has_attribute("retries"));
        assert_eq!(span.attribute_str("retries"), None);
        assert_eq!(span.attribute_str("missing"), None);
    }

    #[test]
    fn test_serializes_camel_case() {
        let span = NormalizedSpan::new("svc", "op").with_error(true);
        let json = serde_json::to_value(&span).unwrap();
        assert_eq!(json["statusIsError"], true);
        assert_eq!(json["serviceName"], "svc");
        assert!(json["parentSpanId"].is_null());
    }
}
