//! Normalization of legacy service-map document exports.
//!
//! Older deployments kept one JSON document per service. Depending on the
//! writer, `endpoints` and `endpointDependencies` were stored either as nested
//! documents keyed by name or as lists of `[key, value]` entries, and the
//! per-endpoint dependency value was either a list of dependency objects or a
//! `{targetService: {targetEndpoint: counters}}` tree. Everything here reduces
//! those shapes to [`LegacyServiceDocument`], which the store writes into its
//! canonical tables.

use serde_json::{Map, Value};
use spanmap_core::{EndpointDependency, EndpointHealth, ServiceStatus, SpanMapError};
use tracing::warn;

use crate::store::StoreError;

/// One legacy service document in canonical form.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyServiceDocument {
    pub source: String,
    pub dependencies: Vec<String>,
    pub last_updated: i64,
    pub last_activity: i64,
    pub status: ServiceStatus,
    pub endpoints: Vec<EndpointHealth>,
    /// `(source endpoint, dependency)` pairs.
    pub endpoint_dependencies: Vec<(String, EndpointDependency)>,
}

/// Result of parsing an export file.
#[derive(Debug, Clone, Default)]
pub struct LegacyExport {
    pub documents: Vec<LegacyServiceDocument>,
    /// Documents or entries dropped for missing or inconsistent fields.
    pub skipped: usize,
}

/// Parses a JSON array of legacy service documents.
pub fn parse_legacy_export(json: &str) -> Result<LegacyExport, StoreError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(StoreError::InvalidLegacy("expected a JSON array of documents".into()));
    };

    let mut export = LegacyExport::default();
    for item in &items {
        match LegacyServiceDocument::from_value(item, &mut export.skipped) {
            Ok(doc) => export.documents.push(doc),
            Err(e) => {
                warn!("Skipping legacy document: {}", e);
                export.skipped += 1;
            }
        }
    }
    Ok(export)
}

impl LegacyServiceDocument {
    /// Normalizes one document; malformed entries are dropped and counted in `skipped`.
    pub fn from_value(value: &Value, skipped: &mut usize) -> Result<Self, SpanMapError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SpanMapError::invalid_record("", "document is not an object"))?;

        let source = obj
            .get("source")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| SpanMapError::invalid_record("", "missing source"))?
            .to_string();

        let dependencies = obj
            .get("dependencies")
            .and_then(Value::as_array)
            .map(|deps| {
                deps.iter()
                    .filter_map(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let mut endpoints = Vec::new();
        for (key, item) in keyed_entries(obj.get("endpoints")) {
            match endpoint_health(item, key) {
                Some(health) => endpoints.push(health),
                None => *skipped += 1,
            }
        }

        let mut endpoint_dependencies = Vec::new();
        for (key, item) in keyed_entries(obj.get("endpointDependencies")) {
            let Some(source_endpoint) = key.filter(|k| !k.is_empty()) else {
                *skipped += 1;
                continue;
            };
            for dep in dependencies_of(item, skipped) {
                endpoint_dependencies.push((source_endpoint.clone(), dep));
            }
        }

        Ok(Self {
            source,
            dependencies,
            last_updated: read_i64(obj.get("lastUpdated")).unwrap_or(0),
            last_activity: read_i64(obj.get("lastActivity")).unwrap_or(0),
            status: obj
                .get("status")
                .and_then(Value::as_str)
                .map(ServiceStatus::from_str)
                .unwrap_or(ServiceStatus::Inactive),
            endpoints,
            endpoint_dependencies,
        })
    }
}

/// Flattens either an object keyed by name or a list of `[key, value]` entries.
/// List items that are not pairs come back without a key.
fn keyed_entries(value: Option<&Value>) -> Vec<(Option<String>, &Value)> {
    match value {
        Some(Value::Object(map)) => map.iter().map(|(k, v)| (Some(k.clone()), v)).collect(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item.as_array().map(Vec::as_slice) {
                Some([Value::String(key), inner]) => (Some(key.clone()), inner),
                _ => (None, item),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn endpoint_health(item: &Value, key: Option<String>) -> Option<EndpointHealth> {
    let obj = item.as_object()?;
    let name = key
        .or_else(|| obj.get("name").and_then(Value::as_str).map(String::from))
        .filter(|n| !n.is_empty())?;
    let (successful, failed) = read_counts(obj)?;
    Some(EndpointHealth {
        name,
        total_requests: successful + failed,
        successful_requests: successful,
        failed_requests: failed,
        last_updated: read_i64(obj.get("lastUpdated")).unwrap_or(0),
    })
}

fn dependencies_of(value: &Value, skipped: &mut usize) -> Vec<EndpointDependency> {
    let mut deps = Vec::new();
    for (key, item) in keyed_entries(Some(value)) {
        let is_flat = item.as_object().is_some_and(|o| o.contains_key("targetService"));
        if is_flat {
            match dependency(item, None, None) {
                Some(dep) => deps.push(dep),
                None => *skipped += 1,
            }
            continue;
        }

        // {targetService: {targetEndpoint: counters}}
        let Some(target_service) = key else {
            *skipped += 1;
            continue;
        };
        for (target_endpoint, counters) in keyed_entries(Some(item)) {
            match dependency(counters, Some(&target_service), target_endpoint) {
                Some(dep) => deps.push(dep),
                None => *skipped += 1,
            }
        }
    }
    deps
}

fn dependency(
    item: &Value,
    target_service: Option<&str>,
    target_endpoint: Option<String>,
) -> Option<EndpointDependency> {
    let obj = item.as_object()?;
    let target_service = obj
        .get("targetService")
        .and_then(Value::as_str)
        .or(target_service)
        .filter(|s| !s.is_empty())?
        .to_string();
    let target_endpoint = obj
        .get("targetEndpoint")
        .and_then(Value::as_str)
        .map(String::from)
        .or(target_endpoint)
        .filter(|s| !s.is_empty())?;
    let (successful, failed) = read_counts(obj)?;
    Some(EndpointDependency {
        target_service,
        target_endpoint,
        total_requests: successful + failed,
        successful_requests: successful,
        failed_requests: failed,
        last_updated: read_i64(obj.get("lastUpdated")).unwrap_or(0),
    })
}

/// `totalRequests` is required and must equal the sum of the split counters.
fn read_counts(obj: &Map<String, Value>) -> Option<(u64, u64)> {
    let total = read_u64(obj.get("totalRequests"))?;
    let successful = read_u64(obj.get("successfulRequests")).unwrap_or(0);
    let failed = read_u64(obj.get("failedRequests")).unwrap_or(0);
    (successful.checked_add(failed)? == total).then_some((successful, failed))
}

/// Reads a plain JSON number or a `{"$numberLong": "..."}` style wrapper.
fn read_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::Object(map) => ["$numberLong", "$numberInt", "$numberDouble"]
            .iter()
            .find_map(|k| map.get(*k))
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<f64>().ok()),
        _ => None,
    }
    .filter(|f| f.is_finite())
}

fn read_u64(value: Option<&Value>) -> Option<u64> {
    if let Some(n) = value.and_then(Value::as_u64) {
        return Some(n);
    }
    read_number(value).filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64)
}

fn read_i64(value: Option<&Value>) -> Option<i64> {
    if let Some(n) = value.and_then(Value::as_i64) {
        return Some(n);
    }
    read_number(value).map(|f| f as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ServiceMapStore;
    use serde_json::json;

    #[test]
    fn test_nested_document_shape() {
        let doc = json!({
            "source": "gateway",
            "dependencies": ["users-api", "postgresql"],
            "lastUpdated": 100,
            "lastActivity": 90,
            "status": "running",
            "endpoints": {
                "GET /users": {
                    "name": "GET /users",
                    "totalRequests": 3,
                    "successfulRequests": 2,
                    "failedRequests": 1,
                    "lastUpdated": 80
                }
            },
            "endpointDependencies": {
                "GET /users": {
                    "users-api": {
                        "/users": { "totalRequests": 2, "successfulRequests": 2, "lastUpdated": 70 }
                    },
                    "postgresql": {
                        "SELECT": { "totalRequests": 1, "failedRequests": 1 }
                    }
                }
            }
        });

        let mut skipped = 0;
        let parsed = LegacyServiceDocument::from_value(&doc, &mut skipped).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(parsed.source, "gateway");
        assert_eq!(parsed.status, ServiceStatus::Running);
        assert_eq!(parsed.dependencies, vec!["users-api", "postgresql"]);
        assert_eq!(parsed.endpoints.len(), 1);
        assert_eq!(parsed.endpoints[0].total_requests, 3);
        assert_eq!(parsed.endpoint_dependencies.len(), 2);

        let (source_endpoint, users) = parsed
            .endpoint_dependencies
            .iter()
            .find(|(_, d)| d.target_service == "users-api")
            .unwrap();
        assert_eq!(source_endpoint, "GET /users");
        assert_eq!(users.target_endpoint, "/users");
        assert_eq!(users.successful_requests, 2);
    }

    #[test]
    fn test_entry_list_shape() {
        let doc = json!({
            "source": "worker",
            "lastActivity": { "$numberLong": "1700000000000" },
            "endpoints": [
                ["consume", { "totalRequests": 4, "successfulRequests": 4, "failedRequests": 0 }]
            ],
            "endpointDependencies": [
                ["consume", [
                    { "targetService": "orders", "targetEndpoint": "publish",
                      "totalRequests": 4, "successfulRequests": 3, "failedRequests": 1 }
                ]]
            ]
        });

        let mut skipped = 0;
        let parsed = LegacyServiceDocument::from_value(&doc, &mut skipped).unwrap();
        assert_eq!(skipped, 0);
        assert_eq!(parsed.last_activity, 1_700_000_000_000);
        assert_eq!(parsed.status, ServiceStatus::Inactive);
        assert_eq!(parsed.endpoints[0].name, "consume");
        let (source_endpoint, dep) = &parsed.endpoint_dependencies[0];
        assert_eq!(source_endpoint, "consume");
        assert_eq!(dep.target_service, "orders");
        assert_eq!(dep.failed_requests, 1);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let doc = json!({
            "source": "svc",
            "endpoints": {
                "ok": { "totalRequests": 1, "successfulRequests": 1 },
                "no-total": { "successfulRequests": 1 },
                "inconsistent": { "totalRequests": 5, "successfulRequests": 1, "failedRequests": 1 },
                "not-an-object": 7
            },
            "endpointDependencies": {
                "ok": [
                    { "targetService": "", "targetEndpoint": "x", "totalRequests": 1, "successfulRequests": 1 },
                    { "targetService": "db", "totalRequests": 1, "successfulRequests": 1 }
                ]
            }
        });

        let mut skipped = 0;
        let parsed = LegacyServiceDocument::from_value(&doc, &mut skipped).unwrap();
        assert_eq!(parsed.endpoints.len(), 1);
        assert_eq!(parsed.endpoints[0].name, "ok");
        assert!(parsed.endpoint_dependencies.is_empty());
        assert_eq!(skipped, 5);
    }

    #[test]
    fn test_document_without_source_is_rejected() {
        let export = parse_legacy_export(r#"[{ "dependencies": ["a"] }, { "source": "b" }, 3]"#).unwrap();
        assert_eq!(export.documents.len(), 1);
        assert_eq!(export.documents[0].source, "b");
        assert_eq!(export.skipped, 2);
    }

    #[test]
    fn test_export_must_be_array() {
        let err = parse_legacy_export(r#"{ "source": "a" }"#).unwrap_err();
        assert!(matches!(err, StoreError::InvalidLegacy(_)));
    }

    #[test]
    fn test_import_runs_once() {
        let export = parse_legacy_export(
            r#"[{
                "source": "gateway",
                "dependencies": ["users-api"],
                "lastActivity": 500,
                "status": "running",
                "endpoints": { "GET /users": { "totalRequests": 2, "successfulRequests": 1, "failedRequests": 1 } },
                "endpointDependencies": { "GET /users": { "users-api": { "/users": { "totalRequests": 2, "successfulRequests": 2 } } } }
            }]"#,
        )
        .unwrap();

        let store = ServiceMapStore::in_memory().unwrap();
        let summary = store.import_legacy("export.json", &export.documents).unwrap().unwrap();
        assert_eq!(summary.services, 1);
        assert_eq!(summary.endpoints, 1);
        assert_eq!(summary.endpoint_dependencies, 1);
        assert!(store.import_legacy("export.json", &export.documents).unwrap().is_none());

        let node = store.load_service_node("gateway").unwrap().unwrap();
        assert_eq!(node.status, ServiceStatus::Running);
        assert_eq!(node.last_activity, 500);
        assert!(node.dependencies.contains("users-api"));
        assert_eq!(node.endpoints["GET /users"].total_requests, 2);
        assert_eq!(node.endpoint_dependencies["GET /users"][0].successful_requests, 2);
    }
}
