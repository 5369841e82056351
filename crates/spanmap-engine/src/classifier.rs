//! Infers the downstream dependency a span represents.
//!
//! Rules are tried in priority order and the first one that produces a
//! target service decides the outcome, even when that target is later
//! rejected. Span-name matching is case-insensitive.

use spanmap_core::NormalizedSpan;
use tracing::debug;

/// The rule that produced a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyRule {
    /// `peer.service` names the callee.
    Peer,
    /// Name contains `db`, or `db.system`/`db.name` is set.
    Database,
    /// Name contains `cache`, or `cache.type` is set.
    Cache,
    /// Name contains `api`, or `http.route`/`rpc.service` is set.
    Api,
    /// Name contains `queue`, or `messaging.system` is set.
    Messaging,
}

impl DependencyRule {
    /// Every rule, highest priority first.
    pub const ALL: [DependencyRule; 5] = [
        DependencyRule::Peer,
        DependencyRule::Database,
        DependencyRule::Cache,
        DependencyRule::Api,
        DependencyRule::Messaging,
    ];

    fn resolve(self, span: &NormalizedSpan, lower_name: &str) -> Option<ClassifiedDependency> {
        let (target_service, target_endpoint) = match self {
            DependencyRule::Peer => {
                let peer = non_empty(span, "peer.service")?;
                (peer, non_empty(span, "peer.endpoint").unwrap_or(&span.name))
            }
            DependencyRule::Database => {
                if !(lower_name.contains("db")
                    || span.has_attribute("db.system")
                    || span.has_attribute("db.name"))
                {
                    return None;
                }
                (
                    non_empty(span, "db.system").unwrap_or("database"),
                    non_empty(span, "db.operation").unwrap_or("query"),
                )
            }
            DependencyRule::Cache => {
                if !(lower_name.contains("cache") || span.has_attribute("cache.type")) {
                    return None;
                }
                (
                    non_empty(span, "cache.type").unwrap_or("cache"),
                    non_empty(span, "cache.operation").unwrap_or("get/set"),
                )
            }
            DependencyRule::Api => {
                if !(lower_name.contains("api")
                    || span.has_attribute("http.route")
                    || span.has_attribute("rpc.service"))
                {
                    return None;
                }
                let service = non_empty(span, "http.host")
                    .or_else(|| non_empty(span, "http.address"))
                    .unwrap_or("api");
                if service == "api" {
                    debug!(span = %span.name, "API call without host attributes");
                }
                (service, non_empty(span, "http.route").unwrap_or(&span.name))
            }
            DependencyRule::Messaging => {
                if !(lower_name.contains("queue") || span.has_attribute("messaging.system")) {
                    return None;
                }
                (
                    non_empty(span, "messaging.destination").unwrap_or("message_queue"),
                    non_empty(span, "messaging.operation").unwrap_or("publish/subscribe"),
                )
            }
        };

        Some(ClassifiedDependency {
            target_service: target_service.to_string(),
            target_endpoint: target_endpoint.to_string(),
            rule: self,
        })
    }
}

/// A dependency edge inferred from a single span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedDependency {
    pub target_service: String,
    pub target_endpoint: String,
    pub rule: DependencyRule,
}

/// Returns the dependency `span` calls into, if any.
///
/// A winning target containing `:` (a host:port address rather than a
/// service name) produces no edge.
pub fn classify(span: &NormalizedSpan) -> Option<ClassifiedDependency> {
    let lower_name = span.name.to_lowercase();
    let dependency = DependencyRule::ALL
        .iter()
        .find_map(|rule| rule.resolve(span, &lower_name))?;

    if dependency.target_service.contains(':') {
        debug!(
            target_service = %dependency.target_service,
            span = %span.name,
            "Discarding address-like dependency target"
        );
        return None;
    }
    Some(dependency)
}

fn non_empty<'a>(span: &'a NormalizedSpan, key: &str) -> Option<&'a str> {
    span.attribute_str(key).filter(|value| !value.is_empty())
}
