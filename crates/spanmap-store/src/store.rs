//! SQLite-backed service graph storage.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};
use spanmap_core::{EndpointDependency, EndpointHealth, ServiceNode, ServiceStatus};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::legacy::LegacyServiceDocument;
use crate::{now_ms, CounterDelta};

/// Errors from service map store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Lock error")]
    Lock,
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid legacy export: {0}")]
    InvalidLegacy(String),
}

/// Counts written by a legacy import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub services: usize,
    pub endpoints: usize,
    pub endpoint_dependencies: usize,
}

/// SQLite-backed service graph storage.
///
/// One row per service in `service_nodes`; endpoint health, endpoint
/// dependencies and adjacency live in child tables keyed by the same paths
/// the counters are addressed by.
pub struct ServiceMapStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS service_nodes (
        source TEXT PRIMARY KEY,
        last_updated INTEGER NOT NULL DEFAULT 0,
        last_activity INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'inactive'
    );

    CREATE TABLE IF NOT EXISTS service_dependencies (
        source TEXT NOT NULL,
        target TEXT NOT NULL,
        PRIMARY KEY (source, target)
    );

    CREATE TABLE IF NOT EXISTS endpoints (
        source TEXT NOT NULL,
        name TEXT NOT NULL,
        total_requests INTEGER NOT NULL DEFAULT 0,
        successful_requests INTEGER NOT NULL DEFAULT 0,
        failed_requests INTEGER NOT NULL DEFAULT 0,
        last_updated INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (source, name)
    );

    CREATE TABLE IF NOT EXISTS endpoint_dependencies (
        source TEXT NOT NULL,
        source_endpoint TEXT NOT NULL,
        target_service TEXT NOT NULL,
        target_endpoint TEXT NOT NULL,
        total_requests INTEGER NOT NULL DEFAULT 0,
        successful_requests INTEGER NOT NULL DEFAULT 0,
        failed_requests INTEGER NOT NULL DEFAULT 0,
        last_updated INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (source, source_endpoint, target_service, target_endpoint)
    );

    CREATE TABLE IF NOT EXISTS metrics_payloads (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        received_at INTEGER NOT NULL,
        resource_count INTEGER NOT NULL,
        payload BLOB NOT NULL
    );

    CREATE TABLE IF NOT EXISTS legacy_imports (
        name TEXT PRIMARY KEY,
        imported_at INTEGER NOT NULL,
        documents INTEGER NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_service_nodes_activity ON service_nodes(last_activity);
    CREATE INDEX IF NOT EXISTS idx_metrics_received ON metrics_payloads(received_at DESC);
"#;

const ENSURE_NODE_SQL: &str =
    "INSERT INTO service_nodes (source) VALUES (?1) ON CONFLICT(source) DO NOTHING";

const INCREMENT_ENDPOINT_SQL: &str = r#"
    INSERT INTO endpoints
        (source, name, total_requests, successful_requests, failed_requests, last_updated)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT(source, name) DO UPDATE SET
        total_requests = total_requests + excluded.total_requests,
        successful_requests = successful_requests + excluded.successful_requests,
        failed_requests = failed_requests + excluded.failed_requests,
        last_updated = MAX(last_updated, excluded.last_updated)
"#;

const INCREMENT_DEPENDENCY_SQL: &str = r#"
    INSERT INTO endpoint_dependencies
        (source, source_endpoint, target_service, target_endpoint,
         total_requests, successful_requests, failed_requests, last_updated)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
    ON CONFLICT(source, source_endpoint, target_service, target_endpoint) DO UPDATE SET
        total_requests = total_requests + excluded.total_requests,
        successful_requests = successful_requests + excluded.successful_requests,
        failed_requests = failed_requests + excluded.failed_requests,
        last_updated = MAX(last_updated, excluded.last_updated)
"#;

const TOUCH_NODE_SQL: &str = r#"
    INSERT INTO service_nodes (source, last_updated, last_activity, status)
    VALUES (?1, ?2, ?2, 'running')
    ON CONFLICT(source) DO UPDATE SET
        last_updated = MAX(last_updated, excluded.last_updated),
        last_activity = MAX(last_activity, excluded.last_activity),
        status = 'running'
"#;

const RESTORE_NODE_SQL: &str = r#"
    INSERT INTO service_nodes (source, last_updated, last_activity, status)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT(source) DO UPDATE SET
        last_updated = MAX(last_updated, excluded.last_updated),
        last_activity = MAX(last_activity, excluded.last_activity),
        status = CASE WHEN excluded.last_activity > last_activity
                      THEN excluded.status ELSE status END
"#;

const ADD_DEPENDENCY_SQL: &str =
    "INSERT OR IGNORE INTO service_dependencies (source, target) VALUES (?1, ?2)";

impl ServiceMapStore {
    /// Opens (or creates) the store at the given database path.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        info!("Service map store initialized at {}", path.display());
        Ok(store)
    }

    /// Creates an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Lock)
    }

    fn init_schema(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Adds `delta` to `endpoints.<endpoint>` of `source`, creating the node
    /// and the endpoint on first write.
    pub fn increment_endpoint(
        &self,
        source: &str,
        endpoint: &str,
        delta: CounterDelta,
        now: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        increment_endpoint(&tx, source, endpoint, delta, now)?;
        tx.commit()?;
        Ok(())
    }

    /// Adds `delta` to
    /// `endpointDependencies.<source_endpoint>.<target_service>.<target_endpoint>`.
    pub fn increment_dependency(
        &self,
        source: &str,
        source_endpoint: &str,
        target_service: &str,
        target_endpoint: &str,
        delta: CounterDelta,
        now: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        increment_dependency(&tx, source, source_endpoint, target_service, target_endpoint, delta, now)?;
        tx.commit()?;
        Ok(())
    }

    /// Marks `source` running at `now` and unions `targets` into its dependency set.
    pub fn upsert_adjacency(
        &self,
        source: &str,
        targets: &BTreeSet<String>,
        now: i64,
    ) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(TOUCH_NODE_SQL, params![source, now])?;
        for target in targets {
            tx.execute(ADD_DEPENDENCY_SQL, params![source, target])?;
        }
        tx.commit()?;
        debug!(source, targets = targets.len(), "Upserted service adjacency");
        Ok(())
    }

    /// Moves a running node to inactive if its last activity is before `cutoff`.
    ///
    /// Returns whether a transition happened. A node touched by a concurrent
    /// write after the caller read it is left alone.
    pub fn mark_inactive_if_stale(&self, source: &str, cutoff: i64) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let changed = conn.execute(
            r#"UPDATE service_nodes SET status = 'inactive'
               WHERE source = ?1 AND status = 'running' AND last_activity < ?2"#,
            params![source, cutoff],
        )?;
        Ok(changed > 0)
    }

    /// Loads every stored service node.
    pub fn load_service_nodes(&self) -> Result<Vec<ServiceNode>, StoreError> {
        let conn = self.lock()?;
        let nodes = load_nodes(&conn, None)?;
        Ok(nodes.into_values().collect())
    }

    /// Loads a single node by source name.
    pub fn load_service_node(&self, source: &str) -> Result<Option<ServiceNode>, StoreError> {
        let conn = self.lock()?;
        let mut nodes = load_nodes(&conn, Some(source))?;
        Ok(nodes.remove(source))
    }

    /// Stores a raw metrics export payload.
    pub fn insert_metrics_payload(
        &self,
        payload: &[u8],
        resource_count: usize,
        received_at: i64,
    ) -> Result<i64, StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO metrics_payloads (received_at, resource_count, payload) VALUES (?1, ?2, ?3)",
            params![received_at, resource_count as i64, payload],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn metrics_payload_count(&self) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM metrics_payloads", [], |r| r.get(0))?;
        Ok(count as u64)
    }

    /// Writes legacy documents into the canonical tables, once per `name`.
    ///
    /// Returns `None` when an import with this name already ran.
    pub fn import_legacy(
        &self,
        name: &str,
        documents: &[LegacyServiceDocument],
    ) -> Result<Option<ImportSummary>, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let previous: Option<i64> = tx
            .query_row(
                "SELECT imported_at FROM legacy_imports WHERE name = ?1",
                params![name],
                |r| r.get(0),
            )
            .optional()?;
        if previous.is_some() {
            info!("Legacy import {} already applied, skipping", name);
            return Ok(None);
        }

        let mut summary = ImportSummary::default();
        for doc in documents {
            tx.execute(
                RESTORE_NODE_SQL,
                params![doc.source, doc.last_updated, doc.last_activity, doc.status.as_str()],
            )?;
            for target in &doc.dependencies {
                tx.execute(ADD_DEPENDENCY_SQL, params![doc.source, target])?;
            }
            for health in &doc.endpoints {
                let delta = CounterDelta::from_counts(health.successful_requests, health.failed_requests);
                increment_endpoint(&tx, &doc.source, &health.name, delta, health.last_updated)?;
                summary.endpoints += 1;
            }
            for (source_endpoint, dep) in &doc.endpoint_dependencies {
                let delta = CounterDelta::from_counts(dep.successful_requests, dep.failed_requests);
                increment_dependency(
                    &tx,
                    &doc.source,
                    source_endpoint,
                    &dep.target_service,
                    &dep.target_endpoint,
                    delta,
                    dep.last_updated,
                )?;
                summary.endpoint_dependencies += 1;
            }
            summary.services += 1;
        }

        tx.execute(
            "INSERT INTO legacy_imports (name, imported_at, documents) VALUES (?1, ?2, ?3)",
            params![name, now_ms(), documents.len() as i64],
        )?;
        tx.commit()?;

        info!(
            "Imported legacy export {}: {} services, {} endpoints, {} endpoint dependencies",
            name, summary.services, summary.endpoints, summary.endpoint_dependencies
        );
        Ok(Some(summary))
    }
}

fn increment_endpoint(
    conn: &Connection,
    source: &str,
    endpoint: &str,
    delta: CounterDelta,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(ENSURE_NODE_SQL, params![source])?;
    conn.execute(
        INCREMENT_ENDPOINT_SQL,
        params![
            source,
            endpoint,
            delta.total as i64,
            delta.successful as i64,
            delta.failed as i64,
            now,
        ],
    )?;
    Ok(())
}

fn increment_dependency(
    conn: &Connection,
    source: &str,
    source_endpoint: &str,
    target_service: &str,
    target_endpoint: &str,
    delta: CounterDelta,
    now: i64,
) -> Result<(), StoreError> {
    conn.execute(ENSURE_NODE_SQL, params![source])?;
    conn.execute(
        INCREMENT_DEPENDENCY_SQL,
        params![
            source,
            source_endpoint,
            target_service,
            target_endpoint,
            delta.total as i64,
            delta.successful as i64,
            delta.failed as i64,
            now,
        ],
    )?;
    Ok(())
}

/// Assembles nodes from the child tables; `filter` restricts to one source.
///
/// Rows that fail to decode are logged and skipped.
fn load_nodes(
    conn: &Connection,
    filter: Option<&str>,
) -> Result<BTreeMap<String, ServiceNode>, StoreError> {
    let mut nodes: BTreeMap<String, ServiceNode> = BTreeMap::new();

    let mut stmt = conn.prepare(
        r#"SELECT source, last_updated, last_activity, status
           FROM service_nodes WHERE (?1 IS NULL OR source = ?1) ORDER BY source"#,
    )?;
    let rows = stmt.query_map(params![filter], |row| {
        Ok(ServiceNode {
            source: row.get(0)?,
            dependencies: BTreeSet::new(),
            endpoints: BTreeMap::new(),
            endpoint_dependencies: BTreeMap::new(),
            last_updated: row.get(1)?,
            last_activity: row.get(2)?,
            status: ServiceStatus::from_str(&row.get::<_, String>(3)?),
        })
    })?;
    for row in rows {
        match row {
            Ok(node) => {
                nodes.insert(node.source.clone(), node);
            }
            Err(e) => warn!("Skipping undecodable service node row: {}", e),
        }
    }

    let mut stmt = conn.prepare(
        r#"SELECT source, target FROM service_dependencies
           WHERE (?1 IS NULL OR source = ?1) ORDER BY source, target"#,
    )?;
    let rows = stmt.query_map(params![filter], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
    })?;
    for row in rows {
        match row {
            Ok((source, target)) => {
                if let Some(node) = nodes.get_mut(&source) {
                    node.dependencies.insert(target);
                }
            }
            Err(e) => warn!("Skipping undecodable dependency row: {}", e),
        }
    }

    let mut stmt = conn.prepare(
        r#"SELECT source, name, total_requests, successful_requests, failed_requests, last_updated
           FROM endpoints WHERE (?1 IS NULL OR source = ?1) ORDER BY source, name"#,
    )?;
    let rows = stmt.query_map(params![filter], |row| {
        let source: String = row.get(0)?;
        let health = EndpointHealth {
            name: row.get(1)?,
            total_requests: row.get(2)?,
            successful_requests: row.get(3)?,
            failed_requests: row.get(4)?,
            last_updated: row.get(5)?,
        };
        Ok((source, health))
    })?;
    for row in rows {
        match row {
            Ok((source, health)) => {
                if let Some(node) = nodes.get_mut(&source) {
                    node.endpoints.insert(health.name.clone(), health);
                }
            }
            Err(e) => warn!("Skipping undecodable endpoint row: {}", e),
        }
    }

    let mut stmt = conn.prepare(
        r#"SELECT source, source_endpoint, target_service, target_endpoint,
                  total_requests, successful_requests, failed_requests, last_updated
           FROM endpoint_dependencies WHERE (?1 IS NULL OR source = ?1)
           ORDER BY source, source_endpoint, target_service, target_endpoint"#,
    )?;
    let rows = stmt.query_map(params![filter], |row| {
        let source: String = row.get(0)?;
        let source_endpoint: String = row.get(1)?;
        let dep = EndpointDependency {
            target_service: row.get(2)?,
            target_endpoint: row.get(3)?,
            total_requests: row.get(4)?,
            successful_requests: row.get(5)?,
            failed_requests: row.get(6)?,
            last_updated: row.get(7)?,
        };
        Ok((source, source_endpoint, dep))
    })?;
    for row in rows {
        match row {
            Ok((source, source_endpoint, dep)) => {
                if let Some(node) = nodes.get_mut(&source) {
                    node.endpoint_dependencies.entry(source_endpoint).or_default().push(dep);
                }
            }
            Err(e) => warn!("Skipping undecodable endpoint dependency row: {}", e),
        }
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn targets(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_endpoint_increment_creates_node() {
        let store = ServiceMapStore::in_memory().unwrap();

        store.increment_endpoint("gateway", "GET /users", CounterDelta::single(false), 10).unwrap();
        store.increment_endpoint("gateway", "GET /users", CounterDelta::single(true), 20).unwrap();

        let node = store.load_service_node("gateway").unwrap().unwrap();
        assert_eq!(node.status, ServiceStatus::Inactive);
        assert_eq!(node.last_activity, 0);

        let health = &node.endpoints["GET /users"];
        assert_eq!(health.total_requests, 2);
        assert_eq!(health.successful_requests, 1);
        assert_eq!(health.failed_requests, 1);
        assert_eq!(health.last_updated, 20);
    }

    #[test]
    fn test_last_updated_never_moves_backwards() {
        let store = ServiceMapStore::in_memory().unwrap();
        store.increment_endpoint("svc", "op", CounterDelta::single(false), 50).unwrap();
        store.increment_endpoint("svc", "op", CounterDelta::single(false), 40).unwrap();

        let node = store.load_service_node("svc").unwrap().unwrap();
        assert_eq!(node.endpoints["op"].last_updated, 50);
    }

    #[test]
    fn test_dependency_increment() {
        let store = ServiceMapStore::in_memory().unwrap();
        store
            .increment_dependency("gateway", "GET /users", "users-api", "/users", CounterDelta::single(false), 5)
            .unwrap();
        store
            .increment_dependency("gateway", "GET /users", "users-api", "/users", CounterDelta::single(true), 6)
            .unwrap();
        store
            .increment_dependency("gateway", "GET /users", "redis", "get/set", CounterDelta::single(false), 7)
            .unwrap();

        let node = store.load_service_node("gateway").unwrap().unwrap();
        let deps = &node.endpoint_dependencies["GET /users"];
        assert_eq!(deps.len(), 2);

        let users = deps.iter().find(|d| d.target_service == "users-api").unwrap();
        assert_eq!(users.target_endpoint, "/users");
        assert_eq!(users.total_requests, 2);
        assert_eq!(users.successful_requests, 1);
        assert_eq!(users.failed_requests, 1);
    }

    #[test]
    fn test_adjacency_is_set_union() {
        let store = ServiceMapStore::in_memory().unwrap();
        store.upsert_adjacency("gateway", &targets(&["A", "B"]), 100).unwrap();
        store.upsert_adjacency("gateway", &targets(&["B", "C"]), 200).unwrap();

        let node = store.load_service_node("gateway").unwrap().unwrap();
        assert_eq!(node.dependencies, targets(&["A", "B", "C"]));
        assert_eq!(node.status, ServiceStatus::Running);
        assert_eq!(node.last_activity, 200);
    }

    #[test]
    fn test_undecodable_dependency_row_is_skipped() {
        let store = ServiceMapStore::in_memory().unwrap();
        store.upsert_adjacency("gateway", &targets(&["A"]), 100).unwrap();
        store
            .lock()
            .unwrap()
            .execute("INSERT INTO service_dependencies (source, target) VALUES ('gateway', X'ff')", [])
            .unwrap();

        let node = store.load_service_node("gateway").unwrap().unwrap();
        assert_eq!(node.dependencies, targets(&["A"]));
    }

    #[test]
    fn test_adjacency_activity_is_monotonic() {
        let store = ServiceMapStore::in_memory().unwrap();
        store.upsert_adjacency("svc", &BTreeSet::new(), 300).unwrap();
        store.upsert_adjacency("svc", &BTreeSet::new(), 100).unwrap();

        let node = store.load_service_node("svc").unwrap().unwrap();
        assert_eq!(node.last_activity, 300);
    }

    #[test]
    fn test_mark_inactive_if_stale() {
        let store = ServiceMapStore::in_memory().unwrap();
        store.upsert_adjacency("svc", &BTreeSet::new(), 1_000).unwrap();

        assert!(!store.mark_inactive_if_stale("svc", 1_000).unwrap());
        assert!(store.mark_inactive_if_stale("svc", 1_001).unwrap());
        assert!(!store.mark_inactive_if_stale("svc", 1_001).unwrap());

        let node = store.load_service_node("svc").unwrap().unwrap();
        assert_eq!(node.status, ServiceStatus::Inactive);

        store.upsert_adjacency("svc", &BTreeSet::new(), 2_000).unwrap();
        let node = store.load_service_node("svc").unwrap().unwrap();
        assert_eq!(node.status, ServiceStatus::Running);
    }

    #[test]
    fn test_concurrent_increments_keep_invariant() {
        let store = Arc::new(ServiceMapStore::in_memory().unwrap());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let is_error = (worker + i) % 3 == 0;
                        store
                            .increment_endpoint("svc", "op", CounterDelta::single(is_error), i as i64)
                            .unwrap();
                        store
                            .increment_dependency("svc", "op", "db", "query", CounterDelta::single(is_error), i as i64)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let node = store.load_service_node("svc").unwrap().unwrap();
        let health = &node.endpoints["op"];
        assert_eq!(health.total_requests, 400);
        assert_eq!(health.total_requests, health.successful_requests + health.failed_requests);

        let dep = &node.endpoint_dependencies["op"][0];
        assert_eq!(dep.total_requests, 400);
        assert_eq!(dep.total_requests, dep.successful_requests + dep.failed_requests);
        assert_eq!(dep.failed_requests, health.failed_requests);
    }

    #[test]
    fn test_load_service_nodes_sorted() {
        let store = ServiceMapStore::in_memory().unwrap();
        store.upsert_adjacency("zeta", &BTreeSet::new(), 1).unwrap();
        store.upsert_adjacency("alpha", &targets(&["zeta"]), 1).unwrap();

        let nodes = store.load_service_nodes().unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.source.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
        assert!(store.load_service_node("missing").unwrap().is_none());
    }

    #[test]
    fn test_metrics_payloads() {
        let store = ServiceMapStore::in_memory().unwrap();
        assert_eq!(store.metrics_payload_count().unwrap(), 0);
        let id = store.insert_metrics_payload(&[1, 2, 3], 1, 42).unwrap();
        assert!(id > 0);
        assert_eq!(store.metrics_payload_count().unwrap(), 1);
    }

    #[test]
    fn test_file_store_creates_parent_dir() {
        let dir = std::env::temp_dir().join(format!("spanmap-store-{}", std::process::id()));
        let path = dir.join("nested").join("map.db");

        {
            let store = ServiceMapStore::new(&path).unwrap();
            store.upsert_adjacency("svc", &BTreeSet::new(), 1).unwrap();
        }
        let reopened = ServiceMapStore::new(&path).unwrap();
        assert!(reopened.load_service_node("svc").unwrap().is_some());

        fs::remove_dir_all(&dir).ok();
    }
}
