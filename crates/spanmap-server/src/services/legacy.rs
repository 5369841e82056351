//! One-time import of legacy service documents.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use spanmap_store::{parse_legacy_export, ImportSummary, ServiceMapStore};
use tracing::{info, warn};

/// Imports the export at `path` unless a file with the same name was
/// imported before. Returns `None` in that case.
pub async fn import_file(store: Arc<ServiceMapStore>, path: PathBuf) -> Result<Option<ImportSummary>> {
    tokio::task::spawn_blocking(move || {
        let json = fs::read_to_string(&path)
            .with_context(|| format!("reading legacy export {}", path.display()))?;
        let export = parse_legacy_export(&json)?;
        if export.skipped > 0 {
            warn!(skipped = export.skipped, "Skipped malformed legacy entries");
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let summary = store.import_legacy(&name, &export.documents)?;
        match &summary {
            Some(s) => info!(
                file = %name,
                services = s.services,
                endpoints = s.endpoints,
                endpoint_dependencies = s.endpoint_dependencies,
                "Imported legacy service documents"
            ),
            None => info!(file = %name, "Legacy export already imported"),
        }
        Ok(summary)
    })
    .await?
}
