use std::sync::Arc;

use anyhow::Result;
use spanmap_config::ServerConfig;
use spanmap_server::{build_router, services::legacy, ServerState};
use spanmap_store::ServiceMapStore;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    let config = ServerConfig::from_env()?;
    let store = Arc::new(ServiceMapStore::new(&config.database_path)?);
    info!(path = %config.database_path.display(), "Opened service map store");

    if let Some(path) = &config.legacy_import_path {
        if let Err(e) = legacy::import_file(Arc::clone(&store), path.clone()).await {
            warn!("Legacy import failed: {:#}", e);
        }
    }

    let state = Arc::new(ServerState::new(store, &config));
    let app = build_router(state);

    let addr = config.bind_addr();
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
