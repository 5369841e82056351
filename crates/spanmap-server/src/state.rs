use std::sync::Arc;

use spanmap_config::ServerConfig;
use spanmap_engine::{Aggregator, Broadcaster, Materializer, MetricsArchive};
use spanmap_store::ServiceMapStore;

/// Components shared by every handler, built once at startup.
pub struct ServerState {
    pub aggregator: Aggregator,
    pub materializer: Arc<Materializer>,
    pub broadcaster: Arc<Broadcaster>,
    pub metrics: MetricsArchive,
}

impl ServerState {
    pub fn new(store: Arc<ServiceMapStore>, config: &ServerConfig) -> Self {
        let materializer = Arc::new(Materializer::new(Arc::clone(&store), config.inactive_threshold()));
        let broadcaster = Arc::new(Broadcaster::new(Arc::clone(&materializer), config.subscriber_buffer));
        let aggregator = Aggregator::new(Arc::clone(&store)).with_sink(broadcaster.clone());

        Self {
            aggregator,
            materializer,
            broadcaster,
            metrics: MetricsArchive::new(store),
        }
    }
}
