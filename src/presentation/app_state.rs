// Application state for HTTP and websocket handlers
use crate::application::generator::Generator;
use crate::application::metrics_store::MetricsStore;
use crate::application::snapshot_service::SnapshotService;
use crate::presentation::broadcast::BroadcastHub;
use std::sync::Arc;

/// Explicit server context: the store handle and the connection registry are
/// owned here and injected into every handler, never reached through globals.
pub struct AppState {
    pub store: Arc<dyn MetricsStore>,
    pub snapshots: SnapshotService,
    pub generator: Arc<Generator>,
    pub hub: Arc<BroadcastHub>,
}
